//! Base types for the structure of chunk streams.

use binrw::{BinRead, BinWrite};
use derive_more::Display;

/// Size of a chunk header
pub const HEADER_SIZE: usize = 8;

/// Chunk header
///
/// A 4 character tag followed by the size of the body, in the byte order of the file.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct ChunkHeader {
    pub tag: [u8; 4],

    /// Size of the body following the header
    pub body_size: u32,
}

/// Known chunk types
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// `NJCM`, a mesh tree
    #[display("NJCM")]
    Model,
    /// `NJTL`, a texture list
    #[display("NJTL")]
    TextureList,
    /// `NMDM`, a motion
    #[display("NMDM")]
    Motion,
    /// `POF0`, the pointer table of the preceding chunk
    #[display("POF0")]
    PointerTable,
    #[display("{}", String::from_utf8_lossy(_0))]
    Unknown([u8; 4]),
}

impl ChunkKind {
    pub fn from_tag(tag: [u8; 4]) -> Self {
        match &tag {
            b"NJCM" => ChunkKind::Model,
            b"NJTL" => ChunkKind::TextureList,
            b"NMDM" => ChunkKind::Motion,
            b"POF0" => ChunkKind::PointerTable,
            _ => ChunkKind::Unknown(tag),
        }
    }

    pub fn tag(self) -> [u8; 4] {
        match self {
            ChunkKind::Model => *b"NJCM",
            ChunkKind::TextureList => *b"NJTL",
            ChunkKind::Motion => *b"NMDM",
            ChunkKind::PointerTable => *b"POF0",
            ChunkKind::Unknown(tag) => tag,
        }
    }
}
