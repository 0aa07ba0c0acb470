//! Base types for the structure of a REL file.

use binrw::{BinRead, BinWrite};

/// Size of the word at the start of every REL file that keeps offset 0 free for NULL
pub const SENTINEL_SIZE: usize = 4;

/// Size of the trailer closing every REL file
pub const TRAILER_SIZE: usize = 0x20;

/// REL trailer
///
/// The last 32 bytes of a REL file, always little-endian.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct RelTrailer {
    /// The offset from the beginning of the file where the pointer table starts
    pub pointer_table: u32,

    /// The number of entries of the pointer table
    pub pointer_count: u32,

    #[allow(dead_code)]
    pub unk1: [u32; 2],

    /// The offset of the root structure of the payload
    pub payload: u32,

    #[allow(dead_code)]
    pub unk2: [u32; 3],
}

/// REL pointer table
///
/// Each entry is the distance from the previous pointer location divided by four, the first
/// one being relative to the start of the file.
#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
#[brw(little)]
#[br(import(count: u32))]
pub struct PointerTable {
    #[br(count = count)]
    pub deltas: Vec<u16>,
}
