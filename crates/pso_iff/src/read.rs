//! Types for reading chunk streams

use std::ops::Range;

use binrw::Endian;
use pso_schema::{Buffer, Ptr32};
use tracing::{debug, instrument, trace, warn};
use winnow::binary::{length_take, u32 as endian_u32, Endianness};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take;

use crate::error::{Error, Result, Warning};
use crate::pof0;
use crate::types::{ChunkKind, HEADER_SIZE};

/// A pointer resolved through a POF0 table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEntry {
    /// Location of the pointer, relative to the start of the chunk body
    pub location: u32,
    /// Value stored at that location, also relative to the start of the chunk body
    pub value: Ptr32,
}

/// A chunk of a parsed stream
#[derive(Debug, Clone, PartialEq)]
pub struct IffChunk {
    pub kind: ChunkKind,
    /// Offset of the chunk header in the stream
    pub offset: usize,
    /// Range of the body in the stream
    pub body: Range<usize>,
    /// Pointers listed by the POF0 chunk following this one, empty when there is none
    pub pointers: Vec<PointerEntry>,
}

impl IffChunk {
    pub fn body_size(&self) -> usize {
        self.body.len()
    }

    /// Value of the pointer at `location`, if the POF0 table lists one there
    pub fn pointer_at(&self, location: u32) -> Option<Ptr32> {
        self.pointers
            .iter()
            .find(|entry| entry.location == location)
            .map(|entry| entry.value)
    }
}

/// A parsed chunk stream.
///
/// Every chunk is listed in file order, POF0 chunks included. The pointers of each POF0 chunk
/// are attached to the chunk right before it.
#[derive(Debug, Clone)]
pub struct IffFile {
    bytes: Vec<u8>,
    endian: Endian,
    chunks: Vec<IffChunk>,
    warnings: Vec<Warning>,
}

fn chunk<'s>(endianness: Endianness) -> impl Parser<&'s [u8], ([u8; 4], &'s [u8]), ContextError> {
    (
        take(4usize).try_map(<[u8; 4]>::try_from),
        length_take(endian_u32(endianness)),
    )
}

impl IffFile {
    /// Parse a little-endian chunk stream
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        Self::with_endian(bytes, Endian::Little)
    }

    #[instrument(skip(bytes), fields(size = bytes.len()))]
    pub fn with_endian(bytes: Vec<u8>, endian: Endian) -> Result<Self> {
        let endianness = match endian {
            Endian::Big => Endianness::Big,
            Endian::Little => Endianness::Little,
        };

        let mut chunks: Vec<IffChunk> = Vec::new();
        let mut warnings = Vec::new();
        let mut input = bytes.as_slice();

        while !input.is_empty() {
            let offset = bytes.len() - input.len();
            if input.len() < HEADER_SIZE {
                warnings.push(Warning::TrailingBytes {
                    offset,
                    len: input.len(),
                });
                break;
            }

            let (tag, body) = chunk(endianness).parse_next(&mut input).map_err(|_| {
                Error::MalformedContainer(format!(
                    "body of chunk at offset {offset:#x} runs past the end of the stream"
                ))
            })?;
            let body_start = offset + HEADER_SIZE;
            let kind = ChunkKind::from_tag(tag);
            trace!(%kind, offset, size = body.len(), "chunk");

            match kind {
                ChunkKind::PointerTable => match chunks.last_mut() {
                    Some(previous) => {
                        previous.pointers = resolve(&bytes, endian, previous, body)?;
                    }
                    None => warnings.push(Warning::LeadingPointerTable { offset }),
                },
                ChunkKind::Unknown(tag) => warnings.push(Warning::UnknownChunk {
                    tag: String::from_utf8_lossy(&tag).into_owned(),
                    offset,
                }),
                _ => {}
            }

            chunks.push(IffChunk {
                kind,
                offset,
                body: body_start..body_start + body.len(),
                pointers: Vec::new(),
            });
        }

        for warning in &warnings {
            warn!("{warning}");
        }
        debug!(chunks = chunks.len(), warnings = warnings.len(), "parsed chunk stream");

        Ok(IffFile {
            bytes,
            endian,
            chunks,
            warnings,
        })
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn chunks(&self) -> &[IffChunk] {
        &self.chunks
    }

    /// Recoverable anomalies met while parsing
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// First chunk of the given kind
    pub fn find(&self, kind: ChunkKind) -> Option<&IffChunk> {
        self.chunks.iter().find(|chunk| chunk.kind == kind)
    }

    /// Every chunk of the given kind, in file order
    pub fn chunks_of(&self, kind: ChunkKind) -> impl Iterator<Item = &IffChunk> {
        self.chunks.iter().filter(move |chunk| chunk.kind == kind)
    }

    pub fn body(&self, chunk: &IffChunk) -> &[u8] {
        &self.bytes[chunk.body.clone()]
    }

    /// Copy of a chunk body, in which pointers of the chunk are plain offsets
    pub fn body_buffer(&self, chunk: &IffChunk) -> Buffer {
        Buffer::from_bytes(self.body(chunk).to_vec(), self.endian)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}

fn resolve(
    bytes: &[u8],
    endian: Endian,
    target: &IffChunk,
    table: &[u8],
) -> Result<Vec<PointerEntry>> {
    let body = Buffer::from_bytes(bytes[target.body.clone()].to_vec(), endian);
    pof0::decode(table)?
        .into_iter()
        .map(|location| {
            let value = body.unpack::<u32>(location as usize).map_err(|_| {
                Error::MalformedContainer(format!(
                    "pointer location {location:#x} is outside the {} byte body of the chunk at \
                     offset {:#x}",
                    body.len(),
                    target.offset
                ))
            })?;
            Ok(PointerEntry {
                location,
                value: Ptr32(value),
            })
        })
        .collect()
}
