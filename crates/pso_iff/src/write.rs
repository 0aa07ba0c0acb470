//! Types for writing chunks

use binrw::Endian;
use pso_schema::{Archive, Buffer, Ptr32, Record, RelocatableBuffer, RelocationTable};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::pof0;
use crate::types::{ChunkHeader, ChunkKind, HEADER_SIZE};

/// Writer of a single chunk followed by its POF0 pointer table.
///
/// Pointers returned by the [`Archive`] methods are offsets from the start of the chunk body,
/// so the structure written first sits at offset 0 and cannot be the target of a pointer. Its
/// first word cannot hold a pointer either, offset 0 never appears in the POF0 table. Formats
/// place their root structure there.
///
/// ```
/// use pso_iff::types::ChunkKind;
/// use pso_iff::ChunkWriter;
/// use pso_schema::{serializable, Archive, Ptr32};
///
/// serializable! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Node {
///         pub value: u32,
///         pub next: Ptr32,
///     }
/// }
///
/// let mut chunk = ChunkWriter::new(ChunkKind::Model);
/// let root = chunk.write(&Node::default())?;
/// let leaf = chunk.write(&Node { value: 1, next: Ptr32::NULL })?;
/// chunk.patch_pointer(root.offset() + 4, leaf)?;
///
/// // a pointer stored in the first word of the body is rejected
/// assert!(chunk.patch_pointer(root.offset(), leaf).is_err());
///
/// let bytes = chunk.finish()?;
/// assert_eq!(&bytes[24..28], b"POF0");
/// assert_eq!(bytes[32], 0x41);
/// # Ok::<(), pso_iff::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ChunkWriter {
    tag: [u8; 4],
    inner: RelocatableBuffer,
}

impl ChunkWriter {
    /// Little-endian chunk of the given kind
    pub fn new(kind: ChunkKind) -> Self {
        Self::with_endian(kind, Endian::Little)
    }

    pub fn with_endian(kind: ChunkKind, endian: Endian) -> Self {
        let tag = kind.tag();
        let mut buf = Buffer::new(endian);
        buf.append(&tag);
        buf.append(&[0; 4]);
        ChunkWriter {
            tag,
            inner: RelocatableBuffer::new(buf, HEADER_SIZE),
        }
    }

    /// Pointer locations recorded so far, relative to the chunk body
    pub fn relocations(&self) -> &RelocationTable {
        self.inner.relocations()
    }

    /// Patch the body size into the chunk header and append the POF0 chunk
    #[instrument(skip(self), fields(tag = %String::from_utf8_lossy(&self.tag)))]
    pub fn finish(self) -> Result<Vec<u8>> {
        let (mut buf, relocations) = self.inner.into_parts();
        let body_size = size_field(buf.len() - HEADER_SIZE)?;
        buf.pack_at(
            0,
            ChunkHeader {
                tag: self.tag,
                body_size,
            },
        )?;

        let table = pof0::encode(&relocations)?;
        buf.seek_to_end();
        let pof0_offset = buf.pack(ChunkHeader {
            tag: ChunkKind::PointerTable.tag(),
            body_size: 0,
        })?;
        buf.append(&table);
        buf.pack_at(
            pof0_offset + 4,
            size_field(buf.len() - pof0_offset - HEADER_SIZE)?,
        )?;

        debug!(
            body_size,
            pointers = relocations.len(),
            table_size = table.len(),
            "finished chunk"
        );
        Ok(buf.into_inner())
    }
}

fn size_field(size: usize) -> Result<u32> {
    u32::try_from(size)
        .map_err(|_| Error::MalformedContainer(format!("chunk body of {size} bytes is too big")))
}

impl Archive for ChunkWriter {
    type Error = pso_schema::error::Error;

    fn write_record(
        &mut self,
        record: &Record,
        ensure_aligned: bool,
    ) -> pso_schema::error::Result<Ptr32> {
        self.inner.write_record(record, ensure_aligned)
    }

    fn patch_pointer(&mut self, location: usize, target: Ptr32) -> pso_schema::error::Result<()> {
        self.inner.patch_pointer(location, target)
    }

    fn align(&mut self, alignment: usize) -> pso_schema::error::Result<()> {
        self.inner.align(alignment)
    }

    fn position(&self) -> usize {
        self.inner.position()
    }
}
