//! Types for writing REL files

use std::io::Cursor;

use binrw::{BinWrite, Endian};
use pso_schema::{Archive, Buffer, Ptr32, Record, RelocatableBuffer, RelocationTable};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::types::{PointerTable, RelTrailer, SENTINEL_SIZE};

/// REL file writer
///
/// Structures are written with the [`Archive`] methods in whatever order the caller likes, the
/// pointers they return are offsets from the start of the file. [`RelWriter::finish`] appends the
/// pointer table and the trailer.
///
/// ```
/// use pso_rel::RelWriter;
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
/// let mut rel = RelWriter::new();
/// let tail = rel.write(&Node { value: 2, next: Ptr32::NULL })?;
/// let head = rel.write(&Node { value: 1, next: tail })?;
/// let bytes = rel.finish(head)?;
/// assert_eq!(bytes.len(), 4 + 16 + 2 + 0x20);
/// # Ok::<(), pso_rel::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RelWriter {
    inner: RelocatableBuffer,
}

impl Default for RelWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RelWriter {
    /// Writer for a little-endian payload
    pub fn new() -> Self {
        Self::with_endian(Endian::Little)
    }

    /// Writer for a payload in the given byte order. The pointer table and the trailer are
    /// little-endian regardless.
    pub fn with_endian(endian: Endian) -> Self {
        let mut buf = Buffer::new(endian);
        buf.append(&[0; SENTINEL_SIZE]);
        RelWriter {
            inner: RelocatableBuffer::new(buf, 0),
        }
    }

    /// Pointer locations recorded so far
    pub fn relocations(&self) -> &RelocationTable {
        self.inner.relocations()
    }

    /// Append the pointer table and the trailer, `payload` being the root structure readers
    /// start from
    #[instrument(skip(self))]
    pub fn finish(self, payload: Ptr32) -> Result<Vec<u8>> {
        let (buf, relocations) = self.inner.into_parts();
        let table = Ptr32::new(buf.len())?;

        let mut previous = 0;
        let mut deltas = Vec::with_capacity(relocations.len());
        for &location in relocations.iter() {
            let delta = u16::try_from((location - previous) / 4)
                .map_err(|_| Error::RelocationOverflow { previous, location })?;
            deltas.push(delta);
            previous = location;
        }

        let trailer = RelTrailer {
            pointer_table: table.0,
            pointer_count: u32::try_from(deltas.len())
                .map_err(|_| Error::TooManyElements(deltas.len()))?,
            payload: payload.0,
            ..Default::default()
        };

        let mut writer = Cursor::new(buf.into_inner());
        writer.set_position(table.0 as u64);
        PointerTable { deltas }.write(&mut writer)?;
        trailer.write(&mut writer)?;

        debug!(
            pointers = trailer.pointer_count,
            size = writer.get_ref().len(),
            "finished rel file"
        );
        Ok(writer.into_inner())
    }
}

impl Archive for RelWriter {
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

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;
    use pso_schema::{serializable, Archive, Ptr32};
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::write::RelWriter;

    serializable! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Link {
            id: u32,
            next: Ptr32,
        }
    }

    serializable! {
        #[derive(Debug, Clone, PartialEq)]
        struct Blob {
            data: [u8; 0x40000],
            tail: Ptr32,
        }
    }

    #[test]
    #[traced_test]
    fn empty_file() -> Result<()> {
        let bytes = RelWriter::new().finish(Ptr32::NULL)?;

        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(bytes, expected);

        Ok(())
    }

    #[test]
    fn pointer_table_deltas() -> Result<()> {
        let mut rel = RelWriter::new();
        let tail = rel.write(&Link { id: 2, next: Ptr32::NULL })?;
        let middle = rel.write(&Link { id: 1, next: tail })?;
        let head = rel.write(&Link { id: 0, next: middle })?;
        assert_eq!(rel.position(), 28);

        let bytes = rel.finish(head)?;

        // pointers at 16 and 24, table at 28
        #[rustfmt::skip]
        let table = [
            0x04, 0x00,
            0x02, 0x00,
        ];
        assert_eq!(&bytes[28..32], table);
        assert_eq!(bytes.len(), 28 + 4 + 0x20);
        assert_eq!(&bytes[32..36], [28, 0, 0, 0]);
        assert_eq!(&bytes[36..40], [2, 0, 0, 0]);
        assert_eq!(&bytes[48..52], [20, 0, 0, 0]);

        Ok(())
    }

    #[test]
    fn big_endian_payload_keeps_little_endian_trailer() -> Result<()> {
        let mut rel = RelWriter::with_endian(Endian::Big);
        let head = rel.write(&Link { id: 1, next: Ptr32::NULL })?;
        let bytes = rel.finish(head)?;

        assert_eq!(&bytes[4..8], [0, 0, 0, 1]);
        assert_eq!(&bytes[12..16], [12, 0, 0, 0]);

        Ok(())
    }

    #[test]
    fn gap_too_big_for_table() -> Result<()> {
        let mut rel = RelWriter::new();
        let link = rel.write(&Link { id: 0, next: Ptr32(4) })?;
        rel.write(&Blob {
            data: [0; 0x40000],
            tail: link,
        })?;

        assert!(matches!(
            rel.finish(Ptr32::NULL),
            Err(Error::RelocationOverflow { previous: 8, .. })
        ));

        Ok(())
    }
}
