//! The writing side shared by relocatable containers.

use tracing::{instrument, warn};

use crate::buffer::Buffer;
use crate::engine;
use crate::error::{Error, Result};
use crate::relocation::{check_alignment, RelocationTable};
use crate::typed::Serializable;
use crate::value::{Ptr32, Record};

/// Pointer alignment required by every relocation table encoding
pub const POINTER_ALIGNMENT: usize = 4;

/// A container structures are written into.
///
/// Pointers returned by an archive are offsets in the archive's own coordinate space, which is
/// not necessarily the offset in the final file.
pub trait Archive {
    type Error: From<Error>;

    /// Write a record, recording its non-null pointer fields. When `ensure_aligned` is set the
    /// payload is padded to a 4 byte boundary after the record.
    fn write_record(
        &mut self,
        record: &Record,
        ensure_aligned: bool,
    ) -> core::result::Result<Ptr32, Self::Error>;

    /// Store `target` in a pointer field written earlier at `location`
    fn patch_pointer(
        &mut self,
        location: usize,
        target: Ptr32,
    ) -> core::result::Result<(), Self::Error>;

    /// Pad the payload with zero bytes up to a multiple of `alignment`
    fn align(&mut self, alignment: usize) -> core::result::Result<(), Self::Error>;

    /// Offset the next structure will be written at
    fn position(&self) -> usize;

    fn write<T: Serializable>(&mut self, value: &T) -> core::result::Result<Ptr32, Self::Error> {
        self.write_record(&value.to_record(), false)
    }

    fn write_aligned<T: Serializable>(
        &mut self,
        value: &T,
    ) -> core::result::Result<Ptr32, Self::Error> {
        self.write_record(&value.to_record(), true)
    }

    /// Write consecutive structures, returning the pointer to the first one or NULL when there
    /// are none
    fn write_sequence<T: Serializable>(
        &mut self,
        values: &[T],
        ensure_aligned: bool,
    ) -> core::result::Result<Ptr32, Self::Error> {
        let mut first = Ptr32::NULL;
        for (i, value) in values.iter().enumerate() {
            let ptr = self.write_record(&value.to_record(), ensure_aligned)?;
            if i == 0 {
                first = ptr;
            }
        }
        Ok(first)
    }
}

/// Buffer with relocation bookkeeping, the body of both container kinds.
///
/// Everything before `base` is a header that is not part of the pointer coordinate space:
/// pointers and recorded locations are relative to `base`.
#[derive(Debug, Clone)]
pub struct RelocatableBuffer {
    buf: Buffer,
    base: usize,
    relocations: RelocationTable,
    warned_misaligned: bool,
}

impl RelocatableBuffer {
    /// Continue writing at the end of `buf`, whose first `base` bytes are a header
    pub fn new(mut buf: Buffer, base: usize) -> Self {
        buf.seek_to_end();
        RelocatableBuffer {
            buf,
            base,
            relocations: RelocationTable::new(),
            warned_misaligned: false,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buf
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buf
    }

    pub fn relocations(&self) -> &RelocationTable {
        &self.relocations
    }

    /// Split into the written bytes and the sorted relocation table
    pub fn into_parts(self) -> (Buffer, RelocationTable) {
        (self.buf, self.relocations.into_sorted())
    }
}

impl Archive for RelocatableBuffer {
    type Error = Error;

    /// Nothing is written when the record fails to encode or one of its pointer locations is
    /// rejected.
    #[instrument(level = "debug", skip_all, fields(schema = record.schema().name()))]
    fn write_record(&mut self, record: &Record, ensure_aligned: bool) -> Result<Ptr32> {
        let owner = record.schema().name();
        let encoded = engine::encode(record, self.buf.endian())?;
        let offset = self.position();
        let ptr = Ptr32::new(offset)?;
        let locations = encoded
            .pointers
            .iter()
            .map(|pointer| RelocationTable::check(offset + pointer, owner))
            .collect::<Result<Vec<_>>>()?;

        let alignment = ensure_aligned.then_some(POINTER_ALIGNMENT);
        engine::place(&encoded, &mut self.buf, alignment);
        self.relocations.extend_checked(locations);

        if !self.warned_misaligned && self.buf.offset() % POINTER_ALIGNMENT != 0 {
            warn!(
                schema = record.schema().name(),
                offset = self.buf.offset(),
                "payload is no longer 4 byte aligned, later pointer fields may be misaligned"
            );
            self.warned_misaligned = true;
        }

        Ok(ptr)
    }

    /// Patching to NULL removes the location from the relocation table.
    fn patch_pointer(&mut self, location: usize, target: Ptr32) -> Result<()> {
        const OWNER: &str = "patched pointer";
        if target.is_null() {
            check_alignment(location, OWNER)?;
            self.buf.pack_at(self.base + location, target.0)?;
            if let Ok(location) = u32::try_from(location) {
                self.relocations.remove(location);
            }
        } else {
            let checked = RelocationTable::check(location, OWNER)?;
            self.buf.pack_at(self.base + location, target.0)?;
            self.relocations.extend_checked([checked]);
        }
        Ok(())
    }

    fn align(&mut self, alignment: usize) -> Result<()> {
        let len = self.buf.len();
        self.buf.grow_to(len.next_multiple_of(alignment.max(1)))?;
        self.buf.seek_to_end();
        Ok(())
    }

    fn position(&self) -> usize {
        self.buf.offset() - self.base
    }
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::archive::{Archive, RelocatableBuffer};
    use crate::buffer::Buffer;
    use crate::error::{Error, Result};
    use crate::value::Ptr32;
    use crate::{serializable, Serializable};

    serializable! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Link {
            value: u16,
            flags: u16,
            next: Ptr32,
        }
    }

    serializable! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Tag {
            tag: u8,
        }
    }

    serializable! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Unaligned {
            tag: u16,
            next: Ptr32,
        }
    }

    serializable! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Mixed {
            good: Ptr32,
            pad: u16,
            bad: Ptr32,
        }
    }

    fn header() -> Buffer {
        let mut buf = Buffer::new(Endian::Little);
        buf.append(b"HEAD");
        buf
    }

    #[test]
    #[traced_test]
    fn header_inside_coordinate_space() -> Result<()> {
        let mut archive = RelocatableBuffer::new(header(), 0);

        let second = archive.write(&Link { value: 2, ..Default::default() })?;
        let first = archive.write(&Link { value: 1, flags: 0, next: second })?;

        assert_eq!(second, Ptr32(4));
        assert_eq!(first, Ptr32(12));
        assert_eq!(archive.position(), 20);

        let (buf, relocations) = archive.into_parts();
        assert_eq!(*relocations, vec![16]);
        assert_eq!(buf.unpack::<u32>(16)?, 4);

        Ok(())
    }

    #[test]
    #[traced_test]
    fn patched_pointers_are_recorded() -> Result<()> {
        let mut archive = RelocatableBuffer::new(header(), 4);
        let node = archive.write(&Link::default())?;
        let target = archive.write(&Link::default())?;

        let location = node.offset() + Link::schema().offset_of("next").unwrap_or_default();
        archive.patch_pointer(location, target)?;
        archive.patch_pointer(0, Ptr32::NULL)?;

        let (buf, relocations) = archive.into_parts();
        assert_eq!(*relocations, vec![4]);
        assert_eq!(buf.unpack::<u32>(8)?, 8);

        Ok(())
    }

    #[test]
    #[traced_test]
    fn alignment_and_misalignment() -> Result<()> {
        let mut archive = RelocatableBuffer::new(header(), 4);
        archive.write(&Tag { tag: 1 })?;
        assert!(logs_contain("no longer 4 byte aligned"));

        archive.align(4)?;
        assert_eq!(archive.position(), 4);

        archive.write_aligned(&Tag { tag: 2 })?;
        assert_eq!(archive.position(), 8);

        let mut archive = RelocatableBuffer::new(header(), 4);
        archive.write(&Tag { tag: 1 })?;
        assert!(matches!(
            archive.write(&Unaligned { tag: 0, next: Ptr32(4) }),
            Err(Error::AlignmentViolation { offset: 3, .. })
        ));

        Ok(())
    }

    #[test]
    #[traced_test]
    fn rejected_record_leaves_no_trace() -> Result<()> {
        let mut archive = RelocatableBuffer::new(header(), 4);
        archive.write(&Tag { tag: 0 })?;
        archive.align(4)?;
        let link = archive.write(&Link::default())?;
        let before = archive.position();

        let mixed = Mixed { good: link, pad: 0, bad: link };
        assert!(matches!(
            archive.write(&mixed),
            Err(Error::AlignmentViolation { offset: 18, .. })
        ));
        assert_eq!(archive.position(), before);
        assert!(archive.relocations().is_empty());

        let (buf, relocations) = archive.into_parts();
        assert_eq!(buf.len(), 4 + before);
        assert!(relocations.is_empty());

        Ok(())
    }

    #[test]
    fn pointer_at_offset_zero() -> Result<()> {
        let mut archive = RelocatableBuffer::new(header(), 4);
        let target = Ptr32(8);

        assert!(matches!(
            archive.write(&Mixed { good: target, pad: 0, bad: Ptr32::NULL }),
            Err(Error::NullLocation { .. })
        ));
        assert_eq!(archive.position(), 0);

        let root = archive.write(&Link::default())?;
        archive.write(&Link::default())?;
        assert!(matches!(
            archive.patch_pointer(root.offset(), target),
            Err(Error::NullLocation { .. })
        ));
        assert!(archive.relocations().is_empty());

        Ok(())
    }

    #[test]
    fn patching_to_null_forgets_the_location() -> Result<()> {
        let mut archive = RelocatableBuffer::new(header(), 0);
        let first = archive.write(&Link::default())?;
        let second = archive.write(&Link::default())?;
        let next = first.offset() + Link::schema().offset_of("next").unwrap_or_default();

        archive.patch_pointer(next, second)?;
        assert_eq!(**archive.relocations(), vec![8]);

        archive.patch_pointer(next, Ptr32::NULL)?;
        let (buf, relocations) = archive.into_parts();
        assert!(relocations.is_empty());
        assert_eq!(buf.unpack::<u32>(next)?, 0);

        Ok(())
    }

    #[test]
    fn misaligned_patch_is_not_written() -> Result<()> {
        let mut archive = RelocatableBuffer::new(header(), 0);
        let link = archive.write(&Link { value: 0x1111, flags: 0x2222, next: Ptr32::NULL })?;

        assert!(matches!(
            archive.patch_pointer(link.offset() + 2, Ptr32(4)),
            Err(Error::AlignmentViolation { offset: 6, .. })
        ));
        assert!(matches!(
            archive.patch_pointer(link.offset() + 2, Ptr32::NULL),
            Err(Error::AlignmentViolation { .. })
        ));

        let (buf, relocations) = archive.into_parts();
        assert_eq!(buf.unpack::<u16>(6)?, 0x2222);
        assert!(relocations.is_empty());

        Ok(())
    }

    #[test]
    fn sequence_returns_first_pointer() -> Result<()> {
        let mut archive = RelocatableBuffer::new(header(), 4);
        archive.write(&Tag { tag: 0 })?;
        archive.align(4)?;

        let first = archive.write_sequence(&[Link::default(), Link::default()], false)?;
        assert_eq!(first, Ptr32(4));
        assert_eq!(archive.write_sequence::<Link>(&[], false)?, Ptr32::NULL);

        Ok(())
    }
}
