//! Types for reading REL files

use std::io::Cursor;

use binrw::{BinRead, Endian};
use pso_schema::schema::StructSchema;
use pso_schema::{engine, Buffer, Ptr32, Record, RelocationTable, Serializable};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::types::{PointerTable, RelTrailer, TRAILER_SIZE};

/// REL file reader
///
/// Keeps the whole file along with the locations of its pointers, so that readers can follow
/// pointers from the root structure and tell genuine pointers apart from numbers.
///
/// ```
/// use pso_rel::{RelArchive, RelWriter};
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
///
/// let archive = RelArchive::new(rel.finish(head)?)?;
/// let nodes: Vec<Node> = archive.chain(archive.payload(), "next")?;
/// assert_eq!(nodes.iter().map(|n| n.value).collect::<Vec<_>>(), vec![1, 2]);
/// # Ok::<(), pso_rel::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RelArchive {
    buf: Buffer,
    payload: Ptr32,
    pointers: RelocationTable,
}

impl RelArchive {
    /// Read a REL file with a little-endian payload
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        Self::with_endian(bytes, Endian::Little)
    }

    /// Read a REL file whose payload is in the given byte order
    #[instrument(skip_all, fields(len = bytes.len()))]
    pub fn with_endian(bytes: Vec<u8>, endian: Endian) -> Result<Self> {
        let Some(trailer_start) = bytes.len().checked_sub(TRAILER_SIZE) else {
            return Err(Error::MalformedContainer(format!(
                "{} bytes is too small to hold the trailer",
                bytes.len()
            )));
        };

        let mut reader = Cursor::new(&bytes);
        reader.set_position(trailer_start as u64);
        let trailer = RelTrailer::read(&mut reader)?;

        let table = trailer.pointer_table as usize;
        let table_end = table + trailer.pointer_count as usize * 2;
        if table_end > trailer_start {
            return Err(Error::MalformedContainer(format!(
                "pointer table at {table:#x} with {} entries overlaps the trailer",
                trailer.pointer_count
            )));
        }
        if trailer.payload != 0 && trailer.payload as usize >= table {
            return Err(Error::MalformedContainer(format!(
                "payload at {:#x} is past the pointer table",
                trailer.payload
            )));
        }

        reader.set_position(table as u64);
        let deltas = PointerTable::read_args(&mut reader, (trailer.pointer_count,))?.deltas;

        let mut location = 0u32;
        let mut pointers = Vec::with_capacity(deltas.len());
        for delta in deltas {
            location += u32::from(delta) * 4;
            if location as usize + 4 > table {
                return Err(Error::MalformedContainer(format!(
                    "pointer location {location:#x} is outside of the payload"
                )));
            }
            pointers.push(location);
        }

        debug!(
            pointers = pointers.len(),
            payload = trailer.payload,
            "read rel file"
        );

        Ok(RelArchive {
            buf: Buffer::from_bytes(bytes, endian),
            payload: Ptr32(trailer.payload),
            pointers: RelocationTable::from(pointers),
        })
    }

    /// Offset of the root structure
    pub fn payload(&self) -> Ptr32 {
        self.payload
    }

    /// Locations of the pointers of the payload, in ascending order
    pub fn pointer_offsets(&self) -> &[u32] {
        &self.pointers
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buf
    }

    /// Whether `offset` holds a pointer recorded in the pointer table
    pub fn is_nonnull_pointer(&self, offset: usize) -> bool {
        u32::try_from(offset).is_ok_and(|offset| self.pointers.contains(offset))
    }

    /// Pointer stored at `location`, NULL when the location is not a recorded pointer
    pub fn follow(&self, location: usize) -> Result<Ptr32> {
        if !self.is_nonnull_pointer(location) {
            return Ok(Ptr32::NULL);
        }
        Ok(Ptr32(self.buf.unpack::<u32>(location)?))
    }

    /// Read the structure `ptr` points to
    pub fn read<T: Serializable>(&self, ptr: Ptr32) -> Result<T> {
        if ptr.is_null() {
            return Err(Error::NullPointer(T::schema().name()));
        }
        self.read_at(ptr.offset())
    }

    pub fn read_at<T: Serializable>(&self, offset: usize) -> Result<T> {
        Ok(T::deserialize_from(&self.buf, offset)?.0)
    }

    /// Read the root structure
    pub fn read_root<T: Serializable>(&self) -> Result<T> {
        self.read(self.payload)
    }

    /// Read a structure described at runtime
    pub fn read_record(&self, schema: &'static StructSchema, offset: usize) -> Result<Record> {
        Ok(engine::deserialize(schema, &self.buf, offset)?.0)
    }

    /// Read `count` consecutive structures, `ptr` may only be NULL when `count` is 0
    pub fn read_sequence<T: Serializable>(&self, ptr: Ptr32, count: usize) -> Result<Vec<T>> {
        match (ptr.is_null(), count) {
            (true, 0) => Ok(Vec::new()),
            (true, _) => Err(Error::NullPointer(T::schema().name())),
            (false, _) => Ok(T::read_sequence(&self.buf, ptr.offset(), count)?),
        }
    }

    /// Follow a linked list starting at `first` through its `next_field` pointer.
    ///
    /// The list ends at a NULL pointer or at a `next_field` whose location is not in the pointer
    /// table.
    #[instrument(level = "debug", skip(self))]
    pub fn chain<T: Serializable>(&self, first: Ptr32, next_field: &str) -> Result<Vec<T>> {
        let schema = T::schema();
        let next = schema.offset_of(next_field).ok_or_else(|| {
            pso_schema::error::Error::UnknownField {
                schema: schema.name().to_string(),
                field: next_field.to_string(),
            }
        })?;

        let mut items = Vec::new();
        let mut cursor = first;
        while !cursor.is_null() {
            if items.len() > self.pointers.len() {
                return Err(Error::MalformedContainer(format!(
                    "`{}` chain starting at {first} loops",
                    schema.name()
                )));
            }
            items.push(self.read_at(cursor.offset())?);
            cursor = self.follow(cursor.offset() + next)?;
        }
        Ok(items)
    }
}
