//! Growable byte arena with a write cursor.

use std::io::Cursor;
use std::mem;

use binrw::{BinRead, BinWrite, Endian};

use crate::error::{Error, Result};

/// A growable byte buffer with a write cursor and a fixed byte order.
///
/// All writes happen at the cursor and return the absolute offset they were written at. The
/// buffer only ever grows; padding is added with [`Buffer::grow_by`] and [`Buffer::grow_to`].
///
/// ```
/// use binrw::Endian;
/// use pso_schema::Buffer;
///
/// let mut buf = Buffer::new(Endian::Little);
/// assert_eq!(buf.pack(0xAABBu16)?, 0);
/// assert_eq!(buf.pack(1u32)?, 2);
/// assert_eq!(buf.as_slice(), &[0xBB, 0xAA, 0x01, 0x00, 0x00, 0x00]);
/// # Ok::<(), pso_schema::error::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    bytes: Vec<u8>,
    cursor: usize,
    endian: Endian,
}

impl Buffer {
    /// Create an empty buffer writing values with the given byte order
    pub fn new(endian: Endian) -> Self {
        Buffer {
            bytes: Vec::new(),
            cursor: 0,
            endian,
        }
    }

    /// Wrap existing bytes, the cursor starts at offset 0
    pub fn from_bytes(bytes: Vec<u8>, endian: Endian) -> Self {
        Buffer {
            bytes,
            cursor: 0,
            endian,
        }
    }

    /// Byte order used for numeric values
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Current position of the write cursor
    pub fn offset(&self) -> usize {
        self.cursor
    }

    /// Total size of the buffer
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the contents
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Unwrap the contents
    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    /// Write a fixed width value at the cursor, growing the buffer when needed.
    ///
    /// Returns the absolute offset the value was written at.
    pub fn pack<T>(&mut self, value: T) -> Result<usize>
    where
        T: for<'a> BinWrite<Args<'a> = ()>,
    {
        let offset = self.cursor;
        let mut writer = Cursor::new(&mut self.bytes);
        writer.set_position(offset as u64);
        value.write_options(&mut writer, self.endian, ())?;
        self.cursor = writer.position() as usize;
        Ok(offset)
    }

    /// Overwrite a fixed width value that was already written, the cursor does not move.
    pub fn pack_at<T>(&mut self, offset: usize, value: T) -> Result<()>
    where
        T: for<'a> BinWrite<Args<'a> = ()>,
    {
        self.check_bounds(offset, mem::size_of::<T>())?;
        let mut writer = Cursor::new(&mut self.bytes);
        writer.set_position(offset as u64);
        value.write_options(&mut writer, self.endian, ())?;
        Ok(())
    }

    /// Write raw bytes at the cursor, growing the buffer when needed.
    ///
    /// Returns the absolute offset the bytes were written at.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let offset = self.cursor;
        let end = offset + bytes.len();
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        self.bytes[offset..end].copy_from_slice(bytes);
        self.cursor = end;
        offset
    }

    /// Add `by` zero bytes to the end of the buffer. The cursor does not move.
    pub fn grow_by(&mut self, by: usize) {
        self.bytes.resize(self.bytes.len() + by, 0);
    }

    /// Pad the buffer with zero bytes up to `size` bytes. The cursor does not move.
    pub fn grow_to(&mut self, size: usize) -> Result<()> {
        if self.bytes.len() > size {
            return Err(Error::GrowOvershoot {
                capacity: self.bytes.len(),
                requested: size,
            });
        }
        self.bytes.resize(size, 0);
        Ok(())
    }

    /// Move the cursor to the end of the buffer
    pub fn seek_to_end(&mut self) {
        self.cursor = self.bytes.len();
    }

    /// Read a fixed width value at an absolute offset
    pub fn unpack<T>(&self, offset: usize) -> Result<T>
    where
        T: for<'a> BinRead<Args<'a> = ()>,
    {
        self.check_bounds(offset, mem::size_of::<T>())?;
        let mut reader = Cursor::new(self.bytes.as_slice());
        reader.set_position(offset as u64);
        Ok(T::read_options(&mut reader, self.endian, ())?)
    }

    /// Borrow `size` bytes at an absolute offset
    pub fn bytes_at(&self, offset: usize, size: usize) -> Result<&[u8]> {
        self.check_bounds(offset, size)?;
        Ok(&self.bytes[offset..offset + size])
    }

    fn check_bounds(&self, offset: usize, size: usize) -> Result<()> {
        match offset.checked_add(size) {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(Error::OutOfBounds {
                offset,
                size,
                len: self.bytes.len(),
            }),
        }
    }
}
