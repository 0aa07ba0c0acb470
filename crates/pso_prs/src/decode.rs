//! PRS decompression

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{instrument, trace};

use crate::error::{Error, Result};
use crate::{LONG_WINDOW, SHORT_WINDOW};

struct Decoder<'a> {
    input: Cursor<&'a [u8]>,
    commands: u8,
    remaining: u8,
    output: Vec<u8>,
}

impl<'a> Decoder<'a> {
    fn new(input: &'a [u8]) -> Self {
        Decoder {
            input: Cursor::new(input),
            commands: 0,
            remaining: 0,
            output: Vec::with_capacity(input.len() * 2),
        }
    }

    fn offset(&self) -> usize {
        self.input.position() as usize
    }

    fn byte(&mut self) -> Result<u8> {
        let offset = self.offset();
        self.input
            .read_u8()
            .map_err(|_| Error::UnexpectedEof { offset })
    }

    fn word(&mut self) -> Result<u16> {
        let offset = self.offset();
        self.input
            .read_u16::<LittleEndian>()
            .map_err(|_| Error::UnexpectedEof { offset })
    }

    /// Next command bit, fetching a new command byte from the stream when the current one is used up
    fn bit(&mut self) -> Result<bool> {
        if self.remaining == 0 {
            self.commands = self.byte()?;
            self.remaining = 8;
        }
        let bit = self.commands & 1;
        self.commands >>= 1;
        self.remaining -= 1;
        Ok(bit == 1)
    }

    /// Copy one byte at a time, runs may overlap the bytes they produce
    fn copy(&mut self, distance: usize, length: usize) -> Result<()> {
        if distance > self.output.len() {
            return Err(Error::InvalidReference {
                distance,
                available: self.output.len(),
            });
        }
        for _ in 0..length {
            let byte = self.output[self.output.len() - distance];
            self.output.push(byte);
        }
        Ok(())
    }

    fn run(mut self) -> Result<Vec<u8>> {
        loop {
            if self.bit()? {
                let literal = self.byte()?;
                self.output.push(literal);
                continue;
            }

            let (distance, length) = if self.bit()? {
                let value = self.word()?;
                if value == 0 {
                    break;
                }
                let length = match value & 0b111 {
                    0 => self.byte()? as usize + 1,
                    code => code as usize + 2,
                };
                (LONG_WINDOW - (value >> 3) as usize, length)
            } else {
                let high = self.bit()? as usize;
                let low = self.bit()? as usize;
                let length = (high << 1 | low) + 2;
                (SHORT_WINDOW - self.byte()? as usize, length)
            };
            self.copy(distance, length)?;
        }

        trace!(
            compressed = self.offset(),
            decompressed = self.output.len(),
            "reached terminator"
        );
        Ok(self.output)
    }
}

/// Decompress a PRS stream.
///
/// The stream carries no size, decoding stops at the embedded terminator. Bytes after the
/// terminator are ignored.
///
/// ```
/// let data = pso_prs::decompress(&[0x0B, b'A', b'B', 0x00, 0x00])?;
/// assert_eq!(data, b"AB");
/// # Ok::<(), pso_prs::error::Error>(())
/// ```
#[instrument(level = "debug", skip_all, fields(len = input.len()))]
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    Decoder::new(input).run()
}
