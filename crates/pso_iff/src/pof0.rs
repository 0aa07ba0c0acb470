//! POF0 pointer tables.
//!
//! Entries hold the distance from the previous pointer location divided by four, the first one
//! being relative to the start of the body of the chunk the table applies to. The two high bits
//! of the first byte of an entry give its width, entries are big-endian.
//!
//! | First byte  | Width | Distance bits |
//! |-------------|-------|---------------|
//! | `01xx_xxxx` | 1     | 6             |
//! | `10xx_xxxx` | 2     | 14            |
//! | `11xx_xxxx` | 4     | 30            |
//! | `00xx_xxxx` | 1     | none, skipped |

use byteorder::{BigEndian, WriteBytesExt};
use tracing::trace;
use winnow::binary::{be_u16, be_u32, u8};
use winnow::combinator::{dispatch, peek, repeat};
use winnow::prelude::*;

use crate::error::{Error, Result};

const WIDTH_MASK: u8 = 0xC0;
const WIDTH_1: u8 = 0x40;
const WIDTH_2: u8 = 0x80;
const WIDTH_4: u8 = 0xC0;

/// Largest distance, in units of 4 bytes, of each entry width
const MAX_1: u32 = 0x3F;
const MAX_2: u32 = 0x3FFF;
const MAX_4: u32 = 0x3FFF_FFFF;

/// Encode sorted pointer locations, each entry taking the smallest width that fits.
///
/// A location before its predecessor cannot be expressed and is reported as an overflow.
pub fn encode(locations: &[u32]) -> Result<Vec<u8>> {
    let mut table = Vec::with_capacity(locations.len());
    let mut previous = 0;
    for &location in locations {
        let delta = location.checked_sub(previous).map(|d| d / 4);
        match delta {
            Some(d) if d <= MAX_1 => table.push(WIDTH_1 | d as u8),
            Some(d) if d <= MAX_2 => {
                table.write_u16::<BigEndian>((u16::from(WIDTH_2) << 8) | d as u16)?
            }
            Some(d) if d <= MAX_4 => {
                table.write_u32::<BigEndian>((u32::from(WIDTH_4) << 24) | d)?
            }
            _ => return Err(Error::RelocationOverflow { previous, location }),
        }
        previous = location;
    }
    Ok(table)
}

fn entry(input: &mut &[u8]) -> PResult<Option<u32>> {
    dispatch! {peek(u8).map(|b| b & WIDTH_MASK);
        WIDTH_1 => u8.map(|b| Some(u32::from(b) & MAX_1)),
        WIDTH_2 => be_u16.map(|v| Some(u32::from(v) & MAX_2)),
        WIDTH_4 => be_u32.map(|v| Some(v & MAX_4)),
        _ => u8.value(None),
    }
    .parse_next(input)
}

/// Decode a POF0 body into pointer locations relative to the start of the preceding chunk's
/// body
pub fn decode(table: &[u8]) -> Result<Vec<u32>> {
    let entries: Vec<Option<u32>> = repeat(0.., entry).parse(table).map_err(|e| {
        Error::MalformedContainer(format!("truncated POF0 entry at offset {}", e.offset()))
    })?;

    let mut location = 0u32;
    let mut locations = Vec::with_capacity(entries.len());
    for delta in entries.into_iter().flatten() {
        location = delta
            .checked_mul(4)
            .and_then(|d| location.checked_add(d))
            .ok_or_else(|| Error::MalformedContainer("POF0 location overflows".to_string()))?;
        trace!(location, "pointer");
        locations.push(location);
    }
    Ok(locations)
}
