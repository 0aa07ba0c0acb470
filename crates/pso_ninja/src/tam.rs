//! Texture animation metadata (`.tam`), stored big-endian.
//!
//! A `.tam` file is a flat run of [`TamEntry`] values ended by an entry of type
//! [`FRAME_TYPE_TERMINATOR`]. `body_size` counts the bytes after the first 4 of an entry.

use binrw::Endian;
use pso_schema::{serializable, Buffer, Serializable};
use tracing::{debug, instrument, warn};

use crate::error::{count_u16, Error, Result};

pub const FRAME_TYPE_UNKNOWN: u16 = 1;
/// Frames shown one after another
pub const FRAME_TYPE_SLIDESHOW: u16 = 2;
pub const FRAME_TYPE_TERMINATOR: u16 = 0xFFFF;

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Keyframe {
        pub texture_index: u16,
        pub frame_delay: u16,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct TamEntry {
        pub frame_type: u16,
        pub body_size: u16,
        pub animation_id: u16,
        pub frame_count: u16,
        pub frames: Vec<Keyframe> [count = frame_count],
    }
}

impl TamEntry {
    pub fn slideshow(animation_id: u16, frames: Vec<Keyframe>) -> Result<Self> {
        let frame_count = count_u16("keyframes", frames.len())?;
        Ok(TamEntry {
            frame_type: FRAME_TYPE_SLIDESHOW,
            body_size: count_u16("keyframe bytes", Keyframe::type_size() * frames.len() + 4)?,
            animation_id,
            frame_count,
            frames,
        })
    }

    pub fn terminator() -> Self {
        TamEntry {
            frame_type: FRAME_TYPE_TERMINATOR,
            ..Default::default()
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.frame_type == FRAME_TYPE_TERMINATOR
    }
}

/// Build a `.tam` file from its animation entries, appending the terminator
#[instrument(level = "debug", skip_all, fields(entries = entries.len()))]
pub fn write_tam(entries: &[TamEntry]) -> Result<Vec<u8>> {
    let mut buf = Buffer::new(Endian::Big);
    for entry in entries {
        entry.serialize_into(&mut buf, None)?;
    }
    TamEntry::terminator().serialize_into(&mut buf, None)?;
    Ok(buf.into_inner())
}

/// Read the animation entries of a `.tam` file, the terminator excluded
#[instrument(level = "debug", skip_all, fields(len = bytes.len()))]
pub fn read_tam(bytes: &[u8]) -> Result<Vec<TamEntry>> {
    let buf = Buffer::from_bytes(bytes.to_vec(), Endian::Big);
    let mut entries = Vec::new();
    let mut offset = 0;
    loop {
        if offset >= buf.len() {
            return Err(Error::MissingTerminator {
                what: "texture animation",
                offset,
            });
        }

        let (entry, after) = TamEntry::deserialize_from(&buf, offset)?;
        if entry.is_terminator() {
            break;
        }
        if entry.frame_type != FRAME_TYPE_SLIDESHOW {
            warn!(offset, frame_type = entry.frame_type, "unexpected frame type");
        }

        offset = match entry.body_size {
            0 => after,
            size => offset + 4 + size as usize,
        };
        entries.push(entry);
    }

    debug!(count = entries.len(), "read texture animations");
    Ok(entries)
}
