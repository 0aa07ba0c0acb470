//! Texture name lists of `NJTL` chunks.

use pso_schema::{serializable, Archive, Buffer, Ptr32, Serializable};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

serializable! {
    /// A NUL terminated string, padded to 4 bytes when written
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AlignedString {
        pub chars: Vec<u8>,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct TextureListEntry {
        pub name: Ptr32,
        pub unk1: Ptr32,
        pub data: Ptr32,
    }
}

serializable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct TextureList {
        pub elements: Ptr32,
        pub count: u32,
    }
}

impl AlignedString {
    pub fn new(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len() + 1);
        chars.extend_from_slice(text.as_bytes());
        chars.push(0);
        AlignedString { chars }
    }

    /// Text before the NUL terminator
    pub fn text(&self) -> String {
        let end = self
            .chars
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(self.chars.len());
        String::from_utf8_lossy(&self.chars[..end]).into_owned()
    }

    /// Read the string at `offset`, terminator included
    pub fn read(buf: &Buffer, offset: usize) -> Result<Self> {
        let rest = buf.bytes_at(offset, buf.len().saturating_sub(offset))?;
        match rest.iter().position(|&c| c == 0) {
            Some(end) => Ok(AlignedString {
                chars: rest[..=end].to_vec(),
            }),
            None => Err(Error::UnterminatedString { offset }),
        }
    }
}

/// Write the texture names followed by their entries and the list itself.
///
/// Returns the pointer to the [`TextureList`].
pub fn write_texture_list<A, S>(
    archive: &mut A,
    names: &[S],
) -> core::result::Result<Ptr32, A::Error>
where
    A: Archive,
    S: AsRef<str>,
{
    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let name = archive.write_aligned(&AlignedString::new(name.as_ref()))?;
        entries.push(TextureListEntry {
            name,
            ..Default::default()
        });
    }

    let elements = archive.write_sequence(&entries, true)?;
    let count = u32::try_from(entries.len())
        .map_err(|_| pso_schema::error::Error::OffsetOverflow(entries.len()))?;
    archive.write_aligned(&TextureList { elements, count })
}

/// Read the texture names of the [`TextureList`] at `offset`
#[instrument(level = "debug", skip(buf))]
pub fn read_texture_list(buf: &Buffer, offset: usize) -> Result<Vec<String>> {
    let (list, _) = TextureList::deserialize_from(buf, offset)?;
    if list.elements.is_null() {
        return Ok(Vec::new());
    }

    let entries = TextureListEntry::read_sequence(buf, list.elements.offset(), list.count as usize)?;
    let names = entries
        .iter()
        .map(|entry| match entry.name {
            ptr if ptr.is_null() => Ok(String::new()),
            ptr => AlignedString::read(buf, ptr.offset()).map(|s| s.text()),
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(count = names.len(), "read texture list");
    Ok(names)
}
