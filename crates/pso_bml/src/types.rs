//! Base types for the structure of BML files.

use binrw::{BinRead, BinWrite};

use crate::compression::CompressionMethod;
use crate::error::{Error, Result};

/// Size of [`BmlHeader`]
pub const HEADER_SIZE: usize = 0x40;

/// Size of [`FileDescription`]
pub const DESCRIPTION_SIZE: usize = 0x40;

/// Size of the name field of a [`FileDescription`]
pub const NAME_SIZE: usize = 32;

/// Alignment of the first file, and of every file of archives without textures
pub const DATA_ALIGNMENT: usize = 0x800;

/// Alignment of files in archives holding textures
pub const TEXTURED_FILE_ALIGNMENT: usize = 0x20;

/// BML file header
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct BmlHeader {
    pub unk1: u32,

    /// The number of file descriptions following the header
    pub file_count: u32,

    /// How every file of the archive is stored
    pub compression: CompressionMethod,

    /// Whether files may be followed by a texture archive, which changes file alignment
    #[br(map = |b: u8| b != 0)]
    #[bw(map = |b: &bool| u8::from(*b))]
    pub has_textures: bool,

    pub unk2: u16,
    pub unk3: [u32; 13],
}

impl BmlHeader {
    /// Alignment of every file and texture archive
    pub fn file_alignment(&self) -> usize {
        if self.has_textures {
            TEXTURED_FILE_ALIGNMENT
        } else {
            DATA_ALIGNMENT
        }
    }

    /// Offset of the first file, the first [`DATA_ALIGNMENT`] boundary after the descriptions
    pub fn data_start(&self) -> usize {
        (HEADER_SIZE + self.file_count as usize * DESCRIPTION_SIZE).next_multiple_of(DATA_ALIGNMENT)
    }
}

/// Description of a file stored in a BML archive
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct FileDescription {
    /// Name of the file, padded with zero bytes
    pub name: [u8; NAME_SIZE],

    /// The size of the file in the archive
    pub compressed_size: u32,

    pub unk1: u32,

    /// The size of the file once decompressed
    pub decompressed_size: u32,

    /// The size of the texture archive following the file in the archive, 0 when there is none
    pub textures_compressed_size: u32,

    pub textures_decompressed_size: u32,

    pub unk2: [u32; 3],
}

impl FileDescription {
    /// Name field for `name`, which has to fit in [`NAME_SIZE`] bytes
    pub fn encode_name(name: &str) -> Result<[u8; NAME_SIZE]> {
        let bytes = name.as_bytes();
        if bytes.len() > NAME_SIZE {
            return Err(Error::NameTooLong {
                name: name.to_owned(),
                max: NAME_SIZE,
            });
        }
        let mut field = [0; NAME_SIZE];
        field[..bytes.len()].copy_from_slice(bytes);
        Ok(field)
    }

    /// Name up to the first zero byte
    pub fn name_raw(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_SIZE);
        &self.name[..end]
    }

    pub fn has_textures(&self) -> bool {
        self.textures_compressed_size > 0
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};
    use pretty_assertions::assert_eq;

    use crate::compression::CompressionMethod;
    use crate::error::{Error, Result};
    use crate::types::{BmlHeader, FileDescription, DESCRIPTION_SIZE, HEADER_SIZE};

    #[test]
    fn header_layout() -> Result<()> {
        let header = BmlHeader {
            file_count: 2,
            compression: CompressionMethod::Prs,
            has_textures: true,
            ..Default::default()
        };

        let mut actual = Vec::new();
        header.write_le(&mut Cursor::new(&mut actual))?;
        assert_eq!(actual.len(), HEADER_SIZE);

        #[rustfmt::skip]
        let expected = [
            0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x50, 0x01, 0x00, 0x00,
        ];
        assert_eq!(actual[..12], expected);
        assert!(actual[12..].iter().all(|&b| b == 0));

        assert_eq!(BmlHeader::read_le(&mut Cursor::new(&actual))?, header);

        Ok(())
    }

    #[test]
    fn alignment() {
        let mut header = BmlHeader {
            file_count: 1,
            ..Default::default()
        };
        assert_eq!(header.file_alignment(), 0x800);
        assert_eq!(header.data_start(), 0x800);

        header.has_textures = true;
        header.file_count = 31;
        assert_eq!(header.file_alignment(), 0x20);
        assert_eq!(header.data_start(), 0x800);

        // descriptions no longer fit before the first boundary
        header.file_count = 32;
        assert_eq!(header.data_start(), 0x1000);
    }

    #[test]
    fn description_layout() -> Result<()> {
        let description = FileDescription {
            name: FileDescription::encode_name("box.nj")?,
            compressed_size: 0x30,
            decompressed_size: 0x48,
            ..Default::default()
        };

        let mut actual = Vec::new();
        description.write_le(&mut Cursor::new(&mut actual))?;
        assert_eq!(actual.len(), DESCRIPTION_SIZE);
        assert_eq!(&actual[..7], b"box.nj\0");
        assert_eq!(actual[32..36], [0x30, 0, 0, 0]);
        assert_eq!(actual[40..44], [0x48, 0, 0, 0]);

        let read = FileDescription::read_le(&mut Cursor::new(&actual))?;
        assert_eq!(read.name_raw(), b"box.nj");
        assert!(!read.has_textures());

        Ok(())
    }

    #[test]
    fn name_limits() -> Result<()> {
        let longest = "a".repeat(32);
        let field = FileDescription::encode_name(&longest)?;
        let description = FileDescription {
            name: field,
            ..Default::default()
        };
        assert_eq!(description.name_raw(), longest.as_bytes());

        assert!(matches!(
            FileDescription::encode_name(&"a".repeat(33)),
            Err(Error::NameTooLong { max: 32, .. })
        ));

        Ok(())
    }
}
