//! Types for writing BML archives
//!

use std::fmt::Debug;
use std::io::{self, Cursor, Seek, Write};

use binrw::{BinWrite, Endian};
use bon::Builder;
use tracing::{debug, instrument, Level};

use crate::compression::CompressionMethod;
use crate::error::{Error, Result};
use crate::types::{BmlHeader, FileDescription};

/// Options for how the BML file should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct BmlWriterOptions {
    /// The compression method used for every file
    #[builder(default)]
    pub compression: CompressionMethod,

    /// Byte order of the headers
    #[builder(default = Endian::Little)]
    pub endian: Endian,
}

impl Default for BmlWriterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Default)]
struct PendingFile {
    name: [u8; 32],
    data: Vec<u8>,
    textures: Option<Vec<u8>>,
}

/// BML archive generator
///
/// Files are kept in memory until [`BmlWriter::finish`], which lays out the archive: the header,
/// the file descriptions, then each file and its texture archive.
///
/// ```
/// # fn doit() -> pso_bml::error::Result<()>
/// # {
/// use std::io::Write;
/// use pso_bml::write::BmlWriterOptions;
/// use pso_bml::{BmlWriter, CompressionMethod};
///
/// let mut bml = BmlWriter::new(std::io::Cursor::new(Vec::new()), BmlWriterOptions::builder()
///            .compression(CompressionMethod::Prs)
///            .build());
///
/// bml.start_file("empty.nj")?;
/// bml.write_all(b"NJCM\0\0\0\0")?;
///
/// let archive = bml.finish()?.into_inner();
/// assert_eq!(archive.len(), 0x800 + 0x800);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct BmlWriter<W: Write + Seek> {
    inner: W,
    options: BmlWriterOptions,
    files: Vec<PendingFile>,
    current: Option<PendingFile>,
}

impl<W: Write + Seek> BmlWriter<W> {
    /// Initializes the archive.
    ///
    /// Before writing to this object, the [`BmlWriter::start_file`] function should be called.
    pub fn new(inner: W, options: BmlWriterOptions) -> BmlWriter<W> {
        BmlWriter {
            inner,
            options,
            files: Vec::new(),
            current: None,
        }
    }

    /// Returns true if a file is currently open for writing.
    pub const fn is_writing_file(&self) -> bool {
        self.current.is_some()
    }

    /// Start a new file, usually a chunk stream, finishing the previous one
    #[instrument(skip(self, name), err)]
    pub fn start_file(&mut self, name: impl ToString) -> Result<()> {
        let name = FileDescription::encode_name(&name.to_string())?;
        if let Some(file) = self.current.replace(PendingFile {
            name,
            ..Default::default()
        }) {
            self.files.push(file);
        }
        Ok(())
    }

    /// Store a texture archive after the current file. It is PRS compressed whatever the
    /// compression method of the archive.
    #[instrument(skip_all, err, fields(size = archive.len()))]
    pub fn set_texture_archive(&mut self, archive: &[u8]) -> Result<()> {
        let current = self.current.as_mut().ok_or(Error::NoFileStarted)?;
        current.textures = Some(archive.to_vec());
        Ok(())
    }

    /// Finish the last file and lay out the archive
    ///
    /// This will return the writer, but one should normally not append any data to the end of the file.
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<W> {
        if let Some(file) = self.current.take() {
            self.files.push(file);
        }

        let header = BmlHeader {
            file_count: size_field(self.files.len())?,
            compression: self.options.compression,
            has_textures: self.files.iter().any(|file| file.textures.is_some()),
            ..Default::default()
        };
        let alignment = header.file_alignment();

        let mut descriptions = Vec::with_capacity(self.files.len());
        let mut blocks = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let stored = header.compression.compress(&file.data);
            let textures = file
                .textures
                .as_deref()
                .map(|textures| (textures.len(), CompressionMethod::Prs.compress(textures)));

            descriptions.push(FileDescription {
                name: file.name,
                compressed_size: size_field(stored.len())?,
                decompressed_size: size_field(file.data.len())?,
                textures_compressed_size: size_field(
                    textures.as_ref().map_or(0, |(_, stored)| stored.len()),
                )?,
                textures_decompressed_size: size_field(textures.as_ref().map_or(0, |(len, _)| *len))?,
                ..Default::default()
            });
            blocks.push(stored);
            if let Some((_, stored)) = textures {
                blocks.push(stored);
            }
        }

        let mut writer = Cursor::new(Vec::new());
        header.write_options(&mut writer, self.options.endian, ())?;
        for description in &descriptions {
            description.write_options(&mut writer, self.options.endian, ())?;
        }

        if !blocks.is_empty() {
            pad_to(&mut writer, header.data_start())?;
        }
        for block in &blocks {
            writer.write_all(block)?;
            let end = writer.get_ref().len().next_multiple_of(alignment);
            pad_to(&mut writer, end)?;
        }

        let archive = writer.into_inner();
        debug!(
            files = header.file_count,
            has_textures = header.has_textures,
            size = archive.len(),
            "finished bml archive"
        );
        self.inner.write_all(&archive)?;

        Ok(self.inner)
    }
}

fn size_field(size: usize) -> Result<u32> {
    u32::try_from(size)
        .map_err(|_| Error::InvalidArchive(format!("{size} does not fit in a 32-bit field")))
}

fn pad_to(writer: &mut Cursor<Vec<u8>>, size: usize) -> io::Result<()> {
    let len = writer.get_ref().len();
    writer.write_all(&vec![0; size.saturating_sub(len)])
}

impl<W: Write + Seek> Write for BmlWriter<W> {
    #[instrument(skip_all, err, ret(level = Level::TRACE), fields(size = buf.len()))]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.current.as_mut() {
            Some(file) => {
                file.data.extend_from_slice(buf);
                Ok(buf.len())
            }
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "No file has been started",
            )),
        }
    }

    #[instrument(skip(self), err)]
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Seek> Debug for BmlWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BmlWriter")
            .field("options", &self.options)
            .field("files", &self.files.len())
            .field("writing_file", &self.is_writing_file())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Write};

    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use crate::compression::CompressionMethod;
    use crate::error::{Error, Result};
    use crate::read::BmlArchive;
    use crate::write::{BmlWriter, BmlWriterOptions};

    const MOTION: [u8; 8] = [b'N', b'M', b'D', b'M', 0x00, 0x00, 0x00, 0x00];

    #[traced_test]
    #[test]
    fn bml_empty_write() -> Result<()> {
        let mut expected = vec![0; 0x40];
        expected[8] = b'P';

        let writer = BmlWriter::new(
            Cursor::new(Vec::new()),
            BmlWriterOptions::builder()
                .compression(CompressionMethod::Prs)
                .build(),
        );
        let result = writer.finish()?;
        assert_str_eq!(
            format!("{:02X?}", *result.get_ref()),
            format!("{:02X?}", expected)
        );

        Ok(())
    }

    #[traced_test]
    #[test]
    fn bml_uncompressed_layout() -> Result<()> {
        let mut writer = BmlWriter::new(Cursor::new(Vec::new()), BmlWriterOptions::default());
        writer.start_file("first.nj")?;
        writer.write_all(&MOTION)?;
        writer.start_file("second.nj")?;
        writer.write_all(&MOTION)?;
        let bml = writer.finish()?.into_inner();

        assert_eq!(bml.len(), 0x1800);
        assert_eq!(bml[4], 2);
        assert_eq!(&bml[0x40..0x49], b"first.nj\0");
        // compressed and decompressed sizes
        assert_eq!(bml[0x40 + 32], 8);
        assert_eq!(bml[0x40 + 40], 8);
        assert_eq!(&bml[0x800..0x808], MOTION);
        assert_eq!(&bml[0x1000..0x1008], MOTION);

        let archive = BmlArchive::new(Cursor::new(bml))?;
        assert_eq!(
            archive.file_names().collect::<Vec<_>>(),
            vec!["first.nj", "second.nj"]
        );
        assert_eq!(archive.by_index(1)?.data_start(), 0x1000);

        Ok(())
    }

    #[traced_test]
    #[test]
    fn bml_textures_change_alignment() -> Result<()> {
        let mut writer = BmlWriter::new(
            Cursor::new(Vec::new()),
            BmlWriterOptions::builder()
                .compression(CompressionMethod::Prs)
                .build(),
        );
        writer.start_file("textured.nj")?;
        writer.write_all(&MOTION)?;
        writer.set_texture_archive(b"XVMH0000")?;
        writer.start_file("plain.nj")?;
        writer.write_all(&MOTION)?;
        let bml = writer.finish()?.into_inner();

        assert_eq!(bml[9], 1);
        assert_eq!(bml.len() % 0x20, 0);
        assert!(bml.len() < 0x900);

        let archive = BmlArchive::new(Cursor::new(bml))?;
        assert_eq!(archive.compression(), CompressionMethod::Prs);

        let textured = archive.by_name("textured.nj")?;
        assert_eq!(textured.texture_archive(), Some(&b"XVMH0000"[..]));
        assert_eq!(textured.stream().chunks().len(), 1);

        let plain = archive.by_name("plain.nj")?;
        assert!(plain.texture_archive().is_none());
        assert_eq!(plain.data_start() % 0x20, 0);

        Ok(())
    }

    #[test]
    fn write_requires_a_file() -> Result<()> {
        let mut writer = BmlWriter::new(Cursor::new(Vec::new()), BmlWriterOptions::default());
        assert!(writer.write_all(b"NJCM").is_err());
        assert!(matches!(
            writer.set_texture_archive(b"XVMH"),
            Err(Error::NoFileStarted)
        ));
        assert!(matches!(
            writer.start_file("a_name_that_is_far_too_long_for_bml.nj"),
            Err(Error::NameTooLong { .. })
        ));
        assert!(!writer.is_writing_file());

        Ok(())
    }
}
