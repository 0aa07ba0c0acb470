//! Types for reading BML archives
//!

use std::io::{Read, Seek, SeekFrom};

use binrw::{BinRead, Endian};
use indexmap::IndexMap;
use pso_iff::types::ChunkKind;
use pso_iff::{IffChunk, IffFile};
use tracing::{debug, instrument, warn};

use crate::compression::CompressionMethod;
use crate::error::{Error, FileNotFoundError, Result};
use crate::types::{BmlHeader, FileDescription, HEADER_SIZE};

/// A file extracted from a BML archive
#[derive(Debug, Clone)]
pub struct BmlFile {
    name: Box<str>,
    description: FileDescription,
    data_start: u64,
    stream: IffFile,
    texture_archive: Option<Vec<u8>>,
}

impl BmlFile {
    /// Get the name of the file
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the name of the file, in the raw byte representation of the archive
    pub fn name_raw(&self) -> &[u8] {
        self.description.name_raw()
    }

    pub fn description(&self) -> &FileDescription {
        &self.description
    }

    /// Get the starting offset of the file data in the archive
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Get the size of the file, in bytes, in the archive
    pub fn compressed_size(&self) -> u64 {
        self.description.compressed_size as u64
    }

    /// Get the size of the file, in bytes, when decompressed
    pub fn size(&self) -> u64 {
        self.description.decompressed_size as u64
    }

    /// The chunks of the file
    pub fn stream(&self) -> &IffFile {
        &self.stream
    }

    /// Bodies of the `NJCM` chunks, in file order
    pub fn models(&self) -> impl Iterator<Item = (&IffChunk, &[u8])> {
        self.stream
            .chunks_of(ChunkKind::Model)
            .map(|chunk| (chunk, self.stream.body(chunk)))
    }

    /// Body of the `NJTL` chunk
    pub fn texture_list(&self) -> Option<(&IffChunk, &[u8])> {
        self.stream
            .find(ChunkKind::TextureList)
            .map(|chunk| (chunk, self.stream.body(chunk)))
    }

    /// Body of the `NMDM` chunk
    pub fn motion(&self) -> Option<(&IffChunk, &[u8])> {
        self.stream
            .find(ChunkKind::Motion)
            .map(|chunk| (chunk, self.stream.body(chunk)))
    }

    /// The decompressed texture archive stored after the file, if any
    pub fn texture_archive(&self) -> Option<&[u8]> {
        self.texture_archive.as_deref()
    }
}

/// BML archive reader
///
/// Every file is read, decompressed and split into chunks when the archive is opened.
///
/// ```no_run
/// fn list_bml_contents(reader: impl std::io::Read + std::io::Seek) -> pso_bml::error::Result<()> {
///     let bml = pso_bml::BmlArchive::new(reader)?;
///
///     for file in bml.files() {
///         println!("{}: {} models", file.name(), file.models().count());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BmlArchive {
    header: BmlHeader,
    files: IndexMap<Box<str>, BmlFile>,
}

impl BmlArchive {
    /// Read a little-endian BML archive
    pub fn new<R: Read + Seek>(reader: R) -> Result<BmlArchive> {
        Self::with_endian(reader, Endian::Little)
    }

    /// Read a BML archive whose headers and chunks are in the given byte order
    #[instrument(skip(reader))]
    pub fn with_endian<R: Read + Seek>(mut reader: R, endian: Endian) -> Result<BmlArchive> {
        let header = BmlHeader::read_options(&mut reader, endian, ())
            .map_err(|e| Error::InvalidArchive(format!("unreadable header: {e}")))?;
        let descriptions = (0..header.file_count)
            .map(|_| FileDescription::read_options(&mut reader, endian, ()))
            .collect::<binrw::BinResult<Vec<_>>>()
            .map_err(|e| Error::InvalidArchive(format!("unreadable file description: {e}")))?;
        debug!(
            files = header.file_count,
            compression = ?header.compression,
            has_textures = header.has_textures,
            "read bml header"
        );

        let alignment = header.file_alignment() as u64;
        let mut offset = header.data_start() as u64;
        let mut files = IndexMap::with_capacity(descriptions.len());

        for description in descriptions {
            let name: Box<str> = String::from_utf8_lossy(description.name_raw()).into();
            let data_start = offset;

            let stored = read_block(&mut reader, offset, description.compressed_size)?;
            offset += (description.compressed_size as u64).next_multiple_of(alignment);

            let mut data = header.compression.decompress(&stored)?;
            let size = description.decompressed_size as usize;
            if data.len() < size {
                return Err(Error::InvalidArchive(format!(
                    "file `{name}` holds {} bytes, its description claims {size}",
                    data.len()
                )));
            }
            data.truncate(size);
            let stream = IffFile::with_endian(data, endian)?;

            let texture_archive = if description.has_textures() {
                let stored = read_block(&mut reader, offset, description.textures_compressed_size)?;
                offset += (description.textures_compressed_size as u64).next_multiple_of(alignment);

                let textures = CompressionMethod::Prs.decompress(&stored)?;
                if textures.len() != description.textures_decompressed_size as usize {
                    warn!(
                        file = %name,
                        expected = description.textures_decompressed_size,
                        actual = textures.len(),
                        "texture archive size differs from its description"
                    );
                }
                Some(textures)
            } else {
                None
            };

            let file = BmlFile {
                name: name.clone(),
                description,
                data_start,
                stream,
                texture_archive,
            };
            if let Some(previous) = files.insert(name, file) {
                warn!(file = %previous.name, "duplicate file name replaces an earlier file");
            }
        }

        Ok(BmlArchive { header, files })
    }

    pub fn header(&self) -> &BmlHeader {
        &self.header
    }

    /// Number of files contained in this BML.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether this BML archive contains no files
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how every file of the archive is stored
    pub fn compression(&self) -> CompressionMethod {
        self.header.compression
    }

    /// Returns an iterator over all the file names in this archive.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_ref())
    }

    pub fn files(&self) -> impl Iterator<Item = &BmlFile> {
        self.files.values()
    }

    /// Total size of the files in the archive once decompressed, texture archives excluded
    pub fn decompressed_size(&self) -> u64 {
        self.files.values().map(BmlFile::size).sum()
    }

    /// Get the index of a file by name, if it's present.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.files.get_index_of(name)
    }

    /// Get the name of a file, if it's present.
    #[inline(always)]
    pub fn name_for_index(&self, index: usize) -> Option<&str> {
        self.files.get_index(index).map(|(name, _)| name.as_ref())
    }

    /// Search for a file by name
    pub fn by_name(&self, name: &str) -> Result<&BmlFile> {
        self.files
            .get(name)
            .ok_or_else(|| Error::FileNotFound(FileNotFoundError::Name(name.to_owned())))
    }

    /// Get a contained file by index
    pub fn by_index(&self, index: usize) -> Result<&BmlFile> {
        self.files
            .get_index(index)
            .map(|(_, file)| file)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(index)))
    }
}

fn read_block<R: Read + Seek>(reader: &mut R, start: u64, size: u32) -> Result<Vec<u8>> {
    if start < HEADER_SIZE as u64 {
        return Err(Error::InvalidArchive(format!("block at {start:#x} overlaps the header")));
    }
    reader.seek(SeekFrom::Start(start))?;
    // sizes come from the archive, the buffer only grows with the bytes actually read
    let mut block = Vec::new();
    reader.by_ref().take(size as u64).read_to_end(&mut block)?;
    if block.len() != size as usize {
        return Err(Error::InvalidArchive(format!(
            "block of {size} bytes at {start:#x} runs past the end of the archive"
        )));
    }
    Ok(block)
}
