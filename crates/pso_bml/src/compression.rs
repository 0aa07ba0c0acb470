//! Compression of the files stored in a BML archive.

use binrw::{BinRead, BinWrite};
use tracing::instrument;

use crate::error::Result;

/// Identifies how the files of a BML archive are stored
///
/// The method applies to every file of an archive and is chosen with
/// [`crate::write::BmlWriterOptions`]. Texture archives are always PRS compressed.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[brw(repr=u8)]
#[repr(u8)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None = 0,

    /// Compress the data using PRS
    Prs = b'P',
}

impl CompressionMethod {
    #[instrument(level = "debug", skip(data), fields(len = data.len()))]
    pub fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            CompressionMethod::None => data.to_vec(),
            CompressionMethod::Prs => pso_prs::compress(data),
        }
    }

    #[instrument(level = "debug", skip(data), fields(len = data.len()))]
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(match self {
            CompressionMethod::None => data.to_vec(),
            CompressionMethod::Prs => pso_prs::decompress(data)?,
        })
    }
}
