//! This library handles reading from and creating **BML** files used by *Phantasy Star Online*.
//!
//! # BML Archive Format
//!
//! A BML archive bundles model files, each one an IFF style chunk stream (see [`pso_iff`]),
//! optionally followed by an archive of the textures the model uses.
//!
//! ## File Structure
//!
//! | Offset (bytes)      | Size         | Description                                            |
//! |---------------------|--------------|--------------------------------------------------------|
//! | 0x0000              | 0x40         | Header                                                 |
//! | 0x0040              | 0x40 × count | File descriptions                                      |
//! | next 0x800 boundary | variable     | Files, each one followed by its texture archive if any |
//!
//! ### Header
//!
//! | Offset (bytes) | Field        | Description                                               |
//! |----------------|--------------|-----------------------------------------------------------|
//! | 0x0004         | File Count   | 4 bytes: Number of file descriptions                      |
//! | 0x0008         | Compression  | 1 byte: `0` for none, `'P'` for PRS, applies to all files |
//! | 0x0009         | Has Textures | 1 byte: Whether files may carry a texture archive         |
//!
//! ### File Description
//!
//! | Offset (bytes) | Field                 | Description                                      |
//! |----------------|-----------------------|--------------------------------------------------|
//! | 0x0000         | Name                  | 32 bytes: Zero padded file name                  |
//! | 0x0020         | Compressed Size       | 4 bytes: Size of the file in the archive         |
//! | 0x0028         | Decompressed Size     | 4 bytes: Size of the file once decompressed      |
//! | 0x002C         | Textures Compr. Size  | 4 bytes: Size of the texture archive, or 0       |
//! | 0x0030         | Textures Decompr. Size| 4 bytes: Size of the texture archive once decompressed |
//!
//! ## Additional Information
//!
//! - **File Extension**: `.bml`
//! - **Alignment**: Every file and texture archive starts on a 0x800 boundary, or a 0x20
//!   boundary when the header says the archive has textures.
//! - **Textures**: Texture archives are always PRS compressed.
//! - **Endianness**: Little-endian, big-endian on the GameCube.
//!

pub mod compression;
pub mod error;
pub mod read;
pub mod types;
pub mod write;

pub use compression::CompressionMethod;
pub use read::{BmlArchive, BmlFile};
pub use write::BmlWriter;
