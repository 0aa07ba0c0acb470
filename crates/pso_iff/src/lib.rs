//! This library allows for reading and writing the IFF style chunk streams of *Phantasy Star
//! Online*, the files stored inside BML archives.
//!
//! A stream is a sequence of chunks, each one a 4 character tag, a 32-bit body size and the body.
//! Chunks whose body holds pointers are followed by a `POF0` chunk listing the locations of those
//! pointers. Pointers are offsets from the start of the body of the chunk they live in.
//!
//! ## Chunk Layout
//!
//! | Offset | Size        | Contents                         |
//! |--------|-------------|----------------------------------|
//! | `0`    | 4           | Tag, such as `NJCM` or `NJTL`    |
//! | `4`    | 4           | Body size                        |
//! | `8`    | body size   | Body                             |
//!
//! ## Additional Information
//!
//! - Sizes follow the byte order of the file, little-endian on every platform but the GameCube.
//! - The POF0 table encoding is described in [`pof0`].
//! - A `POF0` chunk at the start of a stream and chunks with unknown tags are reported as
//!   [`error::Warning`]s, the rest of the stream is still read.
//!
//! ```
//! use pso_iff::types::ChunkKind;
//! use pso_iff::{ChunkWriter, IffFile};
//! use pso_schema::{serializable, Archive, Ptr32};
//!
//! serializable! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Pair {
//!         pub first: Ptr32,
//!         pub second: Ptr32,
//!     }
//! }
//!
//! let mut chunk = ChunkWriter::new(ChunkKind::Model);
//! let root = chunk.write(&Pair::default())?;
//! let child = chunk.write(&Pair::default())?;
//! chunk.patch_pointer(root.offset() + 4, child)?;
//!
//! let file = IffFile::parse(chunk.finish()?)?;
//! let model = file.find(ChunkKind::Model).expect("model chunk");
//! assert_eq!(model.pointer_at(4), Some(child));
//! # Ok::<(), pso_iff::error::Error>(())
//! ```

pub mod error;
pub mod pof0;
pub mod read;
pub mod types;
pub mod write;

pub use read::{IffChunk, IffFile, PointerEntry};
pub use write::ChunkWriter;
