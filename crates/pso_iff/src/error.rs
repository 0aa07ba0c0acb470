//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`pso_schema::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    SchemaError(#[from] pso_schema::error::Error),

    /// Two consecutive pointers too far apart for a POF0 entry
    #[error("gap between pointers too big ({previous:#x} to {location:#x})")]
    #[diagnostic(
        code(pso_iff::relocation_overflow),
        help("POF0 entries hold distances of at most 30 bits, in units of 4 bytes")
    )]
    RelocationOverflow {
        /// Location of the previous pointer
        previous: u32,
        /// Location of the pointer that cannot be encoded
        location: u32,
    },

    /// file is not a valid chunk stream
    #[error("malformed chunk stream: {0}")]
    #[diagnostic(code(pso_iff::malformed_container))]
    MalformedContainer(String),
}

/// Anomalies that do not prevent reading the rest of a chunk stream
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A chunk with a tag this library does not know
    #[error("unknown chunk type `{tag}` at offset {offset:#x}")]
    #[diagnostic(severity(Warning))]
    UnknownChunk {
        /// Tag of the chunk, lossily decoded
        tag: String,
        /// Offset of the chunk header
        offset: usize,
    },

    /// A POF0 chunk with no chunk before it to apply to
    #[error("POF0 chunk at offset {offset:#x} does not follow another chunk")]
    #[diagnostic(severity(Warning))]
    LeadingPointerTable {
        /// Offset of the chunk header
        offset: usize,
    },

    /// Bytes after the last chunk, too few to hold a chunk header
    #[error("{len} trailing bytes at offset {offset:#x}")]
    #[diagnostic(severity(Warning))]
    TrailingBytes {
        /// Offset of the first trailing byte
        offset: usize,
        /// Number of trailing bytes
        len: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
