//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// The stream ended before its terminator
    #[error("compressed stream ended at offset {offset:#x} before its terminator")]
    #[diagnostic(
        code(pso_prs::unexpected_eof),
        help("the compressed size may come from a corrupted file description")
    )]
    UnexpectedEof {
        /// Offset in the compressed stream
        offset: usize,
    },

    /// A back-reference reaching before the start of the output
    #[error("back-reference {distance} bytes back with only {available} bytes decompressed")]
    #[diagnostic(code(pso_prs::invalid_reference))]
    InvalidReference {
        /// How far back the reference points
        distance: usize,
        /// Bytes of output available
        available: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
