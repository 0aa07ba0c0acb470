//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`pso_schema::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    SchemaError(#[from] pso_schema::error::Error),

    /// Transparent wrapper for [`pso_ninja::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    NinjaError(#[from] pso_ninja::error::Error),

    /// Two consecutive pointers too far apart for the 16-bit pointer table
    #[error("gap between pointers at {previous:#x} and {location:#x} is too big for the pointer table")]
    #[diagnostic(
        code(pso_rel::relocation_overflow),
        help("pointers may be at most 0x3FFFC bytes apart")
    )]
    RelocationOverflow {
        /// Location of the previous pointer
        previous: u32,
        /// Location of the pointer that cannot be encoded
        location: u32,
    },

    /// file is not a valid rel file
    #[error("file is not a valid rel file: {0}")]
    #[diagnostic(code(pso_rel::malformed_container))]
    MalformedContainer(String),

    /// A pointer field that is expected to be set
    #[error("pointer `{0}` is null")]
    NullPointer(&'static str),

    /// More elements than a 32-bit count can describe
    #[error("{0} elements do not fit in a 32-bit count")]
    TooManyElements(usize),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
