//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`pso_schema::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    SchemaError(#[from] pso_schema::error::Error),

    /// More elements than a 16-bit count can describe
    #[error("{count} {what} do not fit in a 16-bit count")]
    #[diagnostic(code(pso_ninja::too_many_elements))]
    TooManyElements {
        /// What is being counted
        what: &'static str,
        /// Number of elements
        count: usize,
    },

    /// A string without its NUL terminator
    #[error("string at offset {offset:#x} is not NUL terminated")]
    UnterminatedString {
        /// Offset of the string
        offset: usize,
    },

    /// A node list that does not end with a terminator node
    #[error("{what} list has no terminator, it runs out at offset {offset:#x}")]
    MissingTerminator {
        /// Kind of node list
        what: &'static str,
        /// Offset the terminator was expected at
        offset: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

pub(crate) fn count_u16(what: &'static str, count: usize) -> Result<u16> {
    u16::try_from(count).map_err(|_| Error::TooManyElements { what, count })
}
