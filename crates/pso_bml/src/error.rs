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

    /// Transparent wrapper for [`pso_prs::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    PrsError(#[from] pso_prs::error::Error),

    /// Transparent wrapper for [`pso_iff::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    IffError(#[from] pso_iff::error::Error),

    /// file is an invalid bml archive
    #[error("file is an invalid bml archive: {0}")]
    #[diagnostic(code(pso_bml::invalid_archive))]
    InvalidArchive(String),

    /// File names are stored in a fixed 32 byte field
    #[error("file name `{name}` is longer than {max} bytes")]
    #[diagnostic(code(pso_bml::name_too_long))]
    NameTooLong { name: String, max: usize },

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),

    /// Writing without a file started
    #[error("no file has been started")]
    NoFileStarted,
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
