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

    /// A field value that cannot be packed with the field's declared type
    #[error("serialization error in member `{field}` with value `{value}` and type `{kind}`")]
    #[diagnostic(code(pso_schema::schema_mismatch))]
    SchemaMismatch {
        /// Name of the offending field
        field: String,
        /// Debug rendering of the offending value
        value: String,
        /// Declared type of the field
        kind: String,
    },

    /// A pointer field that does not sit on a 4 byte boundary
    #[error("misaligned pointer in `{owner}` at offset {offset:#x}")]
    #[diagnostic(
        code(pso_schema::alignment_violation),
        help("pointer tables store offsets divided by four, write the structure with alignment enabled")
    )]
    AlignmentViolation {
        /// Name of the structure holding the pointer
        owner: String,
        /// Offset of the pointer field
        offset: usize,
    },

    /// A pointer field at offset 0, the location reserved for the NULL sentinel
    #[error("pointer in `{owner}` at offset 0, which is reserved for NULL")]
    #[diagnostic(
        code(pso_schema::null_location),
        help("write a structure without pointer fields at the start of the container")
    )]
    NullLocation {
        /// Name of the structure holding the pointer
        owner: String,
    },

    /// [`crate::buffer::Buffer::grow_to`] called with a size smaller than the buffer
    #[error("failed to grow buffer because it is already bigger than requested size ({capacity}/{requested})")]
    GrowOvershoot {
        /// Current size of the buffer
        capacity: usize,
        /// Requested size
        requested: usize,
    },

    /// A read past the end of the buffer
    #[error("cannot read {size} bytes at offset {offset:#x}, buffer holds {len} bytes")]
    OutOfBounds {
        /// Offset of the read
        offset: usize,
        /// Size of the read
        size: usize,
        /// Size of the buffer
        len: usize,
    },

    /// An offset past the range of a 32-bit pointer
    #[error("offset {0:#x} does not fit in a 32-bit pointer")]
    OffsetOverflow(usize),

    /// The structure did not produce any bytes
    #[error("serialization of `{0}` did not write anything")]
    EmptyRecord(String),

    /// A field name that is not part of the schema
    #[error("structure `{schema}` has no member `{field}`")]
    UnknownField {
        /// Name of the schema
        schema: String,
        /// Requested field name
        field: String,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
