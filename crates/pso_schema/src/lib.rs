//! Schema driven serialization of the structures found in *Phantasy Star Online* data files.
//!
//! Every structure of the game's file formats is a plain C struct: fixed width integers, floats,
//! fixed length byte arrays, nested structures and 32-bit pointers, which are offsets of other
//! structures inside the same container. This crate describes such structures with a field table
//! ([`schema::StructSchema`]) and walks that table to write, read and locate pointer fields.
//!
//! ## Layout rules
//!
//! | Kind                | Size        | Notes                                                         |
//! |---------------------|-------------|---------------------------------------------------------------|
//! | `U8`/`I8`           | 1           |                                                               |
//! | `U16`/`I16`         | 2           |                                                               |
//! | `U32`/`I32`/`F32`   | 4           |                                                               |
//! | `Bytes(n)`          | n           | Shorter values are padded with zero bytes                     |
//! | `Struct(schema)`    | type size   | Stored inline                                                 |
//! | `List`              | 0           | Elements follow the fixed portion of the outermost structure  |
//! | `Ptr32`             | 4           | `0` is NULL, other values are offsets inside the container    |
//!
//! - **Type size**: sum of the fixed widths of the fields, lists excluded.
//! - **Instance size**: bytes actually written for a value, inline list elements included.
//! - **Byte order**: chosen per [`Buffer`], most formats are little-endian.
//!
//! ## Pointers
//!
//! Non-null pointer fields are reported with their offset relative to the structure, so that
//! containers can record them in a relocation table. Relocation tables store gaps divided by
//! four, so pointer fields must sit on 4 byte boundaries ([`error::Error::AlignmentViolation`]).
//!
//! Structures are usually declared with [`serializable!`] and written through an [`Archive`].

pub mod archive;
pub mod buffer;
pub mod engine;
pub mod error;
pub mod relocation;
pub mod schema;
pub mod typed;
pub mod value;

pub use archive::{Archive, RelocatableBuffer};
pub use buffer::Buffer;
pub use relocation::RelocationTable;
pub use typed::{FieldType, Serializable};
pub use value::{Ptr32, Record, Value};
