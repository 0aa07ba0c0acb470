//! This library allows for reading and writing the **REL** files of *Phantasy Star Online*.
//!
//! A REL file is a payload of structures referencing each other through 32-bit offsets from the
//! start of the file, followed by a table of the locations of those offsets and a trailer.
//!
//! ## File Layout
//!
//! | Offset                 | Size        | Contents                                               |
//! |------------------------|-------------|--------------------------------------------------------|
//! | `0`                    | 4           | Zero word, so that no structure can live at offset 0   |
//! | `4`                    | variable    | Payload                                                |
//! | `pointer_table`        | 2 × count   | `u16` distances between pointer locations, divided by 4 |
//! | `len - 0x20`           | 4           | `pointer_table`                                        |
//! | `len - 0x1C`           | 4           | `count`                                                |
//! | `len - 0x10`           | 4           | Offset of the root structure                           |
//!
//! ## Additional Information
//!
//! - The pointer table and the trailer are always little-endian.
//! - Pointer locations must be multiples of 4 and at most `0x3FFFC` bytes apart.
//! - A NULL pointer is stored as `0` and never appears in the pointer table, which lets readers
//!   tell pointers apart from numbers.
//!
//! ```
//! use pso_rel::minimap::{read_minimap, write_minimap, RoomGeometry};
//! use pso_rel::RelArchive;
//!
//! let room = RoomGeometry {
//!     center: [0.0, 0.0, 0.0],
//!     vertices: vec![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]],
//!     strips: vec![vec![0, 1, 2]],
//! };
//!
//! let archive = RelArchive::new(write_minimap(&[room])?)?;
//! assert_eq!(read_minimap(&archive)?.len(), 1);
//! # Ok::<(), pso_rel::error::Error>(())
//! ```

pub mod error;
pub mod minimap;
pub mod read;
pub mod types;
pub mod write;

pub use read::RelArchive;
pub use write::RelWriter;
