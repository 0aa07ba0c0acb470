//! This library handles the **PRS** compression used by *Phantasy Star Online* archives.
//!
//! PRS is an LZ77 variant. A compressed stream interleaves command bytes with data bytes: a
//! command byte holds eight command bits, consumed least significant bit first, and the next
//! command byte is only fetched from the stream once all eight bits have been used.
//!
//! ## Tokens
//!
//! | Command bits | Data                                  | Meaning                                                |
//! |--------------|---------------------------------------|--------------------------------------------------------|
//! | `1`          | 1 byte                                | Literal byte                                           |
//! | `0 1`        | `u16` LE `v`, `v == 0`                | End of stream                                          |
//! | `0 1`        | `u16` LE `v`, `v & 7 != 0`            | Copy `(v & 7) + 2` bytes from `0x2000 - (v >> 3)` back |
//! | `0 1`        | `u16` LE `v`, `v & 7 == 0`, byte `n`  | Copy `n + 1` bytes from `0x2000 - (v >> 3)` back       |
//! | `0 0 h l`    | 1 byte `o`                            | Copy `2h + l + 2` bytes from `0x100 - o` back          |
//!
//! Copies are made one byte at a time, so a reference may overlap the bytes it produces
//! (`A` followed by "copy 10 bytes from 1 back" yields eleven `A`).
//!
//! ## Additional Information
//!
//! - The stream does not record its decompressed size, archives store it separately.
//! - The long form reaches 8191 bytes back and copies at most 256 bytes.
//! - The short form reaches 256 bytes back and copies 2 to 5 bytes.

pub mod decode;
pub mod encode;
pub mod error;

pub use decode::decompress;
pub use encode::compress;

/// Base of the long reference offset field
pub(crate) const LONG_WINDOW: usize = 0x2000;

/// Base of the short reference offset byte
pub(crate) const SHORT_WINDOW: usize = 0x100;

/// Farthest distance a long reference can reach, one less than the window so the stored value
/// never collides with the terminator
pub const MAX_LONG_DISTANCE: usize = LONG_WINDOW - 1;

/// Farthest distance a short reference can reach
pub const MAX_SHORT_DISTANCE: usize = SHORT_WINDOW;

/// Longest copy a single reference can express
pub const MAX_MATCH: usize = 0x100;

/// Longest copy of the short form
pub const MAX_SHORT_MATCH: usize = 5;
