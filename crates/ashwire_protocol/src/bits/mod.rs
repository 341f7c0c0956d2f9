//! # Bit Cursors
//!
//! Bit-precise readers and writers over pooled buffers.
//!
//! ## Bit Numbering
//!
//! ```text
//!   byte n                      byte n+1
//! ┌───┬───┬───┬───┬───┬───┬───┬───┐┌───┬───
//! │ 0 │ 1 │ 2 │ 3 │ 4 │ 5 │ 6 │ 7 ││ 0 │ ...
//! └───┴───┴───┴───┴───┴───┴───┴───┘└───┴───
//!  0x80                        0x01
//! ```
//!
//! Bit index 0 is the most significant bit of a byte. A value that does not
//! start on a byte boundary is split across two bytes at the cursor's bit
//! index. Multi-byte numbers are big-endian unless a caller asks otherwise.

mod cursor;
mod number;
mod reader;
mod writer;

pub use cursor::{ByteOrder, Position};
pub use number::WireNumber;
pub use reader::BitReader;
pub use writer::{BitWriter, LengthMarker, LengthWidth};

/// Capacity a fresh writer starts with.
pub const DEFAULT_WRITER_CAPACITY: usize = 64;
