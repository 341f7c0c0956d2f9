//! # Compression Scopes
//!
//! LZ4 block compression spliced inline into a bit stream.
//!
//! ## Writer Side
//!
//! ```text
//! parent: [ header bits ... ][ len? ][ lz4(child bytes) ][ trailer ... ]
//!                                     ▲
//!                   child scope compressed at finish(),
//!                   appended at the parent's cursor
//! ```
//!
//! A scope mutably borrows its parent, so nested scopes can only close in
//! last-opened-first-closed order.
//!
//! ## Reader Side
//!
//! The decompressed size is usually not on the wire. The reader guesses,
//! and doubles the output buffer each time the guess proves too small, up to
//! a bounded number of attempts.

mod lz4;
mod scope;

pub use lz4::{compress, decompress};
pub use scope::{CompressedLength, CompressedWriter};
