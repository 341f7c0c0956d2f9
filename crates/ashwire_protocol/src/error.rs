//! # Codec Error Types
//!
//! All errors that can occur while encoding or decoding wire data.

use std::path::PathBuf;

use ashwire_core::PoolError;
use thiserror::Error;

/// Errors that can occur in the codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A read ran past the end of the data. Nothing was consumed.
    #[error("not enough data: need {requested_bits} bits, {available_bits} left")]
    NotEnoughData {
        /// Bits the read needed.
        requested_bits: usize,
        /// Bits remaining in the reader.
        available_bits: usize,
    },

    /// Decompressed output did not fit even after every growth attempt.
    #[error("decompression buffer too small after {attempts} attempts (last capacity {capacity})")]
    BufferTooSmall {
        /// Attempts made.
        attempts: u32,
        /// Capacity of the last output buffer tried.
        capacity: usize,
    },

    /// Pool ownership violation (`InvalidOwner` or `DoubleRelease`).
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The discriminant byte is not registered.
    #[error("unknown packet type: {0:#04x}")]
    UnknownPacketType(u8),

    /// A decoded packet was read as a different packet type.
    #[error("packet type mismatch: expected {expected:#04x}, found {found:#04x}")]
    PacketMismatch {
        /// Discriminant of the requested type.
        expected: u8,
        /// Discriminant on the wire.
        found: u8,
    },

    /// Two packet types claim the same discriminant.
    #[error("packet type {0:#04x} registered twice")]
    DuplicatePacketType(u8),

    /// The compressed span is corrupt.
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// The compressor rejected its input.
    #[error("compression failed: {0}")]
    Compress(String),

    /// String bytes were not valid UTF-8.
    #[error("string is not valid utf-8")]
    InvalidUtf8,

    /// A string does not fit its field.
    #[error("string of {len} bytes exceeds field of {max} bytes")]
    StringTooLong {
        /// Encoded length of the string.
        len: usize,
        /// Room available.
        max: usize,
    },

    /// A patched length does not fit the reserved width.
    #[error("length {len} does not fit in {width} bytes")]
    LengthOverflow {
        /// Measured body length.
        len: usize,
        /// Width of the reserved field in bytes.
        width: usize,
    },

    /// A reader seek landed outside the data, or a length prefix was
    /// finished with the cursor inside its own placeholder.
    #[error("seek to bit {target} outside {len} bits")]
    SeekOutOfBounds {
        /// Requested absolute bit offset.
        target: usize,
        /// Total bits available, or the bit where the prefixed body starts.
        len: usize,
    },

    /// Bit field width outside 0..=64.
    #[error("invalid bit count: {0}")]
    InvalidBitCount(u32),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while loading codec configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML did not parse into a configuration.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
