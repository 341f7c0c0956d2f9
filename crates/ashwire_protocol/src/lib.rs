//! # ASHWIRE Protocol
//!
//! Bit-exact binary codec for the relay game protocol.
//!
//! ## Layers
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ envelope     type byte + raw/LZ4 payload     │
//! ├──────────────────────────────────────────────┤
//! │ serialize    objects drive the cursors       │
//! ├──────────────────────────────────────────────┤
//! │ compression  inline LZ4 scopes               │
//! ├──────────────────────────────────────────────┤
//! │ bits         bit cursors, length backpatch   │
//! ├──────────────────────────────────────────────┤
//! │ ashwire_core pooled buffers                  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Rules
//!
//! 1. **MSB first** - bit index 0 of a byte is `0x80`
//! 2. **Big-endian by default** - little-endian only when asked
//! 3. **GUIDs** - RFC 4122 byte layout, whole 16 bytes reversed for
//!    little-endian
//! 4. **One discriminant byte** before every top-level packet
//!
//! ## Example
//!
//! ```rust
//! use ashwire_core::BufferPool;
//! use ashwire_protocol::{BitReader, BitWriter, CompressedLength, LengthWidth};
//!
//! let pool = BufferPool::new();
//! let mut writer = BitWriter::new(&pool);
//! writer.write_bit(true).unwrap();
//! writer.go_to_nearest_byte().unwrap();
//! writer
//!     .write_length_prefixed(LengthWidth::U16, |w| {
//!         w.write_compressed(CompressedLength::Prefixed, |inner| inner.write_bytes(&[7u8; 256]))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let mut reader = BitReader::new(writer.data(), &pool);
//! assert!(reader.read_bit().unwrap());
//! reader.go_to_nearest_byte();
//! let body_len = reader.read_u16().unwrap();
//! assert_eq!(usize::from(body_len), reader.bytes_left());
//! let mut inner = reader.read_compressed_prefixed(64, 8).unwrap();
//! assert_eq!(inner.read_bytes(256).unwrap(), vec![7u8; 256]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bits;
pub mod compression;
pub mod config;
pub mod envelope;
pub mod error;
pub mod serialize;

pub use bits::{BitReader, BitWriter, ByteOrder, LengthMarker, LengthWidth, Position, WireNumber};
pub use compression::{CompressedLength, CompressedWriter};
pub use config::{CodecConfig, DecompressionConfig};
pub use envelope::{DecodedPacket, Packet, PacketCodec, PacketDescriptor, PacketRegistry};
pub use error::{CodecError, CodecResult, ConfigError};
pub use serialize::Serializable;
