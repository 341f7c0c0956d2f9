//! # Serializable Objects
//!
//! The contract every structured payload implements.
//!
//! Objects drive the cursors themselves: they decide field order, where bit
//! flags sit, which regions are compressed and which lengths are
//! backpatched. Dispatch is static; nothing is discovered at runtime.
//!
//! ## Example
//!
//! ```rust
//! use ashwire_core::BufferPool;
//! use ashwire_protocol::{BitReader, BitWriter, CodecResult, LengthWidth, Serializable};
//!
//! #[derive(Debug, PartialEq)]
//! struct Emote {
//!     visible: bool,
//!     id: u16,
//!     text: String,
//! }
//!
//! impl Serializable for Emote {
//!     fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
//!         writer.write_bit(self.visible)?;
//!         writer.go_to_nearest_byte()?;
//!         writer.write_u16(self.id)?;
//!         writer.write_length_prefixed(LengthWidth::U8, |w| w.write_bytes(self.text.as_bytes()))?;
//!         Ok(())
//!     }
//!
//!     fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
//!         let visible = reader.read_bit()?;
//!         reader.go_to_nearest_byte();
//!         let id = reader.read_u16()?;
//!         let len = usize::from(reader.read_u8()?);
//!         let text = reader.read_string_fixed(len)?;
//!         Ok(Self { visible, id, text })
//!     }
//! }
//!
//! let pool = BufferPool::new();
//! let emote = Emote { visible: true, id: 42, text: "wave".into() };
//! let mut writer = BitWriter::new(&pool);
//! writer.write(&emote).unwrap();
//!
//! let mut reader = BitReader::new(writer.data(), &pool);
//! assert_eq!(reader.read::<Emote>().unwrap(), emote);
//! ```

use uuid::Uuid;

use crate::bits::{BitReader, BitWriter, ByteOrder};
use crate::error::CodecResult;

/// A structured value with a fixed wire layout.
pub trait Serializable: Sized {
    /// Writes `self` at the writer's cursor.
    ///
    /// # Errors
    ///
    /// Any codec error raised while writing.
    fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()>;

    /// Reads a value at the reader's cursor.
    ///
    /// # Errors
    ///
    /// Any codec error raised while reading.
    fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self>;
}

/// A single bit.
impl Serializable for bool {
    fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_bit(*self)
    }

    fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
        reader.read_bit()
    }
}

macro_rules! impl_serializable_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Serializable for $ty {
                #[inline]
                fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
                    writer.write_number(*self, ByteOrder::Big)
                }

                #[inline]
                fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
                    reader.read_number(ByteOrder::Big)
                }
            }
        )*
    };
}

impl_serializable_number!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Big-endian GUID layout.
impl Serializable for Uuid {
    fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_guid(self, ByteOrder::Big)
    }

    fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
        reader.read_guid(ByteOrder::Big)
    }
}

/// `u16` length-prefixed UTF-8.
impl Serializable for String {
    fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
        writer.write_str(self)
    }

    fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
        reader.read_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::CompressedLength;
    use ashwire_core::BufferPool;

    #[derive(Debug, Clone, PartialEq)]
    struct Slot {
        index: u8,
        item: Uuid,
        count: u32,
    }

    impl Serializable for Slot {
        fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
            writer.write(&self.index)?;
            writer.write(&self.item)?;
            writer.write(&self.count)
        }

        fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
            Ok(Self {
                index: reader.read()?,
                item: reader.read()?,
                count: reader.read()?,
            })
        }
    }

    #[derive(Debug, PartialEq)]
    struct Container {
        owner: String,
        locked: bool,
        slots: Vec<Slot>,
    }

    impl Serializable for Container {
        fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
            writer.write(&self.locked)?;
            writer.go_to_nearest_byte()?;
            writer.write(&self.owner)?;
            writer.write_compressed(CompressedLength::Prefixed, |w| {
                w.write_u16(u16::try_from(self.slots.len()).unwrap())?;
                self.slots.iter().try_for_each(|slot| w.write(slot))
            })?;
            Ok(())
        }

        fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
            let locked = reader.read()?;
            reader.go_to_nearest_byte();
            let owner = reader.read()?;
            let mut inner = reader.read_compressed_prefixed(256, 8)?;
            let count = inner.read_u16()?;
            let slots = (0..count)
                .map(|_| inner.read::<Slot>())
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(Self {
                owner,
                locked,
                slots,
            })
        }
    }

    #[test]
    fn test_nested_objects_roundtrip() {
        let pool = BufferPool::new();
        let container = Container {
            owner: "ashen_knight".to_string(),
            locked: true,
            slots: (0..40)
                .map(|i| Slot {
                    index: i,
                    item: Uuid::from_u128(u128::from(i % 3)),
                    count: u32::from(i) * 5,
                })
                .collect(),
        };

        let mut writer = BitWriter::new(&pool);
        writer.write(&container).unwrap();

        let mut reader = BitReader::new(writer.data(), &pool);
        assert_eq!(reader.read::<Container>().unwrap(), container);
        assert_eq!(reader.bytes_left(), 0);
    }

    #[test]
    fn test_primitive_impls_are_big_endian() {
        let pool = BufferPool::new();
        let mut writer = BitWriter::new(&pool);
        writer.write(&0x0102_0304u32).unwrap();
        writer.write(&-2i16).unwrap();
        writer.write(&true).unwrap();
        assert_eq!(writer.data(), &[1, 2, 3, 4, 0xFF, 0xFE, 0x80]);
    }
}
