//! Fixed-width numbers and their wire bytes.

use super::cursor::ByteOrder;

/// A fixed-width number the cursors can encode.
///
/// Bytes are produced in host order and reversed when the requested order
/// differs from the host's.
pub trait WireNumber: Copy {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// The encoded byte array.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    /// Encodes `self` in `order`.
    fn to_wire(self, order: ByteOrder) -> Self::Bytes;

    /// Decodes a value encoded in `order`.
    fn from_wire(bytes: Self::Bytes, order: ByteOrder) -> Self;
}

macro_rules! impl_wire_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireNumber for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                type Bytes = [u8; std::mem::size_of::<$ty>()];

                #[inline]
                fn to_wire(self, order: ByteOrder) -> Self::Bytes {
                    let mut bytes = self.to_ne_bytes();
                    if order.differs_from_native() {
                        bytes.reverse();
                    }
                    bytes
                }

                #[inline]
                fn from_wire(mut bytes: Self::Bytes, order: ByteOrder) -> Self {
                    if order.differs_from_native() {
                        bytes.reverse();
                    }
                    <$ty>::from_ne_bytes(bytes)
                }
            }
        )*
    };
}

impl_wire_number!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_bytes() {
        assert_eq!(0x1234_5678u32.to_wire(ByteOrder::Big), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(0xABCDu16.to_wire(ByteOrder::Little), [0xCD, 0xAB]);
    }

    #[test]
    fn test_matches_std_conversions() {
        let value = -123_456_789_012i64;
        assert_eq!(value.to_wire(ByteOrder::Big), value.to_be_bytes());
        assert_eq!(value.to_wire(ByteOrder::Little), value.to_le_bytes());
        assert_eq!(i64::from_wire(value.to_be_bytes(), ByteOrder::Big), value);

        let float = 3.5f64;
        assert_eq!(float.to_wire(ByteOrder::Big), float.to_be_bytes());
    }
}
