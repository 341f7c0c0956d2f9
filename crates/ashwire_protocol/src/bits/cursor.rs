//! Cursor positions and byte order.

/// Byte order for multi-byte numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first. The protocol default.
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

impl ByteOrder {
    /// Byte order of the host.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;
    /// Byte order of the host.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;

    /// Returns true if native-order bytes must be reversed for this order.
    #[inline]
    #[must_use]
    pub const fn differs_from_native(self) -> bool {
        !matches!(
            (self, Self::NATIVE),
            (Self::Big, Self::Big) | (Self::Little, Self::Little)
        )
    }
}

/// A `(byte_index, bit_index)` position with `bit_index` in `0..8`.
///
/// Every constructor normalizes, so the invariant always holds and the
/// derived ordering matches absolute bit order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    byte: usize,
    bit: u8,
}

impl Position {
    /// Start of the buffer.
    pub const ZERO: Self = Self { byte: 0, bit: 0 };

    /// Creates a position, carrying excess bits into the byte index.
    #[inline]
    #[must_use]
    pub const fn new(byte: usize, bit: u8) -> Self {
        Self {
            byte: byte + (bit / 8) as usize,
            bit: bit % 8,
        }
    }

    /// Creates a position from an absolute bit offset.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_bits(bits: usize) -> Self {
        Self {
            byte: bits / 8,
            bit: (bits % 8) as u8,
        }
    }

    /// Byte index.
    #[inline]
    #[must_use]
    pub const fn byte_index(self) -> usize {
        self.byte
    }

    /// Bit index within the current byte, always below 8.
    #[inline]
    #[must_use]
    pub const fn bit_index(self) -> u8 {
        self.bit
    }

    /// Absolute bit offset: `byte_index * 8 + bit_index`.
    #[inline]
    #[must_use]
    pub const fn bit_offset(self) -> usize {
        self.byte * 8 + self.bit as usize
    }

    /// Bytes touched up to this position, rounding a partial byte up.
    #[inline]
    #[must_use]
    pub const fn byte_len(self) -> usize {
        self.byte + (self.bit != 0) as usize
    }

    /// Returns true if the position is on a byte boundary.
    #[inline]
    #[must_use]
    pub const fn is_aligned(self) -> bool {
        self.bit == 0
    }

    /// The position `bits` further on.
    #[inline]
    #[must_use]
    pub const fn advance(self, bits: usize) -> Self {
        Self::from_bits(self.bit_offset() + bits)
    }

    /// The nearest byte boundary at or after this position.
    #[inline]
    #[must_use]
    pub const fn aligned_up(self) -> Self {
        Self {
            byte: self.byte_len(),
            bit: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let pos = Position::new(2, 11);
        assert_eq!(pos.byte_index(), 3);
        assert_eq!(pos.bit_index(), 3);
        assert_eq!(pos.bit_offset(), 27);
        assert_eq!(Position::from_bits(27), pos);
    }

    #[test]
    fn test_byte_len_rounds_up() {
        assert_eq!(Position::new(0, 0).byte_len(), 0);
        assert_eq!(Position::new(0, 1).byte_len(), 1);
        assert_eq!(Position::new(4, 7).byte_len(), 5);
        assert_eq!(Position::new(5, 0).byte_len(), 5);
    }

    #[test]
    fn test_advance_and_align() {
        let pos = Position::new(1, 5).advance(4);
        assert_eq!(pos, Position::new(2, 1));
        assert_eq!(pos.aligned_up(), Position::new(3, 0));
        assert_eq!(Position::new(3, 0).aligned_up(), Position::new(3, 0));
    }

    #[test]
    fn test_ordering_matches_bit_offset() {
        assert!(Position::new(1, 7) < Position::new(2, 0));
        assert!(Position::new(2, 1) > Position::new(2, 0));
    }

    #[test]
    fn test_native_order() {
        assert!(!ByteOrder::NATIVE.differs_from_native());
        if cfg!(target_endian = "little") {
            assert!(ByteOrder::Big.differs_from_native());
        }
    }
}
