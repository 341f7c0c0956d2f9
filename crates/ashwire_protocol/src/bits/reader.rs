//! # Bit Reader
//!
//! Mirror of the writer over a read-only span.

use ashwire_core::{BufferPool, PooledBuffer};
use uuid::Uuid;

use super::cursor::{ByteOrder, Position};
use super::number::WireNumber;
use super::writer::low_mask;
use crate::error::{CodecError, CodecResult};
use crate::serialize::Serializable;

macro_rules! read_number_methods {
    ($($big:ident, $little:ident => $ty:ty;)*) => {
        $(
            #[doc = concat!("Reads a big-endian `", stringify!($ty), "`.")]
            ///
            /// # Errors
            ///
            /// [`CodecError::NotEnoughData`] past the end.
            #[inline]
            pub fn $big(&mut self) -> CodecResult<$ty> {
                self.read_number(ByteOrder::Big)
            }

            #[doc = concat!("Reads a little-endian `", stringify!($ty), "`.")]
            ///
            /// # Errors
            ///
            /// [`CodecError::NotEnoughData`] past the end.
            #[inline]
            pub fn $little(&mut self) -> CodecResult<$ty> {
                self.read_number(ByteOrder::Little)
            }
        )*
    };
}

/// Bytes a reader walks over.
enum Source<'a> {
    /// Span handed in by the transport.
    Borrowed(&'a [u8]),
    /// Output of a decompression scope.
    Pooled(PooledBuffer),
}

/// Reads values at a bit cursor from a read-only span.
///
/// A failed read consumes nothing: the cursor stays where it was.
///
/// # Example
///
/// ```rust
/// use ashwire_core::BufferPool;
/// use ashwire_protocol::BitReader;
///
/// let pool = BufferPool::new();
/// let mut reader = BitReader::new(&[0b1011_1111, 0b1110_0000], &pool);
/// assert_eq!(reader.read_bits(3).unwrap(), 0b101);
/// assert_eq!(reader.read_u8().unwrap(), 0xFF);
/// assert_eq!(reader.bytes_left(), 0);
/// ```
pub struct BitReader<'a> {
    source: Source<'a>,
    pos: Position,
    pool: BufferPool,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over a borrowed span.
    #[must_use]
    pub fn new(data: &'a [u8], pool: &BufferPool) -> Self {
        Self {
            source: Source::Borrowed(data),
            pos: Position::ZERO,
            pool: pool.clone(),
        }
    }

    /// Creates a reader that owns a pooled buffer, reading its `len()` bytes.
    #[must_use]
    pub fn from_buffer(buffer: PooledBuffer, pool: &BufferPool) -> BitReader<'static> {
        BitReader {
            source: Source::Pooled(buffer),
            pos: Position::ZERO,
            pool: pool.clone(),
        }
    }

    /// The pool used for staging and decompression.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// The whole span being read.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        match &self.source {
            Source::Borrowed(data) => data,
            Source::Pooled(buffer) => &buffer[..],
        }
    }

    /// Total length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns true if the span is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Current cursor.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Position {
        self.pos
    }

    /// Unread bits.
    #[inline]
    #[must_use]
    pub fn bits_left(&self) -> usize {
        (self.len() * 8).saturating_sub(self.pos.bit_offset())
    }

    /// Whole bytes left: total length minus consumed bits rounded up.
    #[inline]
    #[must_use]
    pub fn bytes_left(&self) -> usize {
        self.len().saturating_sub(self.pos.byte_len())
    }

    /// The bytes after the cursor, starting at the next byte boundary.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> &[u8] {
        let start = self.pos.byte_len().min(self.len());
        &self.data()[start..]
    }

    /// Moves the cursor to `byte_index` plus `bit_offset` bits.
    ///
    /// # Errors
    ///
    /// [`CodecError::SeekOutOfBounds`] if the target lies past the end.
    pub fn seek(&mut self, byte_index: usize, bit_offset: u8) -> CodecResult<()> {
        self.seek_to(Position::new(byte_index, bit_offset))
    }

    /// Moves the cursor to `target`. See [`seek`](Self::seek).
    ///
    /// # Errors
    ///
    /// [`CodecError::SeekOutOfBounds`] if the target lies past the end.
    pub fn seek_to(&mut self, target: Position) -> CodecResult<()> {
        let len = self.len() * 8;
        if target.bit_offset() > len {
            return Err(CodecError::SeekOutOfBounds {
                target: target.bit_offset(),
                len,
            });
        }
        self.pos = target;
        Ok(())
    }

    /// Skips the rest of the current byte. No-op when already aligned.
    pub fn go_to_nearest_byte(&mut self) {
        self.pos = self.pos.aligned_up();
    }

    /// Advances the cursor by `bits` without decoding them.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotEnoughData`] past the end.
    pub fn skip_bits(&mut self, bits: usize) -> CodecResult<()> {
        self.require(bits)?;
        self.pos = self.pos.advance(bits);
        Ok(())
    }

    /// Reads a single bit.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotEnoughData`] past the end.
    pub fn read_bit(&mut self) -> CodecResult<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Reads `count` bits, most significant first, into the low bits of a `u64`.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidBitCount`] if `count > 64`.
    /// - [`CodecError::NotEnoughData`] past the end.
    pub fn read_bits(&mut self, count: u32) -> CodecResult<u64> {
        if count > 64 {
            return Err(CodecError::InvalidBitCount(count));
        }
        self.require(count as usize)?;

        let mut pos = self.pos;
        let mut value = 0u64;
        let mut remaining = count;
        {
            let data = self.data();
            while remaining > 0 {
                let room = 8 - u32::from(pos.bit_index());
                let take = room.min(remaining);
                let chunk = (data[pos.byte_index()] >> (room - take)) & low_mask(take);
                value = (value << take) | u64::from(chunk);
                remaining -= take;
                pos = pos.advance(take as usize);
            }
        }
        self.pos = pos;
        Ok(value)
    }

    /// Fills `out` with the next `out.len()` bytes.
    ///
    /// Unaligned reads combine each byte from two adjacent source bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotEnoughData`] past the end.
    pub fn read_bytes_into(&mut self, out: &mut [u8]) -> CodecResult<()> {
        if out.is_empty() {
            return Ok(());
        }
        self.require(out.len() * 8)?;

        let start = self.pos.byte_index();
        let shift = self.pos.bit_index();
        let data = self.data();
        if shift == 0 {
            out.copy_from_slice(&data[start..start + out.len()]);
        } else {
            for (i, byte) in out.iter_mut().enumerate() {
                *byte = (data[start + i] << shift) | (data[start + i + 1] >> (8 - shift));
            }
        }
        self.pos = self.pos.advance(out.len() * 8);
        Ok(())
    }

    /// Reads `len` bytes into a new vector.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotEnoughData`] past the end.
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        self.require(len * 8)?;
        let mut out = vec![0u8; len];
        self.read_bytes_into(&mut out)?;
        Ok(out)
    }

    /// Reads a fixed-width number in the given byte order.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotEnoughData`] past the end.
    #[inline]
    pub fn read_number<N: WireNumber>(&mut self, order: ByteOrder) -> CodecResult<N> {
        let mut bytes = N::Bytes::default();
        self.read_bytes_into(bytes.as_mut())?;
        Ok(N::from_wire(bytes, order))
    }

    /// Reads an unsigned byte.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotEnoughData`] past the end.
    #[inline]
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let mut byte = [0u8; 1];
        self.read_bytes_into(&mut byte)?;
        Ok(byte[0])
    }

    /// Reads a signed byte.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotEnoughData`] past the end.
    #[inline]
    pub fn read_i8(&mut self) -> CodecResult<i8> {
        Ok(i8::from_be_bytes([self.read_u8()?]))
    }

    read_number_methods! {
        read_u16, read_u16_le => u16;
        read_i16, read_i16_le => i16;
        read_u32, read_u32_le => u32;
        read_i32, read_i32_le => i32;
        read_u64, read_u64_le => u64;
        read_i64, read_i64_le => i64;
        read_f32, read_f32_le => f32;
        read_f64, read_f64_le => f64;
    }

    /// Reads a GUID written by [`BitWriter::write_guid`](super::BitWriter::write_guid).
    ///
    /// # Errors
    ///
    /// [`CodecError::NotEnoughData`] past the end.
    pub fn read_guid(&mut self, order: ByteOrder) -> CodecResult<Uuid> {
        let mut bytes = [0u8; 16];
        self.read_bytes_into(&mut bytes)?;
        if order == ByteOrder::Little {
            bytes.reverse();
        }
        Ok(Uuid::from_bytes(bytes))
    }

    /// Reads a `u16`-length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// - [`CodecError::NotEnoughData`] past the end. The cursor is restored
    ///   to before the length prefix.
    /// - [`CodecError::InvalidUtf8`] on malformed bytes.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let start = self.pos;
        let len = usize::from(self.read_u16()?);
        let text = self.read_utf8(len);
        if text.is_err() {
            self.pos = start;
        }
        text
    }

    /// Reads a fixed field of `len` bytes, dropping trailing NUL padding.
    ///
    /// # Errors
    ///
    /// - [`CodecError::NotEnoughData`] past the end.
    /// - [`CodecError::InvalidUtf8`] on malformed bytes.
    pub fn read_string_fixed(&mut self, len: usize) -> CodecResult<String> {
        let mut text = self.read_utf8(len)?;
        let trimmed = text.trim_end_matches('\0').len();
        text.truncate(trimmed);
        Ok(text)
    }

    /// Reads a value through its [`Serializable`] implementation.
    ///
    /// # Errors
    ///
    /// Whatever the value's deserializer returns.
    #[inline]
    pub fn read<T: Serializable>(&mut self) -> CodecResult<T> {
        T::deserialize(self)
    }

    /// Stages `len` bytes in a pooled buffer and validates them as UTF-8.
    fn read_utf8(&mut self, len: usize) -> CodecResult<String> {
        self.require(len * 8)?;
        let mut staging = self.pool.acquire(len);
        self.read_bytes_into(&mut staging)?;
        std::str::from_utf8(&staging)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    pub(crate) fn require(&self, bits: usize) -> CodecResult<()> {
        let available = self.bits_left();
        if bits > available {
            return Err(CodecError::NotEnoughData {
                requested_bits: bits,
                available_bits: available,
            });
        }
        Ok(())
    }

    pub(crate) fn advance_bytes(&mut self, bytes: usize) {
        self.pos = self.pos.advance(bytes * 8);
    }
}

impl std::fmt::Debug for BitReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitReader")
            .field("position", &self.pos)
            .field("len", &self.len())
            .field("pooled", &matches!(self.source, Source::Pooled(_)))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitWriter;

    #[test]
    fn test_read_past_end_fails_cleanly() {
        let pool = BufferPool::new();
        let mut reader = BitReader::new(&[0x12, 0x34, 0x56], &pool);
        assert_eq!(
            reader.read_u32(),
            Err(CodecError::NotEnoughData {
                requested_bits: 32,
                available_bits: 24
            })
        );
        // Nothing consumed
        assert_eq!(reader.position(), Position::ZERO);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
    }

    #[test]
    fn test_three_then_eight_bits() {
        let pool = BufferPool::new();
        let mut writer = BitWriter::new(&pool);
        writer.write_bits(0b110, 3).unwrap();
        writer.write_u8(0xA5).unwrap();

        let mut reader = BitReader::new(writer.data(), &pool);
        assert_eq!(reader.read_bits(3).unwrap(), 0b110);
        assert_eq!(reader.read_u8().unwrap(), 0xA5);
        assert_eq!(reader.position(), Position::new(1, 3));
    }

    #[test]
    fn test_single_bit_at_offset_three() {
        let pool = BufferPool::new();
        let mut reader = BitReader::new(&[0b0001_0000], &pool);
        reader.seek(0, 3).unwrap();
        assert!(reader.read_bit().unwrap());
        assert!(!reader.read_bit().unwrap());
    }

    #[test]
    fn test_full_width_bits() {
        let pool = BufferPool::new();
        let mut writer = BitWriter::new(&pool);
        writer.write_bit(true).unwrap();
        writer.write_bits(0xDEAD_BEEF_CAFE_F00D, 64).unwrap();

        let mut reader = BitReader::new(writer.data(), &pool);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(64).unwrap(), 0xDEAD_BEEF_CAFE_F00D);
    }

    #[test]
    fn test_bytes_left_rounds_consumed_up() {
        let pool = BufferPool::new();
        let mut reader = BitReader::new(&[0; 4], &pool);
        assert_eq!(reader.bytes_left(), 4);
        reader.read_bit().unwrap();
        assert_eq!(reader.bytes_left(), 3);
        assert_eq!(reader.bits_left(), 31);
        reader.go_to_nearest_byte();
        assert_eq!(reader.bytes_left(), 3);
        assert_eq!(reader.position(), Position::new(1, 0));
        reader.go_to_nearest_byte();
        assert_eq!(reader.position(), Position::new(1, 0));
    }

    #[test]
    fn test_seek_bounds() {
        let pool = BufferPool::new();
        let mut reader = BitReader::new(&[1, 2], &pool);
        reader.seek(2, 0).unwrap();
        assert_eq!(reader.bits_left(), 0);
        assert!(matches!(
            reader.seek(2, 1),
            Err(CodecError::SeekOutOfBounds { target: 17, len: 16 })
        ));
    }

    #[test]
    fn test_unaligned_bytes() {
        let pool = BufferPool::new();
        let mut writer = BitWriter::new(&pool);
        writer.write_bits(0b1, 1).unwrap();
        writer.write_bytes(b"bitwise").unwrap();

        let mut reader = BitReader::new(writer.data(), &pool);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_bytes(7).unwrap(), b"bitwise");
        assert_eq!(reader.bits_left(), 7);
    }

    #[test]
    fn test_strings_roundtrip() {
        let pool = BufferPool::new();
        let mut writer = BitWriter::new(&pool);
        writer.write_bits(0b11, 2).unwrap();
        writer.write_str("héllo").unwrap();
        writer.write_str_fixed("pad", 8).unwrap();

        let mut reader = BitReader::new(writer.data(), &pool);
        reader.skip_bits(2).unwrap();
        assert_eq!(reader.read_string().unwrap(), "héllo");
        assert_eq!(reader.read_string_fixed(8).unwrap(), "pad");
    }

    #[test]
    fn test_invalid_utf8() {
        let pool = BufferPool::new();
        let mut reader = BitReader::new(&[0x00, 0x02, 0xFF, 0xFE], &pool);
        assert_eq!(reader.read_string(), Err(CodecError::InvalidUtf8));
        assert_eq!(reader.position(), Position::ZERO);
    }

    #[test]
    fn test_truncated_string_restores_cursor() {
        let pool = BufferPool::new();
        let mut reader = BitReader::new(&[0x00, 0x05, b'a'], &pool);
        assert!(matches!(
            reader.read_string(),
            Err(CodecError::NotEnoughData { .. })
        ));
        assert_eq!(reader.position(), Position::ZERO);
    }

    #[test]
    fn test_guid_orders() {
        let pool = BufferPool::new();
        let guid = Uuid::from_u128(0x0011_2233_4455_6677_8899_AABB_CCDD_EEFF);
        let mut writer = BitWriter::new(&pool);
        writer.write_guid(&guid, ByteOrder::Little).unwrap();
        writer.write_bit(true).unwrap();
        writer.write_guid(&guid, ByteOrder::Big).unwrap();

        let mut reader = BitReader::new(writer.data(), &pool);
        assert_eq!(reader.data()[0], 0xFF);
        assert_eq!(reader.read_guid(ByteOrder::Little).unwrap(), guid);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_guid(ByteOrder::Big).unwrap(), guid);
    }

    #[test]
    fn test_owned_source() {
        let pool = BufferPool::new();
        let mut buffer = pool.acquire(2);
        buffer.copy_from_slice(&[0xBE, 0xEF]);
        let mut reader = BitReader::from_buffer(buffer, &pool);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        drop(reader);
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    fn test_remaining_slice() {
        let pool = BufferPool::new();
        let mut reader = BitReader::new(&[1, 2, 3], &pool);
        reader.read_bit().unwrap();
        assert_eq!(reader.remaining(), &[2, 3]);
        reader.seek(3, 0).unwrap();
        assert!(reader.remaining().is_empty());
    }
}
