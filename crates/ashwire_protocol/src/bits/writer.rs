//! # Bit Writer
//!
//! Appends bit- and byte-aligned values to a growable pooled buffer.

use ashwire_core::{BufferPool, PooledBuffer};
use uuid::Uuid;

use super::cursor::{ByteOrder, Position};
use super::number::WireNumber;
use super::DEFAULT_WRITER_CAPACITY;
use crate::error::{CodecError, CodecResult};
use crate::serialize::Serializable;

macro_rules! write_number_methods {
    ($($big:ident, $little:ident => $ty:ty;)*) => {
        $(
            #[doc = concat!("Writes a big-endian `", stringify!($ty), "`.")]
            ///
            /// # Errors
            ///
            /// Propagates pool errors on growth.
            #[inline]
            pub fn $big(&mut self, value: $ty) -> CodecResult<()> {
                self.write_number(value, ByteOrder::Big)
            }

            #[doc = concat!("Writes a little-endian `", stringify!($ty), "`.")]
            ///
            /// # Errors
            ///
            /// Propagates pool errors on growth.
            #[inline]
            pub fn $little(&mut self, value: $ty) -> CodecResult<()> {
                self.write_number(value, ByteOrder::Little)
            }
        )*
    };
}

/// Width of a reserved length field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LengthWidth {
    /// One byte.
    U8,
    /// Two bytes, big-endian.
    U16,
    /// Four bytes, big-endian.
    U32,
}

impl LengthWidth {
    /// Field width in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Largest length the field can hold.
    #[inline]
    #[must_use]
    pub const fn max_len(self) -> usize {
        match self {
            Self::U8 => u8::MAX as usize,
            Self::U16 => u16::MAX as usize,
            Self::U32 => u32::MAX as usize,
        }
    }
}

/// A reserved length field waiting to be patched.
///
/// Returned by [`BitWriter::begin_length_prefix`]; hand it back to
/// [`BitWriter::finish_length_prefix`] once the body is written.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reserved length stays zero until it is finished"]
pub struct LengthMarker {
    start: Position,
    width: LengthWidth,
}

impl LengthMarker {
    /// Where the placeholder begins.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> Position {
        self.start
    }

    /// Width of the placeholder.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> LengthWidth {
        self.width
    }
}

/// Writes values at a bit cursor into a pooled, growable buffer.
///
/// Not thread-safe: create one writer per outgoing message. The buffer goes
/// back to the pool when the writer is dropped.
///
/// # Example
///
/// ```rust
/// use ashwire_core::BufferPool;
/// use ashwire_protocol::BitWriter;
///
/// let pool = BufferPool::new();
/// let mut writer = BitWriter::new(&pool);
/// writer.write_bits(0b101, 3).unwrap();
/// writer.write_u8(0xFF).unwrap();
/// assert_eq!(writer.data(), &[0b1011_1111, 0b1110_0000]);
/// ```
pub struct BitWriter {
    /// Usable length always equals capacity.
    buffer: PooledBuffer,
    pos: Position,
    /// Furthest position ever reached. Storage past it is zero.
    high_water: Position,
    pool: BufferPool,
}

impl BitWriter {
    /// Creates an empty writer with the default starting capacity.
    #[must_use]
    pub fn new(pool: &BufferPool) -> Self {
        Self::with_capacity(pool, DEFAULT_WRITER_CAPACITY)
    }

    /// Creates an empty writer with room for at least `capacity` bytes.
    #[must_use]
    pub fn with_capacity(pool: &BufferPool, capacity: usize) -> Self {
        let mut buffer = pool.acquire(capacity);
        let full = buffer.capacity();
        buffer.set_len(full);
        Self {
            buffer,
            pos: Position::ZERO,
            high_water: Position::ZERO,
            pool: pool.clone(),
        }
    }

    /// The pool backing this writer.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Current cursor.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Position {
        self.pos
    }

    /// Furthest position written or padded so far.
    #[inline]
    #[must_use]
    pub const fn high_water(&self) -> Position {
        self.high_water
    }

    /// Current capacity of the backing buffer.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Bytes up to the cursor, a trailing partial byte included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pos.byte_len()
    }

    /// Returns true if the cursor is at the start.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos == Position::ZERO
    }

    /// The written bytes: `ceil(bit_offset / 8)` bytes from the start.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.pos.byte_len()]
    }

    /// Consumes the writer, returning its buffer viewed as [`data`](Self::data).
    #[must_use]
    pub fn into_buffer(mut self) -> PooledBuffer {
        let len = self.pos.byte_len();
        self.buffer.set_len(len);
        self.buffer
    }

    /// Returns the backing buffer to the pool now.
    ///
    /// # Errors
    ///
    /// Propagates pool ownership errors.
    pub fn release(self) -> CodecResult<()> {
        self.pool.release(self.buffer)?;
        Ok(())
    }

    /// Moves the cursor to `byte_index` plus `bit_offset` bits.
    ///
    /// Seeking past the furthest written point pads the gap with zero bytes,
    /// which then count as written.
    ///
    /// # Errors
    ///
    /// Propagates pool errors if padding needs a larger buffer.
    pub fn seek(&mut self, byte_index: usize, bit_offset: u8) -> CodecResult<()> {
        self.seek_to(Position::new(byte_index, bit_offset))
    }

    /// Moves the cursor to `target`. See [`seek`](Self::seek).
    ///
    /// # Errors
    ///
    /// Propagates pool errors if padding needs a larger buffer.
    pub fn seek_to(&mut self, target: Position) -> CodecResult<()> {
        self.ensure_capacity(target.byte_len())?;
        self.pos = target;
        self.high_water = self.high_water.max(target);
        Ok(())
    }

    /// Skips to the next byte boundary, padding with zero bits.
    ///
    /// No-op when already aligned.
    ///
    /// # Errors
    ///
    /// Propagates pool errors if padding needs a larger buffer.
    pub fn go_to_nearest_byte(&mut self) -> CodecResult<()> {
        self.seek_to(self.pos.aligned_up())
    }

    /// Writes a single bit.
    ///
    /// # Errors
    ///
    /// Propagates pool errors on growth.
    pub fn write_bit(&mut self, value: bool) -> CodecResult<()> {
        self.write_bits(u64::from(value), 1)
    }

    /// Writes the low `count` bits of `value`, most significant first.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidBitCount`] if `count > 64`.
    /// - Pool errors on growth.
    pub fn write_bits(&mut self, value: u64, count: u32) -> CodecResult<()> {
        if count > 64 {
            return Err(CodecError::InvalidBitCount(count));
        }
        if count == 0 {
            return Ok(());
        }
        self.reserve_bits(count as usize)?;

        let mut remaining = count;
        while remaining > 0 {
            let room = 8 - u32::from(self.pos.bit_index());
            let take = room.min(remaining);
            let shift = room - take;
            let field = low_mask(take) << shift;
            #[allow(clippy::cast_possible_truncation)]
            let chunk = ((value >> (remaining - take)) as u8 & low_mask(take)) << shift;

            let slot = &mut self.buffer[self.pos.byte_index()];
            *slot = (*slot & !field) | chunk;

            remaining -= take;
            self.pos = self.pos.advance(take as usize);
        }
        self.mark_written();
        Ok(())
    }

    /// Writes raw bytes at the cursor.
    ///
    /// Aligned writes are a straight copy; unaligned writes split every byte
    /// across two buffer bytes at the cursor's bit index.
    ///
    /// # Errors
    ///
    /// Propagates pool errors on growth.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.reserve_bits(bytes.len() * 8)?;

        let start = self.pos.byte_index();
        let shift = self.pos.bit_index();
        if shift == 0 {
            self.buffer[start..start + bytes.len()].copy_from_slice(bytes);
        } else {
            let high_field = 0xFFu8 >> shift;
            let low_field = 0xFFu8 << (8 - shift);
            for (i, &byte) in bytes.iter().enumerate() {
                let hi = &mut self.buffer[start + i];
                *hi = (*hi & !high_field) | (byte >> shift);
                let lo = &mut self.buffer[start + i + 1];
                *lo = (*lo & !low_field) | (byte << (8 - shift));
            }
        }
        self.pos = self.pos.advance(bytes.len() * 8);
        self.mark_written();
        Ok(())
    }

    /// Writes a fixed-width number in the given byte order.
    ///
    /// # Errors
    ///
    /// Propagates pool errors on growth.
    #[inline]
    pub fn write_number<N: WireNumber>(&mut self, value: N, order: ByteOrder) -> CodecResult<()> {
        self.write_bytes(value.to_wire(order).as_ref())
    }

    /// Writes an unsigned byte.
    ///
    /// # Errors
    ///
    /// Propagates pool errors on growth.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.write_bytes(&[value])
    }

    /// Writes a signed byte.
    ///
    /// # Errors
    ///
    /// Propagates pool errors on growth.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    write_number_methods! {
        write_u16, write_u16_le => u16;
        write_i16, write_i16_le => i16;
        write_u32, write_u32_le => u32;
        write_i32, write_i32_le => i32;
        write_u64, write_u64_le => u64;
        write_i64, write_i64_le => i64;
        write_f32, write_f32_le => f32;
        write_f64, write_f64_le => f64;
    }

    /// Writes a GUID.
    ///
    /// The RFC-4122 byte layout is written as is for big-endian and
    /// reversed as a whole 16-byte block for little-endian. The fields are
    /// not swapped individually; peers expect exactly this layout.
    ///
    /// # Errors
    ///
    /// Propagates pool errors on growth.
    pub fn write_guid(&mut self, guid: &Uuid, order: ByteOrder) -> CodecResult<()> {
        let mut bytes = *guid.as_bytes();
        if order == ByteOrder::Little {
            bytes.reverse();
        }
        self.write_bytes(&bytes)
    }

    /// Writes a string as a big-endian `u16` byte length followed by UTF-8.
    ///
    /// # Errors
    ///
    /// - [`CodecError::StringTooLong`] above 65535 bytes.
    /// - Pool errors on growth.
    pub fn write_str(&mut self, value: &str) -> CodecResult<()> {
        let len = u16::try_from(value.len()).map_err(|_| CodecError::StringTooLong {
            len: value.len(),
            max: u16::MAX as usize,
        })?;
        self.write_u16(len)?;
        self.write_bytes(value.as_bytes())
    }

    /// Writes a string into a fixed field of exactly `len` bytes, zero padded.
    ///
    /// # Errors
    ///
    /// - [`CodecError::StringTooLong`] if the string is longer than `len`.
    /// - Pool errors on growth.
    pub fn write_str_fixed(&mut self, value: &str, len: usize) -> CodecResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() > len {
            return Err(CodecError::StringTooLong {
                len: bytes.len(),
                max: len,
            });
        }
        self.write_bytes(bytes)?;
        self.write_zeros(len - bytes.len())
    }

    /// Writes a value through its [`Serializable`] implementation.
    ///
    /// # Errors
    ///
    /// Whatever the value's serializer returns.
    #[inline]
    pub fn write<T: Serializable>(&mut self, value: &T) -> CodecResult<()> {
        value.serialize(self)
    }

    /// Reserves a zeroed length field and returns a marker to patch it.
    ///
    /// # Errors
    ///
    /// Propagates pool errors on growth.
    pub fn begin_length_prefix(&mut self, width: LengthWidth) -> CodecResult<LengthMarker> {
        let start = self.pos;
        self.write_zeros(width.bytes())?;
        Ok(LengthMarker { start, width })
    }

    /// Patches a reserved length field with the byte length of everything
    /// written since it, then restores the cursor to the end of the body.
    ///
    /// Returns the patched length.
    ///
    /// # Errors
    ///
    /// - [`CodecError::SeekOutOfBounds`] if the cursor sits before the end
    ///   of the placeholder.
    /// - [`CodecError::LengthOverflow`] if the body does not fit the width.
    /// - Pool errors on growth.
    pub fn finish_length_prefix(&mut self, marker: LengthMarker) -> CodecResult<usize> {
        let end = self.pos;
        let body_start = marker.start.bit_offset() + marker.width.bytes() * 8;
        let Some(body_bits) = end.bit_offset().checked_sub(body_start) else {
            return Err(CodecError::SeekOutOfBounds {
                target: end.bit_offset(),
                len: body_start,
            });
        };
        let len = body_bits.div_ceil(8);
        if len > marker.width.max_len() {
            return Err(CodecError::LengthOverflow {
                len,
                width: marker.width.bytes(),
            });
        }

        self.seek_to(marker.start)?;
        #[allow(clippy::cast_possible_truncation)]
        let patched = match marker.width {
            LengthWidth::U8 => self.write_u8(len as u8),
            LengthWidth::U16 => self.write_u16(len as u16),
            LengthWidth::U32 => self.write_u32(len as u32),
        };
        // Restore before reporting so the cursor never stays mid-stream.
        self.seek_to(end)?;
        patched?;
        Ok(len)
    }

    /// Writes a body behind a length field patched after the fact.
    ///
    /// # Errors
    ///
    /// Errors from `body`, plus those of
    /// [`finish_length_prefix`](Self::finish_length_prefix).
    pub fn write_length_prefixed<F>(&mut self, width: LengthWidth, body: F) -> CodecResult<usize>
    where
        F: FnOnce(&mut Self) -> CodecResult<()>,
    {
        let marker = self.begin_length_prefix(width)?;
        body(self)?;
        self.finish_length_prefix(marker)
    }

    fn write_zeros(&mut self, count: usize) -> CodecResult<()> {
        const ZEROS: [u8; 32] = [0; 32];
        let mut left = count;
        while left > 0 {
            let chunk = left.min(ZEROS.len());
            self.write_bytes(&ZEROS[..chunk])?;
            left -= chunk;
        }
        Ok(())
    }

    fn reserve_bits(&mut self, bits: usize) -> CodecResult<()> {
        self.ensure_capacity(self.pos.advance(bits).byte_len())
    }

    /// Grows geometrically until `needed` bytes fit. Never shrinks.
    fn ensure_capacity(&mut self, needed: usize) -> CodecResult<()> {
        let capacity = self.buffer.capacity();
        if needed <= capacity {
            return Ok(());
        }
        let target = needed.max(capacity.saturating_mul(2));
        let mut grown = self.pool.acquire(target);
        let full = grown.capacity();
        grown.set_len(full);
        grown[..capacity].copy_from_slice(&self.buffer);
        let old = std::mem::replace(&mut self.buffer, grown);
        self.pool.release(old)?;
        tracing::trace!(from = capacity, to = full, "bit writer grew");
        Ok(())
    }

    fn mark_written(&mut self) {
        self.high_water = self.high_water.max(self.pos);
    }
}

impl std::fmt::Debug for BitWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitWriter")
            .field("position", &self.pos)
            .field("high_water", &self.high_water)
            .field("capacity", &self.buffer.capacity())
            .finish_non_exhaustive()
    }
}

/// Mask of the low `bits` bits of a byte, `bits` in `0..=8`.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn low_mask(bits: u32) -> u8 {
    ((1u16 << bits) - 1) as u8
}
