//! Compression scopes on the writer and reader.

use std::ops::{Deref, DerefMut};

use super::lz4::{compress, decompress};
use crate::bits::{BitReader, BitWriter};
use crate::error::{CodecError, CodecResult};

/// Whether a compressed region carries its own size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompressedLength {
    /// Compressed bytes only. The reader must know where the region ends.
    #[default]
    Omitted,
    /// A big-endian `u32` compressed byte count precedes the region.
    Prefixed,
}

/// A child writer whose bytes are LZ4-compressed into its parent on
/// [`finish`](Self::finish).
///
/// Dereferences to the child [`BitWriter`]. Compression happens once, at
/// `finish`, and the result lands at the parent's cursor as it is *then*.
/// Dropping the scope without finishing abandons it: the parent is left
/// untouched and the child buffer returns to the pool.
///
/// # Example
///
/// ```rust
/// use ashwire_core::BufferPool;
/// use ashwire_protocol::{BitWriter, CompressedLength};
///
/// let pool = BufferPool::new();
/// let mut writer = BitWriter::new(&pool);
/// writer.write_u8(7).unwrap();
///
/// let mut scope = writer.compressed(CompressedLength::Prefixed);
/// scope.write_bytes(&[0u8; 512]).unwrap();
/// let size = scope.finish().unwrap();
///
/// assert_eq!(writer.len(), 1 + 4 + size);
/// ```
#[must_use = "a compression scope writes nothing until it is finished"]
pub struct CompressedWriter<'p> {
    parent: &'p mut BitWriter,
    child: BitWriter,
    length: CompressedLength,
}

impl CompressedWriter<'_> {
    /// Framing this scope will use.
    #[inline]
    pub const fn length(&self) -> CompressedLength {
        self.length
    }

    /// Compresses the child's bytes and appends them to the parent.
    ///
    /// Returns the compressed size, excluding any length prefix.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Compress`] if the codec fails.
    /// - [`CodecError::LengthOverflow`] if a prefixed region exceeds `u32`.
    /// - Pool errors from either writer.
    pub fn finish(self) -> CodecResult<usize> {
        let Self {
            parent,
            child,
            length,
        } = self;

        let compressed = compress(parent.pool(), child.data())?;
        if length == CompressedLength::Prefixed {
            let size = u32::try_from(compressed.len()).map_err(|_| CodecError::LengthOverflow {
                len: compressed.len(),
                width: 4,
            })?;
            parent.write_u32(size)?;
        }
        parent.write_bytes(&compressed)?;

        tracing::trace!(
            raw = child.len(),
            compressed = compressed.len(),
            "compression scope closed"
        );
        Ok(compressed.len())
    }
}

impl Deref for CompressedWriter<'_> {
    type Target = BitWriter;

    #[inline]
    fn deref(&self) -> &BitWriter {
        &self.child
    }
}

impl DerefMut for CompressedWriter<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut BitWriter {
        &mut self.child
    }
}

impl BitWriter {
    /// Opens a compression scope over this writer.
    ///
    /// The child writer rents its buffer from the same pool.
    pub fn compressed(&mut self, length: CompressedLength) -> CompressedWriter<'_> {
        let child = BitWriter::new(self.pool());
        CompressedWriter {
            parent: self,
            child,
            length,
        }
    }

    /// Runs `body` inside a compression scope and finishes it.
    ///
    /// Returns the compressed size. If `body` fails the scope is abandoned
    /// and the parent is untouched.
    ///
    /// # Errors
    ///
    /// Errors from `body` or from [`CompressedWriter::finish`].
    pub fn write_compressed<F>(&mut self, length: CompressedLength, body: F) -> CodecResult<usize>
    where
        F: FnOnce(&mut BitWriter) -> CodecResult<()>,
    {
        let mut scope = self.compressed(length);
        body(&mut scope)?;
        scope.finish()
    }
}

impl BitReader<'_> {
    /// Decompresses the next `compressed_len` bytes into a new reader.
    ///
    /// `expected_len` is the first output-size guess; see
    /// [`decompress`](super::decompress) for the growth policy. On success
    /// this reader moves past the compressed bytes; on failure it does not
    /// move.
    ///
    /// # Errors
    ///
    /// - [`CodecError::NotEnoughData`] if fewer than `compressed_len` bytes remain.
    /// - [`CodecError::BufferTooSmall`] or [`CodecError::Decompress`] from decoding.
    pub fn read_compressed(
        &mut self,
        compressed_len: usize,
        expected_len: usize,
        max_attempts: u32,
    ) -> CodecResult<BitReader<'static>> {
        self.require(compressed_len * 8)?;
        let start = self.position();

        let output = if start.is_aligned() {
            let from = start.byte_index();
            let span = &self.data()[from..from + compressed_len];
            decompress(self.pool(), span, expected_len, max_attempts)?
        } else {
            let mut staging = self.pool().acquire(compressed_len);
            self.read_bytes_into(&mut staging)?;
            self.seek_to(start)?;
            decompress(self.pool(), &staging, expected_len, max_attempts)?
        };

        self.advance_bytes(compressed_len);
        Ok(BitReader::from_buffer(output, self.pool()))
    }

    /// Reads a `u32` length prefix, then decompresses that many bytes.
    ///
    /// On failure the cursor is restored to before the prefix.
    ///
    /// # Errors
    ///
    /// As [`read_compressed`](Self::read_compressed).
    pub fn read_compressed_prefixed(
        &mut self,
        expected_len: usize,
        max_attempts: u32,
    ) -> CodecResult<BitReader<'static>> {
        let start = self.position();
        let size = self.read_u32()? as usize;
        let result = self.read_compressed(size, expected_len, max_attempts);
        if result.is_err() {
            self.seek_to(start)?;
        }
        result
    }
}
