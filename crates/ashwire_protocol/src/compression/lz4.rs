//! LZ4 block codec over pooled buffers.

use ashwire_core::{BufferPool, PooledBuffer};
use lz4_flex::block::{self, DecompressError};

use crate::error::{CodecError, CodecResult};

/// Compresses `input` into a pooled staging buffer.
///
/// The staging buffer is sized with the codec's worst-case bound. Empty
/// input yields an empty buffer without invoking the codec.
///
/// # Errors
///
/// [`CodecError::Compress`] if the codec rejects the input.
pub fn compress(pool: &BufferPool, input: &[u8]) -> CodecResult<PooledBuffer> {
    if input.is_empty() {
        return Ok(pool.acquire(0));
    }
    let mut staging = pool.acquire(block::get_maximum_output_size(input.len()));
    let written = block::compress_into(input, &mut staging)
        .map_err(|err| CodecError::Compress(err.to_string()))?;
    staging.set_len(written);
    Ok(staging)
}

/// Decompresses `input` into a pooled buffer.
///
/// The first attempt decodes into exactly `expected_len` bytes. Each time
/// the output does not fit, that limit is doubled and decoding starts over,
/// for at most `max_attempts` attempts (a zero limit still allows one). The
/// limit never depends on how large a recycled pool buffer happens to be.
/// Empty input yields an empty buffer without invoking the codec.
///
/// # Errors
///
/// - [`CodecError::BufferTooSmall`] once every attempt ran out of room.
/// - [`CodecError::Decompress`] if the input is corrupt.
pub fn decompress(
    pool: &BufferPool,
    input: &[u8],
    expected_len: usize,
    max_attempts: u32,
) -> CodecResult<PooledBuffer> {
    if input.is_empty() {
        return Ok(pool.acquire(0));
    }

    let attempts = max_attempts.max(1);
    let mut target = expected_len.max(1);
    let mut capacity = target;
    for attempt in 1..=attempts {
        capacity = target;
        let mut output = pool.acquire(capacity);
        output.set_len(capacity);

        match block::decompress_into(input, &mut output) {
            Ok(written) => {
                output.set_len(written);
                return Ok(output);
            }
            Err(DecompressError::OutputTooSmall { expected, actual }) => {
                tracing::debug!(
                    attempt,
                    capacity,
                    expected,
                    actual,
                    "decompression output too small, growing"
                );
                target = capacity.saturating_mul(2);
            }
            Err(err) => return Err(CodecError::Decompress(err.to_string())),
        }
    }

    Err(CodecError::BufferTooSmall { attempts, capacity })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let pool = BufferPool::new();
        let input: Vec<u8> = (0..2000u32).map(|i| (i % 17) as u8).collect();
        let compressed = compress(&pool, &input).unwrap();
        assert!(compressed.len() < input.len());

        let restored = decompress(&pool, &compressed, input.len(), 1).unwrap();
        assert_eq!(&restored[..], input.as_slice());
    }

    #[test]
    fn test_empty_input() {
        let pool = BufferPool::new();
        let compressed = compress(&pool, &[]).unwrap();
        assert!(compressed.is_empty());
        let restored = decompress(&pool, &[], 100, 1).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_undersized_guess_grows() {
        let pool = BufferPool::new();
        let zeros = [0u8; 200];
        let compressed = compress(&pool, &zeros).unwrap();

        let restored = decompress(&pool, &compressed, 50, 4).unwrap();
        assert_eq!(restored.len(), 200);
        assert!(restored.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_attempts_exhausted() {
        let pool = BufferPool::new();
        let zeros = vec![0u8; 10_000];
        let compressed = compress(&pool, &zeros).unwrap();

        let err = decompress(&pool, &compressed, 16, 2).unwrap_err();
        assert_eq!(
            err,
            CodecError::BufferTooSmall {
                attempts: 2,
                capacity: 32
            }
        );
        assert_eq!(pool.stats().outstanding, 1); // only `compressed`
    }

    #[test]
    fn test_attempt_limit_ignores_recycled_capacity() {
        let pool = BufferPool::new();
        let zeros = vec![0u8; 10_000];
        let compressed = compress(&pool, &zeros).unwrap();

        // Leave a 16 KiB buffer on the free list; the 16-byte guess must
        // still be treated as 16 bytes.
        drop(pool.acquire(16 * 1024));
        assert!(pool.stats().free_buffers >= 1);

        let err = decompress(&pool, &compressed, 16, 2).unwrap_err();
        assert_eq!(
            err,
            CodecError::BufferTooSmall {
                attempts: 2,
                capacity: 32
            }
        );

        let restored = decompress(&pool, &compressed, 16, 10).unwrap();
        assert_eq!(restored.len(), 10_000);
    }

    #[test]
    fn test_corrupt_input() {
        let pool = BufferPool::new();
        // Literal length of 15+ with nothing behind it.
        let err = decompress(&pool, &[0xF0], 64, 3).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Decompress(_) | CodecError::BufferTooSmall { .. }
        ));
    }
}
