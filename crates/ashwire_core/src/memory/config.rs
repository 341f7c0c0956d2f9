//! Pool tuning knobs.

use serde::Deserialize;

/// Smallest buffer the pool will ever hand out.
pub const DEFAULT_MIN_BUFFER_SIZE: usize = 16;

/// Default cap on idle buffers kept for reuse.
pub const DEFAULT_MAX_FREE_BUFFERS: usize = 1024;

/// Buffer pool configuration.
///
/// Loaded once at startup as part of the codec configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Floor applied to every request before rounding up to a power of two.
    pub min_buffer_size: usize,
    /// Idle buffers beyond this count are freed instead of kept.
    pub max_free_buffers: usize,
}

impl PoolConfig {
    /// Capacity the pool allocates for a request of `min_size` bytes.
    ///
    /// The request is raised to the floor, then rounded up to the next power
    /// of two. The result is never smaller than `min_size`.
    #[must_use]
    pub fn size_class(&self, min_size: usize) -> usize {
        let wanted = min_size.max(self.min_buffer_size).max(1);
        wanted.checked_next_power_of_two().unwrap_or(wanted)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_buffer_size: DEFAULT_MIN_BUFFER_SIZE,
            max_free_buffers: DEFAULT_MAX_FREE_BUFFERS,
        }
    }
}
