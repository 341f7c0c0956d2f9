//! # Pool Error Types
//!
//! Misuse of pooled buffers is always reported, never absorbed.

use thiserror::Error;

use crate::memory::{BufferId, PoolId};

/// Errors raised by [`BufferPool`](crate::BufferPool) bookkeeping.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// A buffer was released or resized through a pool that did not issue it.
    #[error("buffer {buffer} is not owned by {pool}")]
    InvalidOwner {
        /// The offending buffer.
        buffer: BufferId,
        /// The pool the operation was attempted on.
        pool: PoolId,
    },

    /// A buffer was returned after it had already been returned.
    #[error("buffer {0} was already released")]
    DoubleRelease(BufferId),
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
