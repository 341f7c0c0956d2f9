//! # Memory Management
//!
//! Size-classed byte buffers lent out of a shared pool.
//!
//! ## Design Philosophy
//!
//! Buffers are allocated on first demand and then recycled. During steady
//! state traffic:
//! - No per-packet heap allocations
//! - Best-fit reuse from a capacity-sorted free list
//! - Exactly-once return, enforced by ownership

mod config;
mod pool;

pub use config::PoolConfig;
pub use pool::{BufferId, BufferPool, PoolId, PoolStats, PooledBuffer};
