//! # ASHWIRE Core
//!
//! Pooled memory for the ASHWIRE wire codec.
//!
//! Every outgoing and incoming packet on a busy relay server needs scratch
//! memory: the writer's growing output, decompression targets, string
//! staging. Allocating that per packet, per player, per tick is the
//! single largest source of allocator churn in the server. This crate
//! lends buffers out of a shared, size-classed free list instead.
//!
//! ## Architecture Rules
//!
//! 1. **Move-only handles** - a [`PooledBuffer`] cannot be copied, so it
//!    cannot be released twice through the handle API
//! 2. **Release on drop** - a handle that goes out of scope returns its
//!    storage to the issuing pool exactly once
//! 3. **Ledger-checked raw path** - storage detached for a transport is
//!    tracked by [`BufferId`] and reclaiming it is validated
//!
//! ## Example
//!
//! ```rust
//! use ashwire_core::BufferPool;
//!
//! let pool = BufferPool::new();
//! let buffer = pool.acquire(100);
//! assert!(buffer.capacity() >= 100);
//! pool.release(buffer).unwrap();
//!
//! // Served from the free list, not the allocator
//! let again = pool.acquire(100);
//! assert_eq!(pool.stats().reuses, 1);
//! drop(again);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod memory;

pub use error::{PoolError, PoolResult};
pub use memory::{BufferId, BufferPool, PoolConfig, PoolId, PoolStats, PooledBuffer};
