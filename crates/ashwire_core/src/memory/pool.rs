//! # Buffer Pool
//!
//! Size-classed allocator for byte buffers that are rented for the lifetime
//! of one packet and then handed back.

use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::config::PoolConfig;
use crate::error::{PoolError, PoolResult};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`BufferPool`], unique within the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolId(u64);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool-{}", self.0)
    }
}

/// Identity token of one issued buffer.
///
/// Carries the issuing pool so ownership can be checked on release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId {
    pool: PoolId,
    serial: u64,
}

impl BufferId {
    /// The pool that issued this buffer.
    #[inline]
    #[must_use]
    pub const fn pool(self) -> PoolId {
        self.pool
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.pool, self.serial)
    }
}

/// Snapshot of pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers created with a fresh heap allocation.
    pub allocations: u64,
    /// Requests served from the free list.
    pub reuses: u64,
    /// Buffers currently lent out.
    pub outstanding: usize,
    /// Idle buffers waiting in the free list.
    pub free_buffers: usize,
}

/// Free list plus the record of every buffer currently lent out.
struct Ledger {
    /// Idle storage, sorted by ascending capacity.
    free: Vec<Vec<u8>>,
    /// Serials of every buffer currently lent out.
    outstanding: HashSet<u64>,
    next_serial: u64,
    allocations: u64,
    reuses: u64,
}

struct PoolShared {
    id: PoolId,
    config: PoolConfig,
    ledger: Mutex<Ledger>,
}

impl PoolShared {
    /// Returns storage to the free list after checking the ledger.
    fn give_back(&self, id: BufferId, mut storage: Vec<u8>) -> PoolResult<()> {
        if id.pool != self.id {
            return Err(PoolError::InvalidOwner {
                buffer: id,
                pool: self.id,
            });
        }

        // Full capacity is usable again regardless of the handle's view.
        storage.resize(storage.capacity(), 0);

        let mut ledger = self.ledger.lock();
        if !ledger.outstanding.remove(&id.serial) {
            return Err(PoolError::DoubleRelease(id));
        }
        if ledger.free.len() >= self.config.max_free_buffers || storage.is_empty() {
            drop(ledger);
            return Ok(());
        }
        let slot = ledger.free.partition_point(|b| b.len() < storage.len());
        ledger.free.insert(slot, storage);
        Ok(())
    }
}

/// Thread-safe pool of reusable byte buffers.
///
/// Cloning a `BufferPool` yields another handle to the same pool, so one
/// pool can be shared by every connection-handling thread.
///
/// # Sizing
///
/// A request for `n` bytes is served by the smallest idle buffer whose
/// capacity is at least `n`. If none fits, a new buffer is allocated with
/// capacity `max(n, min_buffer_size)` rounded up to a power of two.
///
/// # Example
///
/// ```rust
/// use ashwire_core::BufferPool;
///
/// let pool = BufferPool::new();
/// let mut buffer = pool.acquire(20);
/// assert_eq!(buffer.len(), 20);
/// assert_eq!(buffer.capacity(), 32);
/// buffer[0] = 0xFF;
/// // Returned to the pool when dropped
/// ```
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    /// Creates a pool with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates a pool with an explicit configuration.
    #[must_use]
    pub fn with_config(config: PoolConfig) -> Self {
        let id = PoolId(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            shared: Arc::new(PoolShared {
                id,
                config,
                ledger: Mutex::new(Ledger {
                    free: Vec::new(),
                    outstanding: HashSet::new(),
                    next_serial: 0,
                    allocations: 0,
                    reuses: 0,
                }),
            }),
        }
    }

    /// This pool's identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> PoolId {
        self.shared.id
    }

    /// The configuration this pool was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let ledger = self.shared.ledger.lock();
        PoolStats {
            allocations: ledger.allocations,
            reuses: ledger.reuses,
            outstanding: ledger.outstanding.len(),
            free_buffers: ledger.free.len(),
        }
    }

    /// Rents a zeroed buffer of at least `min_size` bytes.
    ///
    /// The handle's length is exactly `min_size`; its capacity may be larger.
    #[must_use]
    pub fn acquire(&self, min_size: usize) -> PooledBuffer {
        let (serial, reused) = {
            let mut ledger = self.shared.ledger.lock();
            let slot = ledger.free.partition_point(|b| b.len() < min_size);
            let reused = if slot < ledger.free.len() {
                ledger.reuses += 1;
                Some(ledger.free.remove(slot))
            } else {
                ledger.allocations += 1;
                None
            };
            let serial = ledger.next_serial;
            ledger.next_serial += 1;
            ledger.outstanding.insert(serial);
            (serial, reused)
        };

        let storage = match reused {
            Some(mut storage) => {
                storage.fill(0);
                storage
            }
            None => {
                let capacity = self.shared.config.size_class(min_size);
                tracing::debug!(pool = %self.shared.id, capacity, "allocating pooled buffer");
                vec![0u8; capacity]
            }
        };

        PooledBuffer {
            storage,
            len: min_size,
            id: BufferId {
                pool: self.shared.id,
                serial,
            },
            pool: Arc::downgrade(&self.shared),
        }
    }

    /// Returns a buffer to this pool.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidOwner`] if another pool issued the buffer. The
    /// buffer is then dropped, which hands it back to its real owner.
    pub fn release(&self, mut buffer: PooledBuffer) -> PoolResult<()> {
        self.check_owner(&buffer)?;
        let (storage, _) = buffer.detach();
        self.shared.give_back(buffer.id, storage)
    }

    /// Changes the usable length of a buffer, moving it if it must grow.
    ///
    /// - `new_size == 0` releases the buffer and yields `None`.
    /// - If the capacity already suffices the same storage is re-viewed.
    /// - Otherwise a larger buffer is rented, the overlapping prefix copied
    ///   and the old buffer released.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidOwner`] if another pool issued the buffer.
    pub fn resize(
        &self,
        mut buffer: PooledBuffer,
        new_size: usize,
    ) -> PoolResult<Option<PooledBuffer>> {
        self.check_owner(&buffer)?;

        if new_size == 0 {
            self.release(buffer)?;
            return Ok(None);
        }

        if new_size <= buffer.capacity() {
            let old_len = buffer.len;
            if new_size > old_len {
                buffer.storage[old_len..new_size].fill(0);
            }
            buffer.len = new_size;
            return Ok(Some(buffer));
        }

        let mut grown = self.acquire(new_size);
        let keep = buffer.len.min(new_size);
        grown.storage[..keep].copy_from_slice(&buffer.storage[..keep]);
        self.release(buffer)?;
        Ok(Some(grown))
    }

    /// Returns storage previously detached with [`PooledBuffer::into_raw`].
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidOwner`] if `id` was issued by another pool.
    /// - [`PoolError::DoubleRelease`] if `id` is not currently lent out.
    pub fn reclaim(&self, id: BufferId, storage: Vec<u8>) -> PoolResult<()> {
        self.shared.give_back(id, storage)
    }

    fn check_owner(&self, buffer: &PooledBuffer) -> PoolResult<()> {
        if buffer.id.pool == self.shared.id {
            Ok(())
        } else {
            Err(PoolError::InvalidOwner {
                buffer: buffer.id,
                pool: self.shared.id,
            })
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("id", &self.shared.id)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Dereferences to the usable `len()` bytes. The storage goes back to the
/// issuing pool when the handle is dropped or explicitly released; if the
/// pool no longer exists the storage is simply freed.
pub struct PooledBuffer {
    storage: Vec<u8>,
    len: usize,
    id: BufferId,
    pool: Weak<PoolShared>,
}

impl PooledBuffer {
    /// Identity token of this loan.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> BufferId {
        self.id
    }

    /// Usable length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the usable length is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing storage.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Sets the usable length, clamped to the capacity.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.storage.len());
    }

    /// The whole backing storage, including bytes past `len()`.
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// Mutable access to the whole backing storage.
    #[inline]
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.storage
    }

    /// Detaches the storage for a transport that needs owned bytes.
    ///
    /// The returned vector is truncated to `len()`. The loan stays open in
    /// the pool's ledger until [`BufferPool::reclaim`] is called with the
    /// returned id.
    #[must_use]
    pub fn into_raw(mut self) -> (BufferId, Vec<u8>) {
        let (mut storage, _) = self.detach();
        storage.truncate(self.len);
        (self.id, storage)
    }

    /// Takes storage and pool reference out, leaving the handle inert.
    fn detach(&mut self) -> (Vec<u8>, Weak<PoolShared>) {
        (
            std::mem::take(&mut self.storage),
            std::mem::take(&mut self.pool),
        )
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.storage[..self.len]
    }
}

impl DerefMut for PooledBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.storage[..len]
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("id", &self.id)
            .field("len", &self.len)
            .field("capacity", &self.storage.len())
            .finish()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let (storage, pool) = self.detach();
        let Some(shared) = pool.upgrade() else {
            return;
        };
        if let Err(err) = shared.give_back(self.id, storage) {
            tracing::warn!(error = %err, "dropped buffer could not be returned");
        }
    }
}
