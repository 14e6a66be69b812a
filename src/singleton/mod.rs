//! Process-wide pools addressed by key
//!
//! One [`ChunkPool`] per distinct [`PoolKey`], created lazily on first
//! use and alive until process teardown. The registry path is the only
//! synchronized part of creation: concurrent first uses of the same key
//! still produce exactly one pool. Individual operations lock the key's
//! pool mutex; the lock is uncontended in the intended single-threaded
//! usage, and callers that share a key across threads get the pool's
//! operations serialized rather than racing.
//!
//! Two different keys never share blocks or free lists, even when their
//! chunk sizes are equal.

use core::ptr::NonNull;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::pool::{ChunkPool, GrowthPolicy};

/// Key addressing one process-wide pool
///
/// The pair of a tag and a chunk size selects the pool; the tag keeps
/// same-sized pools of unrelated subsystems apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    /// Namespace tag distinguishing pools of equal chunk size
    pub tag: &'static str,
    /// Chunk size in bytes of the keyed pool (must be at least 1)
    pub chunk_size: usize,
}

impl PoolKey {
    /// Creates a pool key
    pub const fn new(tag: &'static str, chunk_size: usize) -> Self {
        Self { tag, chunk_size }
    }
}

/// Registry of keyed pools; entries are leaked so the pools live until
/// process teardown, matching their construct-on-first-use lifetime.
static REGISTRY: Lazy<DashMap<PoolKey, &'static Mutex<ChunkPool>>> = Lazy::new(DashMap::new);

fn create_pool(key: PoolKey, policy: GrowthPolicy) -> &'static Mutex<ChunkPool> {
    debug!(tag = key.tag, chunk_size = key.chunk_size, "creating singleton pool");
    let pool = match ChunkPool::with_policy(key.chunk_size, policy) {
        Ok(pool) => pool,
        Err(err) => panic!("invalid singleton pool key {key:?}: {err}"),
    };
    Box::leak(Box::new(Mutex::new(pool)))
}

fn pool_for(key: PoolKey) -> &'static Mutex<ChunkPool> {
    // The entry API makes creation idempotent: whichever thread wins the
    // shard lock creates the pool, everyone else sees that one.
    *REGISTRY
        .entry(key)
        .or_insert_with(|| create_pool(key, GrowthPolicy::default()))
}

/// Static face of the keyed pool registry
///
/// All operations mirror the [`ChunkPool`] contracts but are addressed by
/// [`PoolKey`] instead of an instance handle.
///
/// # Panics
///
/// First use of a key with `chunk_size == 0` panics: keys are expected to
/// be compile-time constants, and a zero chunk size is a programming
/// error rather than a recoverable condition.
pub struct SingletonPool;

impl SingletonPool {
    /// Pre-creates the pool for `key` with a non-default growth policy
    ///
    /// Returns `true` if this call created the pool. First use wins: once
    /// the pool exists (from an earlier `initialize` or any other
    /// operation on the key), the policy argument is ignored.
    pub fn initialize(key: PoolKey, policy: GrowthPolicy) -> bool {
        let mut created = false;
        REGISTRY.entry(key).or_insert_with(|| {
            created = true;
            create_pool(key, policy)
        });
        created
    }

    /// Allocates one chunk from the keyed pool
    ///
    /// Same contract as [`ChunkPool::malloc`].
    pub fn malloc(key: PoolKey) -> Option<NonNull<u8>> {
        pool_for(key).lock().malloc()
    }

    /// Returns a chunk to the keyed pool
    ///
    /// # Safety
    /// Same contract as [`ChunkPool::free`]: `ptr` must come from an
    /// allocation under the **same key** and must not be freed twice.
    pub unsafe fn free(key: PoolKey, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { pool_for(key).lock().free(ptr) }
    }

    /// Checks whether `ptr` belongs to the keyed pool
    ///
    /// Same contract as [`ChunkPool::is_from`]; a pointer obtained under
    /// a different key is never reported as belonging to this one.
    pub fn is_from(key: PoolKey, ptr: *const u8) -> bool {
        pool_for(key).lock().is_from(ptr)
    }

    /// Allocates `n` contiguous chunks from the keyed pool
    ///
    /// Same contract as [`ChunkPool::ordered_malloc`].
    pub fn ordered_malloc(key: PoolKey, n: usize) -> Option<NonNull<u8>> {
        pool_for(key).lock().ordered_malloc(n)
    }

    /// Returns a run of `n` contiguous chunks to the keyed pool
    ///
    /// # Safety
    /// Same contract as [`ChunkPool::free_run`], under the same key.
    pub unsafe fn free_run(key: PoolKey, ptr: NonNull<u8>, n: usize) {
        // SAFETY: forwarded caller contract.
        unsafe { pool_for(key).lock().free_run(ptr, n) }
    }

    /// Releases the keyed pool's fully-free blocks
    ///
    /// Blocks with at least one allocated chunk stay untouched. Returns
    /// the number of blocks released.
    pub fn release_memory(key: PoolKey) -> usize {
        pool_for(key).lock().release_memory()
    }

    /// Unconditionally tears down the keyed pool's memory
    ///
    /// Every pointer previously obtained under `key` dangles afterwards;
    /// the pool itself stays registered and usable for new allocations.
    pub fn purge_memory(key: PoolKey) {
        pool_for(key).lock().purge_memory()
    }

    /// Effective chunk size of the keyed pool
    pub fn chunk_size(key: PoolKey) -> usize {
        pool_for(key).lock().chunk_size()
    }
}
