//! Pool statistics

/// Snapshot of a pool's counters and current shape
///
/// Only populated when [`PoolConfig::track_stats`](super::PoolConfig) is
/// enabled; counters are plain integers, consistent with the pools'
/// single-threaded design.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Chunks handed out by `malloc`/`ordered_malloc`
    pub total_allocs: u64,
    /// Chunks returned by `free`/`free_run`
    pub total_frees: u64,
    /// Blocks acquired from the block source
    pub blocks_acquired: u64,
    /// Blocks released back to the block source
    pub blocks_released: u64,
    /// Chunks currently on the free list
    pub free_chunks: usize,
    /// Chunks in all owned blocks, free or allocated
    pub owned_chunks: usize,
    /// Effective size of each chunk in bytes
    pub chunk_size: usize,
}

/// Internal running counters; folded into [`PoolStats`] on demand.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub(crate) total_allocs: u64,
    pub(crate) total_frees: u64,
    pub(crate) blocks_acquired: u64,
    pub(crate) blocks_released: u64,
}
