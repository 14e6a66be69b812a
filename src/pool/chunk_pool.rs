//! Raw chunk pool with an intrusive free list
//!
//! # Safety
//!
//! This module implements a single-threaded pool allocator:
//! - Fixed-size chunks organized in a singly-linked free list
//! - Free chunks store the next pointer in their first bytes (intrusive
//!   list), so the effective chunk size is never below pointer size
//! - Blocks are acquired from a [`BlockSource`] and released exactly once
//!
//! ## Invariants
//!
//! - Every chunk reachable from the free-list head lies inside an owned
//!   block at a chunk-aligned offset and is not allocated
//! - The free list never contains a cycle and never references memory of
//!   a released block
//! - `free_count` equals the length of the free list

use core::alloc::Layout;
use core::mem;
use core::ptr::{self, NonNull};

use tracing::{debug, trace};

use super::block::Block;
use super::config::{GrowthPolicy, PoolConfig};
use super::stats::{Counters, PoolStats};
use crate::error::{AllocError, AllocResult};
use crate::source::{BlockSource, SystemSource};
use crate::utils::align_up;

/// Node embedded in the first bytes of every free chunk
#[repr(C)]
struct FreeChunk {
    next: *mut FreeChunk,
}

/// Pool of fixed-size chunks carved from source-acquired blocks
///
/// `malloc`/`free` are O(1) pops and pushes on an intrusive free list.
/// When the list runs dry the pool acquires a new block whose chunk count
/// follows the configured [`GrowthPolicy`].
///
/// # Memory layout
/// ```text
/// block 0: [chunk][chunk][chunk][chunk]
/// block 1: [chunk][chunk][chunk][chunk][chunk][chunk][chunk][chunk]
///             |             |______________________________|
///          free head ------/         (intrusive links)
/// ```
///
/// # Concurrency
///
/// The pool performs no internal locking; all mutating operations take
/// `&mut self`. Sharing one pool across threads requires external
/// synchronization - see [`SingletonPool`](crate::singleton::SingletonPool)
/// for the mutex-wrapped process-wide variant.
pub struct ChunkPool<S: BlockSource = SystemSource> {
    /// Effective chunk size: requested size rounded up to hold a free-list
    /// link and to a multiple of `align`
    chunk_size: usize,
    /// Alignment of every block, and therefore of every chunk
    align: usize,

    /// Blocks owned by this pool, in acquisition order
    blocks: Vec<Block>,

    /// Head of the intrusive free list (LIFO)
    free_head: *mut FreeChunk,
    /// Number of chunks on the free list
    free_count: usize,

    /// Chunk count of the next block to acquire
    next_chunks: usize,
    policy: GrowthPolicy,
    config: PoolConfig,

    source: S,
    counters: Counters,
}

impl ChunkPool<SystemSource> {
    /// Creates a pool of `chunk_size`-byte chunks with the default growth
    /// policy, backed by the system allocator
    ///
    /// # Errors
    /// Returns [`AllocError::InvalidConfig`] if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> AllocResult<Self> {
        Self::with_policy(chunk_size, GrowthPolicy::default())
    }

    /// Creates a pool with a custom growth policy
    pub fn with_policy(chunk_size: usize, policy: GrowthPolicy) -> AllocResult<Self> {
        Self::with_config(chunk_size, policy, PoolConfig::default())
    }

    /// Creates a pool with a custom growth policy and configuration
    pub fn with_config(
        chunk_size: usize,
        policy: GrowthPolicy,
        config: PoolConfig,
    ) -> AllocResult<Self> {
        Self::with_source(chunk_size, policy, config, SystemSource::new())
    }
}

impl<S: BlockSource> ChunkPool<S> {
    /// Creates a pool drawing blocks from an explicit source
    pub fn with_source(
        chunk_size: usize,
        policy: GrowthPolicy,
        config: PoolConfig,
        source: S,
    ) -> AllocResult<Self> {
        Self::with_layout(chunk_size, mem::align_of::<*mut u8>(), policy, config, source)
    }

    /// Shared constructor; `align` must be a power of two at least
    /// pointer-aligned so free chunks can hold their link.
    pub(crate) fn with_layout(
        chunk_size: usize,
        align: usize,
        policy: GrowthPolicy,
        config: PoolConfig,
        source: S,
    ) -> AllocResult<Self> {
        if chunk_size == 0 {
            return Err(AllocError::invalid_config("chunk size must be at least 1"));
        }
        policy.validate().map_err(AllocError::invalid_config)?;
        debug_assert!(align.is_power_of_two());
        debug_assert!(align >= mem::align_of::<*mut u8>());

        // A free chunk stores its list link in place, so round the chunk
        // up to pointer size and to the block alignment.
        let chunk_size = align_up(chunk_size.max(mem::size_of::<*mut u8>()), align);

        Ok(Self {
            chunk_size,
            align,
            blocks: Vec::new(),
            free_head: ptr::null_mut(),
            free_count: 0,
            next_chunks: policy.initial_chunks,
            policy,
            config,
            source,
            counters: Counters::default(),
        })
    }

    /// Effective chunk size in bytes
    ///
    /// At least the requested size; rounded up to hold a free-list link.
    /// Runs returned by [`ordered_malloc`](Self::ordered_malloc) stride by
    /// this value.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks currently on the free list
    pub fn free_chunks(&self) -> usize {
        self.free_count
    }

    /// Number of chunks across all owned blocks, free or allocated
    pub fn owned_chunks(&self) -> usize {
        self.blocks.iter().map(Block::chunks).sum()
    }

    /// Number of blocks currently owned
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Chunk count of the next block the pool will acquire
    pub fn next_block_chunks(&self) -> usize {
        self.next_chunks
    }

    /// Overrides the chunk count of the next block to acquire
    ///
    /// The growth policy keeps applying from the new value onward. A zero
    /// request is clamped to one chunk.
    pub fn set_next_block_chunks(&mut self, chunks: usize) {
        self.next_chunks = chunks.max(1);
    }

    /// Statistics snapshot, if tracking is enabled
    pub fn stats(&self) -> Option<PoolStats> {
        if !self.config.track_stats {
            return None;
        }
        Some(PoolStats {
            total_allocs: self.counters.total_allocs,
            total_frees: self.counters.total_frees,
            blocks_acquired: self.counters.blocks_acquired,
            blocks_released: self.counters.blocks_released,
            free_chunks: self.free_count,
            owned_chunks: self.owned_chunks(),
            chunk_size: self.chunk_size,
        })
    }

    /// Checks whether `ptr` addresses a chunk owned by this pool
    ///
    /// True iff `ptr` lies within an owned block at a chunk-aligned
    /// offset, regardless of allocation state. O(blocks).
    pub fn is_from(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        self.blocks
            .iter()
            .any(|block| block.contains_chunk(addr, self.chunk_size))
    }

    /// Allocates one chunk
    ///
    /// Pops the free-list head; on an empty list, acquires a new block per
    /// the growth policy first. Returns `None` if the block source cannot
    /// supply memory. The chunk contents are uninitialized.
    pub fn malloc(&mut self) -> Option<NonNull<u8>> {
        if self.free_head.is_null() {
            if let Err(err) = self.grow() {
                debug!(error = %err, "pool growth failed");
                return None;
            }
        }
        let chunk = self.pop_head();
        if self.config.track_stats && chunk.is_some() {
            self.counters.total_allocs += 1;
        }
        chunk
    }

    /// Returns a chunk to the pool
    ///
    /// Pushes `ptr` onto the free-list head; the previous contents of the
    /// chunk are discarded.
    ///
    /// # Safety
    /// - `ptr` must have been returned by `malloc`/`ordered_malloc` on
    ///   this pool and not freed since
    /// - a double free or a foreign pointer corrupts the free list;
    ///   [`PoolConfig::membership_checks`] turns both into panics
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        if self.config.membership_checks {
            assert!(
                self.is_from(ptr.as_ptr()),
                "freed pointer does not belong to this pool"
            );
            assert!(
                !self.free_list_contains(ptr.as_ptr() as usize),
                "double free of pool chunk"
            );
        }

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: ptr addresses a chunk of chunk_size bytes owned by
            // this pool (caller contract).
            unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, self.chunk_size) };
        }

        let chunk = ptr.as_ptr().cast::<FreeChunk>();
        // SAFETY: the chunk is at least pointer-sized and pointer-aligned;
        // it is no longer in use, so its bytes may hold the list link.
        unsafe { (*chunk).next = self.free_head };
        self.free_head = chunk;
        self.free_count += 1;
        if self.config.track_stats {
            self.counters.total_frees += 1;
        }
    }

    /// Returns a run of `n` contiguous chunks to the pool
    ///
    /// Counterpart of [`ordered_malloc`](Self::ordered_malloc); chunks are
    /// pushed in reverse so the run re-enters the list in address order.
    ///
    /// # Safety
    /// Same contract as [`free`](Self::free), applied to every chunk of a
    /// run previously returned by `ordered_malloc(n)` on this pool.
    pub unsafe fn free_run(&mut self, ptr: NonNull<u8>, n: usize) {
        let start = ptr.as_ptr() as usize;
        for i in (0..n).rev() {
            // SAFETY: every chunk of the run is non-null (offset from a
            // valid chunk) and carries the caller's free contract.
            unsafe {
                let chunk = NonNull::new_unchecked((start + i * self.chunk_size) as *mut u8);
                self.free(chunk);
            }
        }
    }

    /// Allocates `n` contiguous chunks as a single run
    ///
    /// First rebuilds the free list in strictly increasing address order
    /// and scans it for `n` physically adjacent free chunks; only if no
    /// such run exists does the pool grow, by a block holding at least `n`
    /// chunks. The sorted order is kept afterwards, which amortizes future
    /// calls; the rebuild costs O(free chunks · log(free chunks)) each
    /// invocation - an explicit tradeoff against plain `malloc`.
    ///
    /// Returns `None` if `n` is zero or the block source cannot supply
    /// memory. The run starts at the returned pointer and strides by
    /// [`chunk_size`](Self::chunk_size).
    pub fn ordered_malloc(&mut self, n: usize) -> Option<NonNull<u8>> {
        if n == 0 {
            return None;
        }

        self.rebuild_sorted();

        let run = match self.take_run(n) {
            Some(run) => run,
            None => match self.grow_for_run(n) {
                Ok(run) => run,
                Err(err) => {
                    debug!(error = %err, chunks = n, "ordered growth failed");
                    return None;
                }
            },
        };

        if self.config.track_stats {
            self.counters.total_allocs += n as u64;
        }
        Some(run)
    }

    /// Releases every fully-free block back to the block source
    ///
    /// Blocks with at least one allocated chunk are untouched. The free
    /// list is rebuilt (in address order) without the chunks of released
    /// blocks. Returns the number of blocks released.
    pub fn release_memory(&mut self) -> usize {
        if self.blocks.is_empty() {
            return 0;
        }

        // Count free chunks per block to find fully-free blocks.
        let mut free_per_block = vec![0usize; self.blocks.len()];
        let mut free_addrs = Vec::with_capacity(self.free_count);
        let mut cur = self.free_head;
        while !cur.is_null() {
            let addr = cur as usize;
            free_addrs.push(addr);
            if let Some(index) = self.block_index_of(addr) {
                free_per_block[index] += 1;
            }
            // SAFETY: cur was reached from the free-list head; list nodes
            // are valid free chunks inside owned blocks.
            cur = unsafe { (*cur).next };
        }

        let releasable: Vec<bool> = self
            .blocks
            .iter()
            .zip(&free_per_block)
            .map(|(block, &free)| free == block.chunks())
            .collect();
        if !releasable.contains(&true) {
            return 0;
        }

        // Drop free-list entries that live in blocks about to go away.
        free_addrs.retain(|&addr| {
            self.block_index_of(addr)
                .map_or(false, |index| !releasable[index])
        });
        free_addrs.sort_unstable();

        let blocks = mem::take(&mut self.blocks);
        let mut released = 0usize;
        for (block, release) in blocks.into_iter().zip(releasable) {
            if release {
                // SAFETY: the block was acquired from this source with
                // this layout and is released exactly once here.
                unsafe { self.source.release(block.ptr(), block.layout()) };
                released += 1;
            } else {
                self.blocks.push(block);
            }
        }

        self.relink(&free_addrs);
        if self.config.track_stats {
            self.counters.blocks_released += released as u64;
        }
        debug!(released, remaining = self.blocks.len(), "released unused blocks");
        released
    }

    /// Unconditionally releases every owned block
    ///
    /// Bulk teardown: all chunks - allocated or not - are returned to the
    /// block source and every pointer previously handed out dangles. Must
    /// only be called when no live references into the pool remain.
    pub fn purge_memory(&mut self) {
        let blocks = mem::take(&mut self.blocks);
        let purged = blocks.len();
        for block in blocks {
            // SAFETY: each owned block was acquired from this source with
            // this layout and is released exactly once here.
            unsafe { self.source.release(block.ptr(), block.layout()) };
        }
        self.free_head = ptr::null_mut();
        self.free_count = 0;
        if self.config.track_stats {
            self.counters.blocks_released += purged as u64;
        }
        if purged > 0 {
            debug!(blocks = purged, "purged pool memory");
        }
    }

    /// Acquires a block of `chunks` chunks and registers it, without
    /// touching the free list. Advances the growth ladder.
    fn acquire_block(&mut self, chunks: usize) -> AllocResult<NonNull<u8>> {
        let bytes = chunks
            .checked_mul(self.chunk_size)
            .ok_or_else(|| AllocError::size_overflow("block size"))?;
        let layout = Layout::from_size_align(bytes, self.align)
            .map_err(|_| AllocError::size_overflow("block layout"))?;

        let ptr = self.source.acquire(layout)?;

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the block was just acquired and is exclusively ours.
            unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, bytes) };
        }

        self.blocks.push(Block::new(ptr, layout, chunks));
        self.next_chunks = self.policy.next(chunks);
        if self.config.track_stats {
            self.counters.blocks_acquired += 1;
        }
        debug!(
            chunks,
            bytes,
            chunk_size = self.chunk_size,
            "acquired block from source"
        );
        Ok(ptr)
    }

    /// Grows by one policy-sized block and links its chunks, in address
    /// order, ahead of the current free list.
    fn grow(&mut self) -> AllocResult<()> {
        let chunks = self.next_chunks.max(1);
        let ptr = self.acquire_block(chunks)?;
        let start = ptr.as_ptr() as usize;

        // SAFETY: all chunk addresses lie inside the block just acquired,
        // are chunk-aligned, and no other reference to them exists yet.
        unsafe {
            for i in 0..chunks {
                let chunk = (start + i * self.chunk_size) as *mut FreeChunk;
                (*chunk).next = if i + 1 == chunks {
                    self.free_head
                } else {
                    (start + (i + 1) * self.chunk_size) as *mut FreeChunk
                };
            }
        }
        self.free_head = start as *mut FreeChunk;
        self.free_count += chunks;
        Ok(())
    }

    /// Grows for an `n`-chunk run: acquires a block of at least `n`
    /// chunks, returns its leading run, and merges the remainder into the
    /// (already sorted) free list.
    fn grow_for_run(&mut self, n: usize) -> AllocResult<NonNull<u8>> {
        let chunks = self.next_chunks.max(n);
        let ptr = self.acquire_block(chunks)?;
        let start = ptr.as_ptr() as usize;

        if chunks > n {
            let mut addrs = self.collect_free_addrs();
            addrs.extend((n..chunks).map(|i| start + i * self.chunk_size));
            addrs.sort_unstable();
            self.relink(&addrs);
        }

        trace!(run = n, spare = chunks - n, "carved run from fresh block");
        Ok(ptr)
    }

    /// Pops the free-list head. `None` only when the list is empty.
    fn pop_head(&mut self) -> Option<NonNull<u8>> {
        let head = self.free_head;
        if head.is_null() {
            return None;
        }
        // SAFETY: head is a valid free chunk (free-list invariant).
        self.free_head = unsafe { (*head).next };
        self.free_count -= 1;
        NonNull::new(head.cast())
    }

    /// Walks the sorted free list for `n` address-contiguous chunks and
    /// unlinks the first such run. Requires the list to be sorted.
    fn take_run(&mut self, n: usize) -> Option<NonNull<u8>> {
        let mut cur = self.free_head;
        let mut prev_node: *mut FreeChunk = ptr::null_mut();
        let mut run_head = cur;
        let mut before_run: *mut FreeChunk = ptr::null_mut();
        let mut run_len = 0usize;

        while !cur.is_null() {
            if run_len > 0 && (cur as usize) == (prev_node as usize) + self.chunk_size {
                run_len += 1;
            } else {
                run_head = cur;
                before_run = prev_node;
                run_len = 1;
            }

            if run_len == n {
                // SAFETY: cur is the run's last node; unlinking the run
                // splices its predecessor to its successor.
                let after = unsafe { (*cur).next };
                if before_run.is_null() {
                    self.free_head = after;
                } else {
                    // SAFETY: before_run is a live list node preceding the run.
                    unsafe { (*before_run).next = after };
                }
                self.free_count -= n;
                return NonNull::new(run_head.cast());
            }

            prev_node = cur;
            // SAFETY: cur is a valid free chunk (free-list invariant).
            cur = unsafe { (*cur).next };
        }
        None
    }

    /// Rebuilds the free list in strictly increasing address order.
    fn rebuild_sorted(&mut self) {
        if self.free_count < 2 {
            return;
        }
        let mut addrs = self.collect_free_addrs();
        addrs.sort_unstable();
        self.relink(&addrs);
    }

    /// Collects the free list into a vector of chunk addresses.
    fn collect_free_addrs(&self) -> Vec<usize> {
        let mut addrs = Vec::with_capacity(self.free_count);
        let mut cur = self.free_head;
        while !cur.is_null() {
            addrs.push(cur as usize);
            // SAFETY: cur is a valid free chunk (free-list invariant).
            cur = unsafe { (*cur).next };
        }
        addrs
    }

    /// Relinks the free list to exactly `addrs`, preserving their order.
    fn relink(&mut self, addrs: &[usize]) {
        let mut head: *mut FreeChunk = ptr::null_mut();
        for &addr in addrs.iter().rev() {
            let chunk = addr as *mut FreeChunk;
            // SAFETY: every addr in addrs is a free chunk inside an owned
            // block (collected from the list or from a fresh block).
            unsafe { (*chunk).next = head };
            head = chunk;
        }
        self.free_head = head;
        self.free_count = addrs.len();
    }

    /// Index of the owned block containing `addr`, if any.
    fn block_index_of(&self, addr: usize) -> Option<usize> {
        self.blocks.iter().position(|block| block.contains(addr))
    }

    /// Debug-check helper: whether `addr` is already on the free list.
    fn free_list_contains(&self, addr: usize) -> bool {
        let mut cur = self.free_head;
        while !cur.is_null() {
            if cur as usize == addr {
                return true;
            }
            // SAFETY: cur is a valid free chunk (free-list invariant).
            cur = unsafe { (*cur).next };
        }
        false
    }
}

impl<S: BlockSource> Drop for ChunkPool<S> {
    fn drop(&mut self) {
        self.purge_memory();
    }
}

// SAFETY: the pool exclusively owns its blocks and free list; raw
// pointers never alias memory outside the owned blocks, and all access
// goes through &mut self. Moving the pool to another thread moves that
// ownership wholesale.
unsafe impl<S: BlockSource + Send> Send for ChunkPool<S> {}
