//! Typed object pool over a chunk pool

use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

use super::chunk_pool::ChunkPool;
use super::config::{GrowthPolicy, PoolConfig};
use super::pool_box::PoolBox;
use super::stats::PoolStats;
use crate::error::{AllocError, AllocResult, ConstructError};
use crate::source::{BlockSource, SystemSource};

/// Pool of fixed-size slots for values of a single type `T`
///
/// A thin typed layer over one [`ChunkPool`] whose chunks are sized and
/// aligned for `T`. [`malloc`](Self::malloc) hands out raw uninitialized
/// storage; [`construct`](Self::construct)/[`destroy`](Self::destroy) add
/// in-place construction and destruction.
///
/// # Teardown
///
/// Dropping the pool purges its memory **without** running destructors of
/// objects still outstanding. Callers that need `T`'s destructor must
/// call [`destroy`](Self::destroy) (or use [`PoolBox`]) before the pool
/// goes away. This mirrors the pool's raw contract and is a deliberate
/// non-guarantee, not an oversight.
pub struct ObjectPool<T, S: BlockSource = SystemSource> {
    pool: ChunkPool<S>,
    _marker: PhantomData<T>,
}

impl<T> ObjectPool<T, SystemSource> {
    /// Creates an object pool with the default growth policy
    pub fn new() -> AllocResult<Self> {
        Self::with_policy(GrowthPolicy::default())
    }

    /// Creates an object pool with a custom growth policy
    pub fn with_policy(policy: GrowthPolicy) -> AllocResult<Self> {
        Self::with_source(policy, PoolConfig::default(), SystemSource::new())
    }
}

impl<T, S: BlockSource> ObjectPool<T, S> {
    /// Creates an object pool drawing blocks from an explicit source
    pub fn with_source(policy: GrowthPolicy, config: PoolConfig, source: S) -> AllocResult<Self> {
        // Chunks must satisfy T's alignment as well as hold a free-list
        // link while vacant.
        let align = mem::align_of::<T>().max(mem::align_of::<*mut u8>());
        let size = mem::size_of::<T>().max(1);
        let pool = ChunkPool::with_layout(size, align, policy, config, source)?;
        Ok(Self {
            pool,
            _marker: PhantomData,
        })
    }

    /// Allocates uninitialized storage for one `T`
    ///
    /// Does not run any constructor; the caller is responsible for
    /// initializing the slot before reading it. Returns `None` if the
    /// block source cannot supply memory.
    pub fn malloc(&mut self) -> Option<NonNull<T>> {
        self.pool.malloc().map(NonNull::cast)
    }

    /// Allocates storage and moves `value` into it
    ///
    /// # Errors
    /// Returns [`AllocError::OutOfMemory`] if no storage could be
    /// allocated; `value` is dropped in that case.
    pub fn construct(&mut self, value: T) -> AllocResult<NonNull<T>> {
        let ptr = self
            .malloc()
            .ok_or_else(|| AllocError::out_of_memory(mem::size_of::<T>()))?;
        // SAFETY: ptr is a fresh, properly aligned slot for T.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Allocates storage and initializes it with a fallible initializer
    ///
    /// If `init` fails, the reserved slot is returned to the free list
    /// before the error propagates - no chunk leaks on the failure path.
    pub fn construct_with<F, E>(&mut self, init: F) -> Result<NonNull<T>, ConstructError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let ptr = self
            .malloc()
            .ok_or_else(|| AllocError::out_of_memory(mem::size_of::<T>()))?;
        match init() {
            Ok(value) => {
                // SAFETY: ptr is a fresh, properly aligned slot for T.
                unsafe { ptr.as_ptr().write(value) };
                Ok(ptr)
            }
            Err(err) => {
                // SAFETY: the slot was just allocated here and never
                // escaped; returning it cannot double-free.
                unsafe { self.pool.free(ptr.cast()) };
                Err(ConstructError::Init(err))
            }
        }
    }

    /// Constructs a value owned by an RAII [`PoolBox`]
    ///
    /// The box borrows the pool mutably for its lifetime and runs the
    /// destructor plus slot reclamation when dropped.
    pub fn construct_boxed(&mut self, value: T) -> AllocResult<PoolBox<'_, T, S>> {
        let ptr = self.construct(value)?;
        Ok(PoolBox::from_raw(ptr, self))
    }

    /// Destroys the object at `ptr` and reclaims its slot
    ///
    /// Runs `T`'s destructor exactly once, then returns the chunk to the
    /// underlying free list.
    ///
    /// # Safety
    /// - `ptr` must point to an initialized `T` obtained from
    ///   [`construct`](Self::construct)/[`construct_with`](Self::construct_with)
    ///   (or `malloc` plus manual initialization) on this pool
    /// - the object must not be destroyed twice or used afterwards
    pub unsafe fn destroy(&mut self, ptr: NonNull<T>) {
        // SAFETY: ptr holds an initialized T per the caller contract; the
        // slot goes straight back to the free list afterwards.
        unsafe {
            ptr::drop_in_place(ptr.as_ptr());
            self.pool.free(ptr.cast());
        }
    }

    /// Reclaims a slot without running the destructor.
    ///
    /// # Safety
    /// Same contract as [`ChunkPool::free`] for `ptr`'s chunk.
    pub(crate) unsafe fn release_storage(&mut self, ptr: NonNull<T>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.pool.free(ptr.cast()) };
    }

    /// Checks whether `ptr` addresses a slot owned by this pool
    pub fn is_from(&self, ptr: *const T) -> bool {
        self.pool.is_from(ptr.cast())
    }

    /// Effective slot size in bytes
    pub fn chunk_size(&self) -> usize {
        self.pool.chunk_size()
    }

    /// Number of vacant slots currently available without growing
    pub fn free_slots(&self) -> usize {
        self.pool.free_chunks()
    }

    /// Number of slots across all owned blocks, vacant or occupied
    pub fn owned_slots(&self) -> usize {
        self.pool.owned_chunks()
    }

    /// Releases every fully-vacant block back to the block source
    ///
    /// Occupied blocks are untouched. Returns the number of blocks
    /// released.
    pub fn release_memory(&mut self) -> usize {
        self.pool.release_memory()
    }

    /// Unconditionally releases all memory
    ///
    /// Destructors of outstanding objects are **not** run; every pointer
    /// previously handed out dangles afterwards.
    pub fn purge_memory(&mut self) {
        self.pool.purge_memory()
    }

    /// Statistics snapshot, if tracking is enabled
    pub fn stats(&self) -> Option<PoolStats> {
        self.pool.stats()
    }
}
