//! Blocks: contiguous spans acquired from the block source

use core::alloc::Layout;
use core::ptr::NonNull;

/// One contiguous allocation from the block source, carved into chunks
///
/// A block is owned by exactly one pool. The pool releases it back to the
/// source at most once - either from `release_memory`/`purge_memory` or
/// from the pool's own teardown - using the stored layout.
#[derive(Debug)]
pub(crate) struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
    chunks: usize,
}

impl Block {
    pub(crate) fn new(ptr: NonNull<u8>, layout: Layout, chunks: usize) -> Self {
        debug_assert!(chunks > 0);
        debug_assert!(layout.size() > 0);
        Self { ptr, layout, chunks }
    }

    pub(crate) fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }

    pub(crate) fn chunks(&self) -> usize {
        self.chunks
    }

    /// Start address of the block
    pub(crate) fn start(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// One past the last byte of the block
    pub(crate) fn end(&self) -> usize {
        self.start() + self.layout.size()
    }

    /// Whether `addr` falls inside this block's byte range
    pub(crate) fn contains(&self, addr: usize) -> bool {
        addr >= self.start() && addr < self.end()
    }

    /// Whether `addr` is the start of one of this block's chunks
    pub(crate) fn contains_chunk(&self, addr: usize, chunk_size: usize) -> bool {
        self.contains(addr) && (addr - self.start()) % chunk_size == 0
    }
}
