//! Block source backed by the system allocator

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use std::alloc::System;

use tracing::warn;

use super::BlockSource;
use crate::error::{AllocError, AllocResult};

/// Block source that delegates to the system's default allocator
///
/// This is the source every pool uses unless one is injected explicitly.
/// It holds no state; acquiring and releasing map directly onto the
/// platform `malloc`/`free` equivalents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSource;

impl SystemSource {
    /// Creates a new system block source
    #[inline]
    pub const fn new() -> Self {
        SystemSource
    }
}

// SAFETY: the system allocator returns valid, aligned, exclusively owned
// memory for non-zero layouts, and keeps it valid until dealloc.
unsafe impl BlockSource for SystemSource {
    fn acquire(&mut self, layout: Layout) -> AllocResult<NonNull<u8>> {
        debug_assert!(layout.size() > 0, "pools never request empty blocks");

        // SAFETY: layout has non-zero size (pools always request at least
        // one chunk of at least pointer size).
        let ptr = unsafe { System.alloc(layout) };

        NonNull::new(ptr).ok_or_else(|| {
            warn!(bytes = layout.size(), "system allocator refused block");
            AllocError::out_of_memory(layout.size())
        })
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller guarantees ptr came from acquire with this layout
        // and is released exactly once.
        unsafe { System.dealloc(ptr.as_ptr(), layout) };
    }
}
