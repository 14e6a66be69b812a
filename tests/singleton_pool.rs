//! Integration tests for the keyed singleton pools
//!
//! Every test uses its own tag: the registry is process-wide and the test
//! harness runs tests concurrently.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use poolkit::{GrowthPolicy, PoolKey, SingletonPool};

#[test]
fn same_key_observes_shared_state() {
    const KEY: PoolKey = PoolKey::new("shared-state", 8);

    // An allocation through one call site is visible to membership
    // queries at another call site using the same key.
    let chunk = SingletonPool::malloc(KEY).expect("allocation failed");
    assert!(SingletonPool::is_from(KEY, chunk.as_ptr()));

    // Freeing through the key feeds the same free list: the next
    // allocation reuses the chunk.
    unsafe { SingletonPool::free(KEY, chunk) };
    let again = SingletonPool::malloc(KEY).expect("allocation failed");
    assert_eq!(again.as_ptr(), chunk.as_ptr());
    unsafe { SingletonPool::free(KEY, again) };
}

#[test]
fn distinct_tags_never_share_memory() {
    const LEFT: PoolKey = PoolKey::new("isolation-left", 16);
    const RIGHT: PoolKey = PoolKey::new("isolation-right", 16);

    let chunk = SingletonPool::malloc(LEFT).expect("allocation failed");

    // Equal chunk sizes, different tags: separate pools.
    assert!(SingletonPool::is_from(LEFT, chunk.as_ptr()));
    assert!(!SingletonPool::is_from(RIGHT, chunk.as_ptr()));

    unsafe { SingletonPool::free(LEFT, chunk) };
}

#[test]
fn distinct_sizes_under_one_tag_are_separate_pools() {
    const SMALL: PoolKey = PoolKey::new("sized", 8);
    const LARGE: PoolKey = PoolKey::new("sized", 64);

    let chunk = SingletonPool::malloc(SMALL).expect("allocation failed");
    assert!(SingletonPool::is_from(SMALL, chunk.as_ptr()));
    assert!(!SingletonPool::is_from(LARGE, chunk.as_ptr()));

    unsafe { SingletonPool::free(SMALL, chunk) };
}

#[test]
fn release_memory_spares_allocated_chunks() {
    const KEY: PoolKey = PoolKey::new("release", 8);

    let held = SingletonPool::malloc(KEY).expect("allocation failed");
    SingletonPool::release_memory(KEY);
    assert!(SingletonPool::is_from(KEY, held.as_ptr()));

    // Once nothing is allocated, the block is reclaimable.
    unsafe { SingletonPool::free(KEY, held) };
    assert!(SingletonPool::release_memory(KEY) >= 1);
    assert!(!SingletonPool::is_from(KEY, held.as_ptr()));
}

#[test]
fn purge_memory_invalidates_the_key() {
    const KEY: PoolKey = PoolKey::new("purge", 8);

    let chunk = SingletonPool::malloc(KEY).expect("allocation failed");
    SingletonPool::purge_memory(KEY);
    assert!(!SingletonPool::is_from(KEY, chunk.as_ptr()));

    // The key stays usable for fresh allocations after the purge.
    let fresh = SingletonPool::malloc(KEY).expect("allocation failed");
    assert!(SingletonPool::is_from(KEY, fresh.as_ptr()));
    unsafe { SingletonPool::free(KEY, fresh) };
}

#[test]
fn ordered_malloc_through_a_key() {
    const KEY: PoolKey = PoolKey::new("ordered", 4);
    let stride = SingletonPool::chunk_size(KEY);

    let run = SingletonPool::ordered_malloc(KEY, 10).expect("run allocation failed");
    let start = run.as_ptr() as usize;
    for i in 0..10 {
        assert!(SingletonPool::is_from(KEY, (start + i * stride) as *const u8));
    }

    unsafe { SingletonPool::free_run(KEY, run, 10) };
}

#[test]
fn initialize_creates_at_most_once() {
    const KEY: PoolKey = PoolKey::new("init-once", 32);

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    // Concurrent first uses race on the registry; exactly one wins.
    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                if SingletonPool::initialize(KEY, GrowthPolicy::doubling(8)) {
                    CREATED.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });
    assert_eq!(CREATED.load(Ordering::Relaxed), 1);

    // Later initializations are no-ops.
    assert!(!SingletonPool::initialize(KEY, GrowthPolicy::fixed(2)));
}
