//! Fixed-size chunk pool allocators
//!
//! This crate provides a small family of pool allocators built around one
//! idea: carve system-acquired blocks into fixed-size chunks and recycle
//! them through an intrusive free list.
//!
//! - [`ChunkPool`] - the raw pool: O(1) `malloc`/`free`, membership
//!   queries, contiguous-run allocation, and selective or full memory
//!   release
//! - [`ObjectPool`] - a typed layer adding in-place construction and
//!   destruction for a single element type
//! - [`SingletonPool`] - process-wide pools addressed by a
//!   (tag, chunk-size) [`PoolKey`], created lazily on first use
//!
//! # Example
//!
//! ```
//! use poolkit::ChunkPool;
//!
//! let mut pool = ChunkPool::new(64)?;
//!
//! let chunk = pool.malloc().expect("allocation failed");
//! assert!(pool.is_from(chunk.as_ptr()));
//!
//! // Chunks go back to the free list in O(1).
//! unsafe { pool.free(chunk) };
//!
//! // Contiguous runs, e.g. for array-like storage:
//! let run = pool.ordered_malloc(10).expect("allocation failed");
//! unsafe { pool.free_run(run, 10) };
//! # Ok::<(), poolkit::AllocError>(())
//! ```
//!
//! # Concurrency
//!
//! [`ChunkPool`] and [`ObjectPool`] perform no internal locking: all
//! mutating operations take `&mut self`, and sharing an instance across
//! threads is the caller's responsibility. [`SingletonPool`] guarantees
//! idempotent one-time creation per key and serializes operations on the
//! shared pool behind a mutex.
//!
//! # Contracts
//!
//! `free` is `unsafe`: the pool performs no checking on the release hot
//! path, so a double free or a foreign pointer is undefined behavior.
//! Debug builds default to membership and double-free assertions via
//! [`PoolConfig::membership_checks`](pool::PoolConfig).

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod pool;
pub mod singleton;
pub mod source;
pub mod utils;

pub use error::{AllocError, AllocResult, ConstructError};
pub use pool::{ChunkPool, Growth, GrowthPolicy, ObjectPool, PoolBox, PoolConfig, PoolStats};
pub use singleton::{PoolKey, SingletonPool};
pub use source::{BlockSource, SystemSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
