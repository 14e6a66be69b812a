//! Chunk and object pools
//!
//! ## Modules
//! - `chunk_pool` - raw fixed-size chunk pool with an intrusive free list
//! - `object_pool` - typed construction/destruction layer over a chunk pool
//! - `pool_box` - RAII smart pointer for pool-constructed objects
//! - `config` - growth policy and debug configuration
//! - `stats` - statistics tracking types

mod block;
pub mod chunk_pool;
pub mod config;
pub mod object_pool;
pub mod pool_box;
pub mod stats;

pub use chunk_pool::ChunkPool;
pub use config::{Growth, GrowthPolicy, PoolConfig};
pub use object_pool::ObjectPool;
pub use pool_box::PoolBox;
pub use stats::PoolStats;
