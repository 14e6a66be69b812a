//! Error types for pool operations

use thiserror::Error;

/// Result type for pool operations
pub type AllocResult<T> = Result<T, AllocError>;

/// Errors surfaced by pool construction and allocation
///
/// Contract violations (double free, freeing a foreign pointer, using a
/// pointer after `purge_memory`) are not represented here: they are
/// undefined behavior on the release path. Debug builds can catch them
/// via [`PoolConfig::membership_checks`](crate::pool::PoolConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The block source could not supply the requested memory
    #[error("out of memory: failed to acquire {requested} bytes from the block source")]
    OutOfMemory {
        /// Bytes requested from the block source
        requested: usize,
    },

    /// Size arithmetic overflowed while computing a block layout
    #[error("size overflow while computing {context}")]
    SizeOverflow {
        /// What was being computed when the overflow occurred
        context: &'static str,
    },

    /// Pool construction parameters were invalid
    #[error("invalid pool configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected
        reason: &'static str,
    },
}

impl AllocError {
    /// Creates an out-of-memory error for a request of `requested` bytes
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory { requested }
    }

    /// Creates a size overflow error
    pub fn size_overflow(context: &'static str) -> Self {
        Self::SizeOverflow { context }
    }

    /// Creates an invalid configuration error
    pub fn invalid_config(reason: &'static str) -> Self {
        Self::InvalidConfig { reason }
    }

    /// Checks if this is an out-of-memory error
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}

/// Error returned by [`ObjectPool::construct_with`](crate::pool::ObjectPool::construct_with)
///
/// Either the storage allocation failed, or the caller's initializer
/// returned an error. In the latter case the reserved chunk has already
/// been returned to the free list when this value is produced.
#[derive(Debug, Error)]
pub enum ConstructError<E> {
    /// No storage could be allocated for the object
    #[error("failed to allocate object storage: {0}")]
    Alloc(#[from] AllocError),

    /// The initializer failed; the reserved chunk was reclaimed
    #[error("object initializer failed")]
    Init(E),
}

impl<E> ConstructError<E> {
    /// Returns the initializer error, if that is what failed
    pub fn into_init(self) -> Option<E> {
        match self {
            Self::Init(err) => Some(err),
            Self::Alloc(_) => None,
        }
    }

    /// Checks if the failure was an allocation failure
    pub fn is_alloc(&self) -> bool {
        matches!(self, Self::Alloc(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AllocError::out_of_memory(4096);
        assert_eq!(
            err.to_string(),
            "out of memory: failed to acquire 4096 bytes from the block source"
        );
        assert!(err.is_out_of_memory());
        assert!(!AllocError::size_overflow("block size").is_out_of_memory());
    }

    #[test]
    fn construct_error_unwraps_init() {
        let err: ConstructError<&str> = ConstructError::Init("bad input");
        assert_eq!(err.into_init(), Some("bad input"));

        let err: ConstructError<&str> = AllocError::out_of_memory(8).into();
        assert!(err.is_alloc());
        assert_eq!(err.into_init(), None);
    }
}
