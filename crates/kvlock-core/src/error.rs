//! Error types for lock operations.

use thiserror::Error;

/// Errors that can occur while operating a lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// The calling scope holds no token for this lock: either `acquire` never
    /// succeeded here, or the lock was already released.
    #[error("lock not held by the current scope")]
    NotHeld,

    /// The backing store failed mid-operation (connectivity, protocol, or
    /// scripting errors).
    #[error("store operation failed: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LockError {
    /// Wraps a store-level failure.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(err))
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
