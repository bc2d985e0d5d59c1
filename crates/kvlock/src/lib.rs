//! Distributed locks over a shared TTL key-value store.
//!
//! A lock is one key: whoever writes it first holds the lock, a TTL reclaims
//! it if the holder disappears, and a per-acquisition token keeps a stale
//! holder from releasing or extending a successor's acquisition. This crate
//! re-exports the core protocol from `kvlock-core` together with the Redis
//! backend from `kvlock-redis`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use kvlock::{LockOptions, RedisLockProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = RedisLockProvider::builder()
//!         .url("redis://localhost:6379")
//!         .options(LockOptions::default().ttl(Duration::from_secs(30)))
//!         .build()
//!         .await?;
//!
//!     let lock = provider.create_lock("jobs:nightly-report");
//!     if lock.acquire().await? {
//!         // exclusive section
//!         lock.release().await?;
//!     }
//!     Ok(())
//! }
//! ```

pub use kvlock_core::*;
#[allow(ambiguous_glob_reexports)]
pub use kvlock_redis::*;
