//! Redis backend for `kvlock`.
//!
//! [`RedisStore`] implements the store boundary from `kvlock-core` over a
//! [`fred`] client; [`RedisLockProvider`] bundles a client with lock defaults
//! and a key prefix.
//!
//! ```rust,ignore
//! let provider = RedisLockProvider::new("redis://localhost:6379").await?;
//! let lock = provider.create_lock("jobs:nightly-report");
//! if lock.acquire().await? {
//!     // exclusive section
//!     lock.release().await?;
//! }
//! ```

pub mod provider;
pub mod store;

pub use provider::{RedisLockProvider, RedisLockProviderBuilder};
pub use store::RedisStore;
