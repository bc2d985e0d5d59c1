//! Core lock protocol for `kvlock`.
//!
//! This crate defines the store-agnostic pieces of a distributed lock held as
//! a single key in a shared TTL-capable key-value store: the
//! [`LockStore`](store::LockStore) boundary, ownership tokens and their
//! client-side scoping, the two atomicity strategies for conditional
//! mutations, and the [`Lock`](lock::Lock) handle tying them together.
//!
//! Store backends live in their own crates; see `kvlock-redis` for the Redis
//! implementation, or implement [`LockStore`](store::LockStore) against
//! another store.
//!
//! ```rust,ignore
//! use kvlock_core::prelude::*;
//!
//! let lock = Lock::new(store, "jobs:nightly-report", LockOptions::default());
//! if lock.acquire().await? {
//!     // exclusive section
//!     lock.release().await?;
//! }
//! ```

pub mod error;
pub mod lock;
pub mod options;
pub mod prelude;
pub mod store;
pub mod strategy;
pub mod token;

pub use error::{LockError, LockResult};
pub use lock::Lock;
pub use options::LockOptions;
pub use store::{LockStore, TxCommand};
pub use strategy::Atomicity;
pub use token::TokenScope;
