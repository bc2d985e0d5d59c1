//! Convenience re-exports of the types most call sites need.

pub use crate::error::{LockError, LockResult};
pub use crate::lock::Lock;
pub use crate::options::LockOptions;
pub use crate::store::{LockStore, TxCommand};
pub use crate::strategy::Atomicity;
pub use crate::token::TokenScope;
