//! The store boundary locks operate through.

use std::future::Future;
use std::time::Duration;

use crate::error::LockResult;

/// A write queued into an optimistic transaction via [`LockStore::exec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxCommand {
    /// Delete the key.
    Delete { key: String },
    /// Replace the key's remaining time-to-live.
    Expire { key: String, ttl: Duration },
}

/// Client-side view of the shared key-value store backing locks.
///
/// The store holds plain string values with optional millisecond-granularity
/// expiry and evicts expired keys on its own. Two groups of operations make
/// conditional mutation atomic:
///
/// * `watch`/`unwatch`/`exec` implement optimistic transactions: after
///   `watch(key)`, an `exec` submits its queued commands only if the watched
///   key has not been written by anyone else in between, and reports an abort
///   by returning `None`. Watch state lives on the store connection, so a
///   store value driving transactional locks must not interleave watches from
///   unrelated callers on the same connection.
/// * `load_script`/`eval_script` run registered server-side scripts, each
///   evaluation atomic on the store. Script handles are safe to share across
///   connections.
///
/// Implementations return [`LockError::Store`](crate::error::LockError::Store)
/// for connectivity and protocol failures.
pub trait LockStore: Send + Sync {
    /// Sets `key = value` only if `key` is currently absent, atomically.
    /// Returns whether the write happened. The written key has no expiry.
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = LockResult<bool>> + Send;

    /// Replaces the remaining time-to-live of `key`. Missing keys are left
    /// untouched.
    fn set_expiry(&self, key: &str, ttl: Duration) -> impl Future<Output = LockResult<()>> + Send;

    /// Remaining time-to-live of `key`, or `None` when the key is missing or
    /// carries no expiry.
    fn remaining_expiry(
        &self,
        key: &str,
    ) -> impl Future<Output = LockResult<Option<Duration>>> + Send;

    /// Current value of `key`.
    fn get(&self, key: &str) -> impl Future<Output = LockResult<Option<String>>> + Send;

    /// Unconditionally removes `key`.
    fn delete(&self, key: &str) -> impl Future<Output = LockResult<()>> + Send;

    /// Starts watching `key` for the next `exec` on this store value.
    fn watch(&self, key: &str) -> impl Future<Output = LockResult<()>> + Send;

    /// Abandons the current watch without submitting a transaction.
    fn unwatch(&self) -> impl Future<Output = LockResult<()>> + Send;

    /// Submits `commands` as one transaction under the current watch.
    ///
    /// Returns the per-command integer replies, or `None` when the store
    /// aborted the transaction because a watched key changed. Either way the
    /// watch is consumed.
    fn exec(
        &self,
        commands: Vec<TxCommand>,
    ) -> impl Future<Output = LockResult<Option<Vec<i64>>>> + Send;

    /// Registers a server-side script and returns its handle.
    fn load_script(&self, source: &str) -> impl Future<Output = LockResult<String>> + Send;

    /// Runs a previously registered script. The lock protocol only uses
    /// scripts that reply with an integer.
    fn eval_script(
        &self,
        sha: &str,
        keys: &[&str],
        args: &[&str],
    ) -> impl Future<Output = LockResult<i64>> + Send;
}
