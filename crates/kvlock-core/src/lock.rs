//! The lock handle: acquisition loop and token lifecycle.

use std::time::Duration;

use tracing::{Span, debug, instrument};

use crate::error::{LockError, LockResult};
use crate::options::LockOptions;
use crate::store::LockStore;
use crate::strategy::Strategy;
use crate::token::TokenCell;

/// A named mutual-exclusion lock over one key in a shared store.
///
/// Whoever writes the key first holds the lock; everyone else backs off until
/// the key is deleted by its owner or reclaimed by the store when the TTL
/// lapses. Ownership is proven by a random token: release and extend only act
/// while the key still carries the token this scope wrote, so a stale holder
/// can never destroy a successor's acquisition.
///
/// A lock value is cheap to share behind an [`Arc`](std::sync::Arc). With the
/// default [`TokenScope::PerCallerContext`](crate::token::TokenScope), each
/// task (or thread outside a runtime) holding the same value acquires and
/// releases independently.
///
/// Dropping a lock value never touches the store. An acquisition that is not
/// released ends when its TTL lapses.
pub struct Lock<S> {
    store: S,
    key: String,
    options: LockOptions,
    token: TokenCell,
    strategy: Strategy,
}

impl<S: LockStore> Lock<S> {
    /// Creates a lock over `key` with the given options.
    pub fn new(store: S, key: impl Into<String>, options: LockOptions) -> Self {
        let token = TokenCell::new(options.token_scope);
        let strategy = Strategy::new(options.atomicity);
        Self { store, key: key.into(), options, token, strategy }
    }

    /// The store key this lock guards.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Whether the calling scope currently holds this lock.
    ///
    /// This is the local view only; it does not consult the store, so it
    /// stays `true` after the TTL lapses until the scope releases.
    pub fn is_held(&self) -> bool {
        self.token.is_held()
    }

    /// The ownership token held by the calling scope, if any.
    pub fn token(&self) -> Option<String> {
        self.token.get()
    }

    /// Attempts to take the lock, returning whether it was acquired.
    ///
    /// One candidate token is minted for the whole call and reused across
    /// retries. While `blocking` is set, a held key is retried every
    /// `sleep_interval` until the remaining `blocking_timeout` budget cannot
    /// cover another pause; otherwise a held key reports `false` immediately.
    /// `Err` is reserved for store failures.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future mid-flight leaves the scope's token
    /// untouched: the token is recorded only after the store accepted the
    /// claim, in the same poll.
    #[instrument(skip(self), fields(lock.key = %self.key, acquired = tracing::field::Empty))]
    pub async fn acquire(&self) -> LockResult<bool> {
        // A scope that still holds a token keeps its identity, so a lapsed
        // acquisition can be retaken with the same token.
        let candidate = self.token.get().unwrap_or_else(TokenCell::generate);
        let mut budget = self.options.blocking_timeout;
        let ttl = self.options.ttl;

        loop {
            if self.strategy.try_acquire(&self.store, &self.key, &candidate, ttl).await? {
                self.token.set(candidate);
                Span::current().record("acquired", true);
                return Ok(true);
            }

            if !self.options.blocking || budget < self.options.sleep_interval {
                Span::current().record("acquired", false);
                return Ok(false);
            }

            budget -= self.options.sleep_interval;
            debug!(remaining = ?budget, "lock is held elsewhere, waiting");
            tokio::time::sleep(self.options.sleep_interval).await;
        }
    }

    /// Releases the calling scope's acquisition.
    ///
    /// The local token is cleared first, then the key is deleted only if it
    /// still carries that token. Losing the race to a new holder is not an
    /// error and not reported; `Err` means the scope held no token
    /// ([`LockError::NotHeld`]) or the store failed.
    #[instrument(skip(self), fields(lock.key = %self.key))]
    pub async fn release(&self) -> LockResult<()> {
        let token = self.token.take().ok_or(LockError::NotHeld)?;
        self.strategy.release(&self.store, &self.key, &token).await
    }

    /// Lengthens the current acquisition's remaining TTL by `additional`.
    ///
    /// Returns `false` without touching the key when this scope is no longer
    /// the holder or the key carries no expiry. The local token is kept
    /// either way.
    #[instrument(skip(self), fields(lock.key = %self.key, extended = tracing::field::Empty))]
    pub async fn extend(&self, additional: Duration) -> LockResult<bool> {
        let token = self.token.get().ok_or(LockError::NotHeld)?;
        let extended = self.strategy.extend(&self.store, &self.key, &token, additional).await?;
        Span::current().record("extended", extended);
        Ok(extended)
    }
}
