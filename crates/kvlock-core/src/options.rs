//! Lock configuration.

use std::time::Duration;

use crate::strategy::Atomicity;
use crate::token::TokenScope;

/// Default store-managed lifetime of a lock key.
pub const DEFAULT_TTL: Duration = Duration::from_millis(1000);
/// Default total time a blocking `acquire` spends waiting.
pub const DEFAULT_BLOCKING_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default pause between acquisition attempts while blocking.
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for a [`Lock`](crate::lock::Lock).
///
/// All fields are public; the chainable setters exist for call sites that
/// prefer building options inline.
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Store-managed lifetime applied to the key on every successful
    /// acquisition. The store reclaims the lock when the holder disappears
    /// without releasing.
    pub ttl: Duration,
    /// Whether `acquire` waits for a held lock or reports `false` right away.
    pub blocking: bool,
    /// Upper bound on the total time a blocking `acquire` spends waiting.
    pub blocking_timeout: Duration,
    /// Pause between acquisition attempts while blocking. Keep it positive;
    /// a zero interval never consumes the waiting budget.
    pub sleep_interval: Duration,
    /// Where the ownership token lives on the client side.
    pub token_scope: TokenScope,
    /// How conditional mutations are made atomic on the store.
    pub atomicity: Atomicity,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            blocking: true,
            blocking_timeout: DEFAULT_BLOCKING_TIMEOUT,
            sleep_interval: DEFAULT_SLEEP_INTERVAL,
            token_scope: TokenScope::default(),
            atomicity: Atomicity::default(),
        }
    }
}

impl LockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads options from the environment, falling back to the defaults for
    /// anything unset or unparsable.
    ///
    /// Recognized variables: `KVLOCK_TTL_MS`, `KVLOCK_BLOCKING`
    /// (`true`/`false`), `KVLOCK_BLOCKING_TIMEOUT_MS`, `KVLOCK_SLEEP_MS`, and
    /// `KVLOCK_TOKEN_SCOPE` (`instance` or `caller`).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(ms) = lookup("KVLOCK_TTL_MS").and_then(|v| v.parse().ok()) {
            options.ttl = Duration::from_millis(ms);
        }
        if let Some(blocking) = lookup("KVLOCK_BLOCKING").and_then(|v| v.parse().ok()) {
            options.blocking = blocking;
        }
        if let Some(ms) = lookup("KVLOCK_BLOCKING_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            options.blocking_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = lookup("KVLOCK_SLEEP_MS").and_then(|v| v.parse().ok()) {
            options.sleep_interval = Duration::from_millis(ms);
        }
        match lookup("KVLOCK_TOKEN_SCOPE").as_deref() {
            Some("instance") => options.token_scope = TokenScope::PerInstance,
            Some("caller") => options.token_scope = TokenScope::PerCallerContext,
            _ => {}
        }
        options
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn blocking_timeout(mut self, timeout: Duration) -> Self {
        self.blocking_timeout = timeout;
        self
    }

    pub fn sleep_interval(mut self, interval: Duration) -> Self {
        self.sleep_interval = interval;
        self
    }

    pub fn token_scope(mut self, scope: TokenScope) -> Self {
        self.token_scope = scope;
        self
    }

    pub fn atomicity(mut self, atomicity: Atomicity) -> Self {
        self.atomicity = atomicity;
        self
    }
}
