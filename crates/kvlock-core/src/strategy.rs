//! Atomicity strategies for conditional lock mutations.
//!
//! Acquire, release, and extend all hinge on compare-against-token steps that
//! must be atomic on the store. The two strategies here realize them either as
//! optimistic transactions (watch the key, read, submit the write, let the
//! store abort on interference) or as server-side scripts (one atomic
//! evaluation per operation).

use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::LockResult;
use crate::store::{LockStore, TxCommand};

/// How conditional lock mutations reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Atomicity {
    /// Optimistic transactions over `watch`/`exec`. Requires a store value
    /// whose watch state is not shared with unrelated callers.
    Transactions,
    /// Server-side scripts, registered lazily on first use. Safe on shared
    /// store clients.
    #[default]
    Scripts,
}

pub(crate) enum Strategy {
    Transactions(TransactionStrategy),
    Scripts(ScriptStrategy),
}

impl Strategy {
    pub(crate) fn new(atomicity: Atomicity) -> Self {
        match atomicity {
            Atomicity::Transactions => Self::Transactions(TransactionStrategy),
            Atomicity::Scripts => Self::Scripts(ScriptStrategy::new()),
        }
    }

    /// One attempt to claim `key` with `token` and a fresh `ttl`. Never
    /// blocks; a held key reports `false`.
    pub(crate) async fn try_acquire<S: LockStore>(
        &self,
        store: &S,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> LockResult<bool> {
        match self {
            Self::Transactions(inner) => inner.try_acquire(store, key, token, ttl).await,
            Self::Scripts(inner) => inner.try_acquire(store, key, token, ttl).await,
        }
    }

    /// Deletes `key` only while it still carries `token`. A lost race is not
    /// reported; the key is simply left to its new owner.
    pub(crate) async fn release<S: LockStore>(
        &self,
        store: &S,
        key: &str,
        token: &str,
    ) -> LockResult<()> {
        match self {
            Self::Transactions(inner) => inner.release(store, key, token).await,
            Self::Scripts(inner) => inner.release(store, key, token).await,
        }
    }

    /// Adds `additional` to the remaining TTL of `key` while it still carries
    /// `token`. Returns whether the extension was applied.
    pub(crate) async fn extend<S: LockStore>(
        &self,
        store: &S,
        key: &str,
        token: &str,
        additional: Duration,
    ) -> LockResult<bool> {
        match self {
            Self::Transactions(inner) => inner.extend(store, key, token, additional).await,
            Self::Scripts(inner) => inner.extend(store, key, token, additional).await,
        }
    }
}

/// Opens a watch on `key` and reads its value; tears the watch down again if
/// the read fails.
async fn watched_read<S: LockStore>(store: &S, key: &str) -> LockResult<Option<String>> {
    store.watch(key).await?;
    match store.get(key).await {
        Ok(value) => Ok(value),
        Err(err) => {
            let _ = store.unwatch().await;
            Err(err)
        }
    }
}

/// Conditional mutations as optimistic transactions.
pub(crate) struct TransactionStrategy;

impl TransactionStrategy {
    async fn try_acquire<S: LockStore>(
        &self,
        store: &S,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> LockResult<bool> {
        if store.set_if_absent(key, token).await? {
            store.set_expiry(key, ttl).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn release<S: LockStore>(&self, store: &S, key: &str, token: &str) -> LockResult<()> {
        let current = watched_read(store, key).await?;
        if current.as_deref() != Some(token) {
            return store.unwatch().await;
        }

        let replies = store.exec(vec![TxCommand::Delete { key: key.to_owned() }]).await?;
        if replies.is_none() {
            // An abort means the key changed hands between the read and the
            // delete. The new owner keeps it; nothing to report.
            debug!(key, "release transaction aborted");
        }
        Ok(())
    }

    async fn extend<S: LockStore>(
        &self,
        store: &S,
        key: &str,
        token: &str,
        additional: Duration,
    ) -> LockResult<bool> {
        let current = watched_read(store, key).await?;
        if current.as_deref() != Some(token) {
            store.unwatch().await?;
            return Ok(false);
        }

        let remaining = match store.remaining_expiry(key).await {
            Ok(remaining) => remaining,
            Err(err) => {
                let _ = store.unwatch().await;
                return Err(err);
            }
        };
        // A key without expiry information is not a live lease.
        let Some(remaining) = remaining else {
            store.unwatch().await?;
            return Ok(false);
        };

        let replies = store
            .exec(vec![TxCommand::Expire { key: key.to_owned(), ttl: remaining + additional }])
            .await?;
        Ok(matches!(replies.as_deref(), Some([1, ..])))
    }
}

struct LoadedScripts {
    acquire: String,
    release: String,
    extend: String,
}

/// Conditional mutations as server-side scripts.
///
/// Scripts are registered on first use. A failed registration leaves the
/// handle cell empty, so the next operation retries it.
pub(crate) struct ScriptStrategy {
    scripts: OnceCell<LoadedScripts>,
}

impl ScriptStrategy {
    const ACQUIRE_SCRIPT: &'static str = r#"
if redis.call('setnx', KEYS[1], ARGV[1]) == 1 then
    redis.call('pexpire', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

    const RELEASE_SCRIPT: &'static str = r#"
local token = redis.call('get', KEYS[1])
if not token or token ~= ARGV[1] then
    return 0
end
redis.call('del', KEYS[1])
return 1
"#;

    const EXTEND_SCRIPT: &'static str = r#"
local token = redis.call('get', KEYS[1])
if not token or token ~= ARGV[1] then
    return 0
end
local remaining = redis.call('pttl', KEYS[1])
if remaining < 0 then
    return 0
end
redis.call('pexpire', KEYS[1], remaining + ARGV[2])
return 1
"#;

    fn new() -> Self {
        Self { scripts: OnceCell::new() }
    }

    async fn loaded<S: LockStore>(&self, store: &S) -> LockResult<&LoadedScripts> {
        self.scripts
            .get_or_try_init(|| async {
                let acquire = store.load_script(Self::ACQUIRE_SCRIPT).await?;
                let release = store.load_script(Self::RELEASE_SCRIPT).await?;
                let extend = store.load_script(Self::EXTEND_SCRIPT).await?;
                debug!(%acquire, %release, %extend, "registered lock scripts");
                Ok(LoadedScripts { acquire, release, extend })
            })
            .await
    }

    async fn try_acquire<S: LockStore>(
        &self,
        store: &S,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> LockResult<bool> {
        let scripts = self.loaded(store).await?;
        let ttl_ms = ttl.as_millis().to_string();
        let applied = store.eval_script(&scripts.acquire, &[key], &[token, &ttl_ms]).await?;
        Ok(applied == 1)
    }

    async fn release<S: LockStore>(&self, store: &S, key: &str, token: &str) -> LockResult<()> {
        let scripts = self.loaded(store).await?;
        let applied = store.eval_script(&scripts.release, &[key], &[token]).await?;
        if applied != 1 {
            debug!(key, "release script found another holder");
        }
        Ok(())
    }

    async fn extend<S: LockStore>(
        &self,
        store: &S,
        key: &str,
        token: &str,
        additional: Duration,
    ) -> LockResult<bool> {
        let scripts = self.loaded(store).await?;
        let additional_ms = additional.as_millis().to_string();
        let applied = store.eval_script(&scripts.extend, &[key], &[token, &additional_ms]).await?;
        Ok(applied == 1)
    }
}
