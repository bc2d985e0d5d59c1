//! Provider wiring: connects a client and hands out locks.

use fred::prelude::*;
use kvlock_core::error::{LockError, LockResult};
use kvlock_core::lock::Lock;
use kvlock_core::options::LockOptions;
use tracing::debug;

use crate::store::RedisStore;

/// Builder for [`RedisLockProvider`].
pub struct RedisLockProviderBuilder {
    url: Option<String>,
    client: Option<RedisClient>,
    key_prefix: String,
    options: LockOptions,
}

impl RedisLockProviderBuilder {
    pub fn new() -> Self {
        Self {
            url: None,
            client: None,
            key_prefix: "kvlock:".to_string(),
            options: LockOptions::default(),
        }
    }

    /// Connection URL, e.g. `redis://localhost:6379`. Ignored when an
    /// existing client is supplied.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Reuses an already connected client instead of opening a new one.
    pub fn client(mut self, client: RedisClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Prefix prepended to every lock name to form its key. Defaults to
    /// `kvlock:`.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Options applied to every lock this provider creates.
    pub fn options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn build(self) -> LockResult<RedisLockProvider> {
        let client = match (self.client, self.url) {
            (Some(client), _) => client,
            (None, Some(url)) => {
                let config = RedisConfig::from_url(&url).map_err(LockError::store)?;
                let client = RedisClient::new(config, None, None, None);
                client.connect();
                client.wait_for_connect().await.map_err(LockError::store)?;
                debug!("connected to redis");
                client
            }
            (None, None) => {
                return Err(LockError::store(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "either a client or a url is required",
                )));
            }
        };

        Ok(RedisLockProvider {
            store: RedisStore::new(client),
            key_prefix: self.key_prefix,
            options: self.options,
        })
    }
}

impl Default for RedisLockProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates locks sharing one Redis client and one set of defaults.
pub struct RedisLockProvider {
    store: RedisStore,
    key_prefix: String,
    options: LockOptions,
}

impl RedisLockProvider {
    pub fn builder() -> RedisLockProviderBuilder {
        RedisLockProviderBuilder::new()
    }

    /// Connects with defaults; shorthand for the builder.
    pub async fn new(url: impl Into<String>) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }

    /// The shared store, also usable for maintenance around locks.
    pub fn store(&self) -> &RedisStore {
        &self.store
    }

    /// Store key a lock gets for `name`.
    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }

    /// A lock on `name` with the provider's options.
    pub fn create_lock(&self, name: &str) -> Lock<RedisStore> {
        self.create_lock_with(name, self.options.clone())
    }

    /// A lock on `name` with per-lock options.
    pub fn create_lock_with(&self, name: &str, options: LockOptions) -> Lock<RedisStore> {
        Lock::new(self.store.clone(), self.key_for(name), options)
    }
}
