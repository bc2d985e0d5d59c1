//! `LockStore` over a Redis connection.

use std::time::Duration;

use fred::prelude::*;
use fred::types::CustomCommand;
use kvlock_core::error::{LockError, LockResult};
use kvlock_core::store::{LockStore, TxCommand};

/// Redis-backed store for locks, wrapping a `fred` client.
///
/// Lock keys are plain strings with millisecond TTLs, so they coexist with
/// other data on the same server. Script-based locks can share the client
/// with any other traffic. Transaction-based locks rely on `WATCH` state,
/// which Redis tracks per connection: give them a client whose connection is
/// not running unrelated `WATCH`/`MULTI` sequences at the same time.
#[derive(Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Wraps an already connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// The underlying client, for reuse beyond locking.
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    async fn command<R: FromRedis>(
        &self,
        name: &'static str,
        args: Vec<RedisValue>,
    ) -> LockResult<R> {
        let cmd = CustomCommand::new_static(name, None, false);
        self.client.custom(cmd, args).await.map_err(LockError::store)
    }
}

impl LockStore for RedisStore {
    async fn set_if_absent(&self, key: &str, value: &str) -> LockResult<bool> {
        let reply: Option<String> = self
            .client
            .set(key, value, None, Some(SetOptions::NX), false)
            .await
            .map_err(LockError::store)?;
        Ok(reply.is_some())
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> LockResult<()> {
        let _: i64 = self
            .command("PEXPIRE", vec![key.to_owned().into(), (ttl.as_millis() as i64).into()])
            .await?;
        Ok(())
    }

    async fn remaining_expiry(&self, key: &str) -> LockResult<Option<Duration>> {
        let pttl: i64 = self.client.pttl(key).await.map_err(LockError::store)?;
        // -1 is a key without expiry, -2 a missing key.
        if pttl < 0 {
            return Ok(None);
        }
        Ok(Some(Duration::from_millis(pttl as u64)))
    }

    async fn get(&self, key: &str) -> LockResult<Option<String>> {
        self.client.get(key).await.map_err(LockError::store)
    }

    async fn delete(&self, key: &str) -> LockResult<()> {
        let _: i64 = self.client.del(key).await.map_err(LockError::store)?;
        Ok(())
    }

    async fn watch(&self, key: &str) -> LockResult<()> {
        let _: RedisValue = self.command("WATCH", vec![key.to_owned().into()]).await?;
        Ok(())
    }

    async fn unwatch(&self) -> LockResult<()> {
        let _: RedisValue = self.command("UNWATCH", Vec::new()).await?;
        Ok(())
    }

    async fn exec(&self, commands: Vec<TxCommand>) -> LockResult<Option<Vec<i64>>> {
        let _: RedisValue = self.command("MULTI", Vec::new()).await?;
        for command in &commands {
            let queued = match command {
                TxCommand::Delete { key } => {
                    self.command::<RedisValue>("DEL", vec![key.clone().into()]).await
                }
                TxCommand::Expire { key, ttl } => {
                    self.command::<RedisValue>(
                        "PEXPIRE",
                        vec![key.clone().into(), (ttl.as_millis() as i64).into()],
                    )
                    .await
                }
            };
            if let Err(err) = queued {
                let _ = self.command::<RedisValue>("DISCARD", Vec::new()).await;
                return Err(err);
            }
        }
        // EXEC replies with an array of per-command results, or nil when the
        // watched key changed and Redis dropped the transaction.
        self.command("EXEC", Vec::new()).await
    }

    async fn load_script(&self, source: &str) -> LockResult<String> {
        self.client.script_load(source).await.map_err(LockError::store)
    }

    async fn eval_script(&self, sha: &str, keys: &[&str], args: &[&str]) -> LockResult<i64> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        self.client.evalsha(sha, keys, args).await.map_err(LockError::store)
    }
}
