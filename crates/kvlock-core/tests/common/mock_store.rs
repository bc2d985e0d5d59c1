//! In-memory store double with real conditional-set, TTL, optimistic-watch,
//! and script semantics, so the lock protocol can be exercised without a
//! server.
//!
//! Time is read from `tokio::time::Instant`, which makes TTL behavior exact
//! under `#[tokio::test(start_paused = true)]`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kvlock_core::error::{LockError, LockResult};
use kvlock_core::store::{LockStore, TxCommand};
use tokio::time::Instant;

/// Store operations the double counts and can fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    SetIfAbsent,
    SetExpiry,
    RemainingExpiry,
    Get,
    Delete,
    Watch,
    Unwatch,
    Exec,
    LoadScript,
    EvalScript,
}

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
    version: u64,
}

/// Snapshot taken by `watch`, compared again at `exec`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Watched {
    Version(u64),
    Absent,
}

/// Watch state is tracked per calling context, mirroring a dedicated store
/// connection per caller.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum CallerKey {
    Task(tokio::task::Id),
    Thread(std::thread::ThreadId),
}

impl CallerKey {
    fn current() -> Self {
        match tokio::task::try_id() {
            Some(id) => Self::Task(id),
            None => Self::Thread(std::thread::current().id()),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScriptKind {
    Acquire,
    Release,
    Extend,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    next_version: u64,
    watches: HashMap<CallerKey, (String, Watched)>,
    scripts: HashMap<String, ScriptKind>,
    script_seq: u64,
    calls: HashMap<StoreOp, u64>,
    fail_next: HashSet<StoreOp>,
    write_before_exec: Option<(String, String)>,
}

impl State {
    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn purge(&mut self, key: &str, now: Instant) {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.expires_at.is_some_and(|at| at <= now));
        if expired {
            self.entries.remove(key);
        }
    }

    /// A write from outside the lock protocol. Bumps the version so pending
    /// watches on the key observe the interference.
    fn write(&mut self, key: &str, value: &str, ttl: Option<Duration>, now: Instant) {
        let version = self.bump_version();
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| now + ttl),
            version,
        };
        self.entries.insert(key.to_string(), entry);
    }

    fn snapshot(&self, key: &str) -> Watched {
        match self.entries.get(key) {
            Some(entry) => Watched::Version(entry.version),
            None => Watched::Absent,
        }
    }

    /// Counts the call and honors a pending one-shot failure injection.
    fn enter(&mut self, op: StoreOp) -> LockResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        if self.fail_next.remove(&op) {
            return Err(LockError::store(std::io::Error::other(format!(
                "injected {op:?} failure"
            ))));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes a key as some other client would, outside the lock protocol.
    pub fn seed(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let now = Instant::now();
        self.state().write(key, value, ttl, now);
    }

    /// Strips the expiry from a key, keeping its value.
    pub fn persist(&self, key: &str) {
        let mut state = self.state();
        let version = state.bump_version();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.expires_at = None;
            entry.version = version;
        }
    }

    pub fn value_of(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut state = self.state();
        state.purge(key, now);
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut state = self.state();
        state.purge(key, now);
        state
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.duration_since(now))
    }

    pub fn calls(&self, op: StoreOp) -> u64 {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u64 {
        self.state().calls.values().sum()
    }

    /// Arms a one-shot error on the next `op` call.
    pub fn fail_on_next(&self, op: StoreOp) {
        self.state().fail_next.insert(op);
    }

    /// Queues an external write that lands right before the next `exec`,
    /// after its watch snapshot was taken.
    pub fn write_before_next_exec(&self, key: &str, value: &str) {
        self.state().write_before_exec = Some((key.to_string(), value.to_string()));
    }
}

impl LockStore for MockStore {
    async fn set_if_absent(&self, key: &str, value: &str) -> LockResult<bool> {
        let now = Instant::now();
        let mut state = self.state();
        state.enter(StoreOp::SetIfAbsent)?;
        state.purge(key, now);
        if state.entries.contains_key(key) {
            return Ok(false);
        }
        state.write(key, value, None, now);
        Ok(true)
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> LockResult<()> {
        let now = Instant::now();
        let mut state = self.state();
        state.enter(StoreOp::SetExpiry)?;
        state.purge(key, now);
        let version = state.bump_version();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.expires_at = Some(now + ttl);
            entry.version = version;
        }
        Ok(())
    }

    async fn remaining_expiry(&self, key: &str) -> LockResult<Option<Duration>> {
        let now = Instant::now();
        let mut state = self.state();
        state.enter(StoreOp::RemainingExpiry)?;
        state.purge(key, now);
        Ok(state
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.duration_since(now)))
    }

    async fn get(&self, key: &str) -> LockResult<Option<String>> {
        let now = Instant::now();
        let mut state = self.state();
        state.enter(StoreOp::Get)?;
        state.purge(key, now);
        Ok(state.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> LockResult<()> {
        let now = Instant::now();
        let mut state = self.state();
        state.enter(StoreOp::Delete)?;
        state.purge(key, now);
        state.entries.remove(key);
        Ok(())
    }

    async fn watch(&self, key: &str) -> LockResult<()> {
        let now = Instant::now();
        let mut state = self.state();
        state.enter(StoreOp::Watch)?;
        state.purge(key, now);
        let snapshot = state.snapshot(key);
        state.watches.insert(CallerKey::current(), (key.to_string(), snapshot));
        Ok(())
    }

    async fn unwatch(&self) -> LockResult<()> {
        let mut state = self.state();
        state.enter(StoreOp::Unwatch)?;
        state.watches.remove(&CallerKey::current());
        Ok(())
    }

    async fn exec(&self, commands: Vec<TxCommand>) -> LockResult<Option<Vec<i64>>> {
        let now = Instant::now();
        let mut state = self.state();
        state.enter(StoreOp::Exec)?;

        if let Some((key, value)) = state.write_before_exec.take() {
            state.write(&key, &value, None, now);
        }

        if let Some((key, snapshot)) = state.watches.remove(&CallerKey::current()) {
            state.purge(&key, now);
            if state.snapshot(&key) != snapshot {
                return Ok(None);
            }
        }

        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            match command {
                TxCommand::Delete { key } => {
                    state.purge(&key, now);
                    let removed = state.entries.remove(&key).is_some();
                    replies.push(i64::from(removed));
                }
                TxCommand::Expire { key, ttl } => {
                    state.purge(&key, now);
                    let version = state.bump_version();
                    match state.entries.get_mut(&key) {
                        Some(entry) => {
                            entry.expires_at = Some(now + ttl);
                            entry.version = version;
                            replies.push(1);
                        }
                        None => replies.push(0),
                    }
                }
            }
        }
        Ok(Some(replies))
    }

    async fn load_script(&self, source: &str) -> LockResult<String> {
        let mut state = self.state();
        state.enter(StoreOp::LoadScript)?;
        let kind = if source.contains("setnx") {
            ScriptKind::Acquire
        } else if source.contains("pttl") {
            ScriptKind::Extend
        } else if source.contains("del") {
            ScriptKind::Release
        } else {
            return Err(LockError::store(std::io::Error::other(
                "unrecognized script source",
            )));
        };
        state.script_seq += 1;
        let sha = format!("sha-{}", state.script_seq);
        state.scripts.insert(sha.clone(), kind);
        Ok(sha)
    }

    async fn eval_script(&self, sha: &str, keys: &[&str], args: &[&str]) -> LockResult<i64> {
        let now = Instant::now();
        let mut state = self.state();
        state.enter(StoreOp::EvalScript)?;

        let Some(kind) = state.scripts.get(sha).copied() else {
            return Err(LockError::store(std::io::Error::other(format!(
                "unknown script handle {sha}"
            ))));
        };
        let key = keys[0];
        let token = args[0];
        state.purge(key, now);

        match kind {
            ScriptKind::Acquire => {
                if state.entries.contains_key(key) {
                    return Ok(0);
                }
                let ttl = Duration::from_millis(args[1].parse().unwrap());
                state.write(key, token, Some(ttl), now);
                Ok(1)
            }
            ScriptKind::Release => {
                if state.entries.get(key).is_none_or(|entry| entry.value != token) {
                    return Ok(0);
                }
                state.entries.remove(key);
                Ok(1)
            }
            ScriptKind::Extend => {
                if state.entries.get(key).is_none_or(|entry| entry.value != token) {
                    return Ok(0);
                }
                let additional = Duration::from_millis(args[1].parse().unwrap());
                let version = state.bump_version();
                let entry = state.entries.get_mut(key).unwrap();
                let Some(at) = entry.expires_at else {
                    return Ok(0);
                };
                entry.expires_at = Some(at + additional);
                entry.version = version;
                Ok(1)
            }
        }
    }
}
