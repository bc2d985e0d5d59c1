//! Ownership tokens and their scoped storage.
//!
//! Every successful acquisition writes a random token into the store key, and
//! conditional release/extend only act when the key still carries that exact
//! token. Where the token is remembered on the client side is governed by
//! [`TokenScope`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;

use uuid::Uuid;

/// Where a lock keeps the token proving its current acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenScope {
    /// One token slot shared by every caller of the same lock value.
    ///
    /// Any caller holding a reference to the lock can release or extend an
    /// acquisition made by any other caller of that same value.
    PerInstance,

    /// One token slot per calling context: the current tokio task when inside
    /// one, otherwise the current OS thread.
    ///
    /// This keeps tokens private across holders even when they go through a
    /// shared lock value. If caller A acquires, lets the TTL lapse, and
    /// caller B then acquires the same key, A's stale token no longer matches
    /// the key, so A's release and extend calls leave B's acquisition intact.
    ///
    /// A slot is freed by a release from its own context, not by that context
    /// ending. A task that acquires and exits without releasing leaves its
    /// slot behind for as long as the lock value lives; long-lived locks
    /// acquired from many short-lived tasks should release on every exit
    /// path, or use [`PerInstance`](Self::PerInstance).
    #[default]
    PerCallerContext,
}

/// Identity of the calling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CallerId {
    Task(tokio::task::Id),
    Thread(ThreadId),
}

impl CallerId {
    fn current() -> Self {
        match tokio::task::try_id() {
            Some(id) => Self::Task(id),
            None => Self::Thread(std::thread::current().id()),
        }
    }
}

enum Slots {
    Instance(Mutex<Option<String>>),
    PerCaller(Mutex<HashMap<CallerId, String>>),
}

/// Scoped storage for the ownership token of one lock.
pub(crate) struct TokenCell {
    slots: Slots,
}

impl TokenCell {
    pub(crate) fn new(scope: TokenScope) -> Self {
        let slots = match scope {
            TokenScope::PerInstance => Slots::Instance(Mutex::new(None)),
            TokenScope::PerCallerContext => Slots::PerCaller(Mutex::new(HashMap::new())),
        };
        Self { slots }
    }

    /// Mints a fresh candidate token. `acquire` mints one per acquisition
    /// sequence; retries within the sequence reuse it.
    pub(crate) fn generate() -> String {
        Uuid::new_v4().to_string()
    }

    /// Stores `token` for the current scope.
    pub(crate) fn set(&self, token: String) {
        match &self.slots {
            Slots::Instance(slot) => *lock_unpoisoned(slot) = Some(token),
            Slots::PerCaller(slots) => {
                lock_unpoisoned(slots).insert(CallerId::current(), token);
            }
        }
    }

    /// Token held by the current scope, if any.
    pub(crate) fn get(&self) -> Option<String> {
        match &self.slots {
            Slots::Instance(slot) => lock_unpoisoned(slot).clone(),
            Slots::PerCaller(slots) => lock_unpoisoned(slots).get(&CallerId::current()).cloned(),
        }
    }

    /// Reads and clears the current scope's token in one step. Release uses
    /// this so the local token is gone before the store is touched.
    pub(crate) fn take(&self) -> Option<String> {
        match &self.slots {
            Slots::Instance(slot) => lock_unpoisoned(slot).take(),
            Slots::PerCaller(slots) => lock_unpoisoned(slots).remove(&CallerId::current()),
        }
    }

    pub(crate) fn is_held(&self) -> bool {
        match &self.slots {
            Slots::Instance(slot) => lock_unpoisoned(slot).is_some(),
            Slots::PerCaller(slots) => lock_unpoisoned(slots).contains_key(&CallerId::current()),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
