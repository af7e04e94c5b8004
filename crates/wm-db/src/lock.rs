//! In-process advisory locks for embedded backends.
//!
//! DuckDB has no advisory lock primitive. A DuckDB database file is opened
//! for writing by a single process, so every session that can race on it
//! lives in this process and shares one registry.

use crate::error::{DbError, DbResult};
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Set of held lock ids plus a wake-up signal for waiters.
#[derive(Debug, Default)]
pub struct LockRegistry {
    held: Mutex<HashSet<i64>>,
    released: Notify,
}

impl LockRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `key` if it is free. Returns whether the lock was taken.
    pub fn try_acquire(&self, key: i64) -> DbResult<bool> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        Ok(held.insert(key))
    }

    /// Wait until `key` is free, then take it.
    pub async fn acquire(&self, key: i64) -> DbResult<()> {
        loop {
            // Register for wake-ups before checking so a release between the
            // check and the await is not missed.
            let notified = self.released.notified();
            if self.try_acquire(key)? {
                return Ok(());
            }
            log::debug!("Advisory lock {} is held elsewhere, waiting", key);
            notified.await;
        }
    }

    /// Release `key`. Returns whether it was held.
    pub fn release(&self, key: i64) -> DbResult<bool> {
        let was_held = self
            .held
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
            .remove(&key);
        self.released.notify_waiters();
        Ok(was_held)
    }

    /// Whether `key` is currently held by any session
    pub fn is_held(&self, key: i64) -> bool {
        self.held
            .lock()
            .map(|held| held.contains(&key))
            .unwrap_or(false)
    }
}
