//! Per-workflow request serialization
//!
//! Each workflow id gets its own async mutex. A request holds the guard from
//! the backend call until its cache invalidation is done, so two requests
//! for the same workflow never resolve interleaved.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock key shared by create requests, which have no workflow id yet
pub const CREATE_KEY: &str = "<create>";

#[derive(Debug, Clone, Default)]
pub struct WorkflowLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl WorkflowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `key`
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            // Drop locks nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys currently held or waited on
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
