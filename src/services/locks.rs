use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-tool mutual exclusion for multi-step mutations
///
/// Update and Delete of the same tool id run one at a time; different ids
/// proceed concurrently. Entries are dropped once no one holds or waits on them.
#[derive(Clone, Default)]
pub struct ToolLocks {
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

/// Held for the duration of one mutation of a tool
pub struct ToolLockGuard {
    id: i64,
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
    _guard: OwnedMutexGuard<()>,
}

impl ToolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to tool `id`
    pub async fn lock(&self, id: i64) -> ToolLockGuard {
        let mutex = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        ToolLockGuard {
            id,
            locks: self.locks.clone(),
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of ids currently tracked
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for ToolLockGuard {
    fn drop(&mut self) {
        // map + this guard; anyone else means a waiter still needs the entry
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 2);
    }
}
