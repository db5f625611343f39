//! Per-host mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use telemetry::metrics;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Named async locks keyed by upper-cased host identifier.
///
/// Entries are dropped once no holder or waiter remains.
#[derive(Clone, Default)]
pub struct HostLocks {
    registry: Registry,
}

/// Held for the duration of one provisioning call on a host.
pub struct HostGuard {
    key: String,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl HostLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, host: &str) -> HostGuard {
        let key = host.to_uppercase();
        let lock = self
            .registry
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        let guard = lock.lock_owned().await;
        metrics().hosts_locked.inc();

        HostGuard {
            key,
            registry: self.registry.clone(),
            guard: Some(guard),
        }
    }

    /// Number of hosts with a holder or waiter.
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HostGuard {
    pub fn host(&self) -> &str {
        &self.key
    }
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        metrics().hosts_locked.dec();

        let mut registry = self.registry.lock();
        if let Some(lock) = registry.get(&self.key) {
            if Arc::strong_count(lock) == 1 {
                registry.remove(&self.key);
            }
        }
    }
}
