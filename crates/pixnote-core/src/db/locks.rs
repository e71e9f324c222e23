//! Per-key async mutual exclusion.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async locks keyed by `K`.
///
/// Entries are dropped once no guard or waiter references them.
#[derive(Debug)]
pub(crate) struct KeyedLocks<K> {
    slots: Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wait for the lock on `key`.
    ///
    /// Cancel safe: dropping the future while it waits releases its claim on
    /// the entry the same way dropping a guard does.
    pub(crate) async fn lock(&self, key: K) -> KeyGuard<K> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let mut held = KeyGuard {
            key,
            slot,
            guard: None,
            slots: Arc::clone(&self.slots),
        };
        // Declared after `held` so a cancelled wait drops it first.
        let mut acquire = std::pin::pin!(Arc::clone(&held.slot).lock_owned());
        held.guard = Some(acquire.as_mut().await);
        held
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Holds the lock for one key until dropped.
///
/// While `guard` is `None` this only marks a pending wait.
pub(crate) struct KeyGuard<K: Eq + Hash> {
    key: K,
    slot: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // map entry + this guard's handle
        if Arc::strong_count(&self.slot) <= 2 {
            slots.remove(&self.key);
        }
    }
}
