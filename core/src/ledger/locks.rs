//! Per-property mutual exclusion for booking creation.

use crate::types::PropertyId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes check-then-insert per property within one process.
///
/// Cross-instance exclusion is the store's job; this only keeps one process
/// from racing itself and keeps conflicts cheap to detect.
#[derive(Clone, Default)]
pub struct PropertyLocks {
    inner: Arc<Mutex<HashMap<PropertyId, Arc<AsyncMutex<()>>>>>,
}

impl PropertyLocks {
    /// Creates an empty lock table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `property_id`
    pub async fn acquire(&self, property_id: PropertyId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // idle entries are referenced only by the map
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(property_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of properties with a live lock entry
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no lock entries are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_property_is_exclusive() {
        let locks = PropertyLocks::new();
        let property = PropertyId::new();

        let guard = locks.acquire(property).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire(property)).await;
        assert!(second.is_err(), "second acquire must wait");

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(200), locks.acquire(property)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_properties_do_not_block() {
        let locks = PropertyLocks::new();
        let _a = locks.acquire(PropertyId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(PropertyId::new())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = PropertyLocks::new();
        for _ in 0..10 {
            let _guard = locks.acquire(PropertyId::new()).await;
        }
        let _guard = locks.acquire(PropertyId::new()).await;
        assert_eq!(locks.len(), 1);
    }
}
