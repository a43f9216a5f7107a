//! Per-key guard against duplicate fetches inside one process.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::query_key::QueryKey;

/// Registry of per-key async mutexes.
///
/// Entries are removed once nobody holds or waits on them, so the map only
/// grows with concurrently missing keys.
#[derive(Debug, Default)]
pub struct InflightFetches {
    slots: DashMap<QueryKey, Arc<Mutex<()>>>,
}

/// Exclusive hold on one key's fetch.
#[derive(Debug)]
pub struct InflightPermit<'a> {
    registry: &'a InflightFetches,
    key: QueryKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InflightFetches {
    /// Wait for exclusive hold on `key`.
    pub async fn enter(&self, key: &QueryKey) -> InflightPermit<'_> {
        let slot = Arc::clone(self.slots.entry(key.clone()).or_default().value());
        let guard = slot.lock_owned().await;
        InflightPermit {
            registry: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.slots.len()
    }
}

impl Drop for InflightPermit<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // One reference is the map's own; anything more is a waiter that will
        // reuse the slot.
        self.registry
            .slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) <= 1);
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for in-flight permits.
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn slots_are_removed_after_release() {
        let registry = InflightFetches::default();
        let key = QueryKey::new(1.0, 1.0, 10);
        {
            let _permit = registry.enter(&key).await;
            assert_eq!(registry.tracked(), 1);
        }
        assert_eq!(registry.tracked(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_entrant_waits_for_the_first() {
        let registry = Arc::new(InflightFetches::default());
        let key = QueryKey::new(1.0, 1.0, 10);
        let permit = registry.enter(&key).await;

        let waiter = {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            tokio::spawn(async move {
                let _permit = registry.enter(&key).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(permit);
        waiter.await.expect("waiter completes");
        assert_eq!(registry.tracked(), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let registry = InflightFetches::default();
        let _first = registry.enter(&QueryKey::new(1.0, 1.0, 10)).await;
        let _second = registry.enter(&QueryKey::new(2.0, 2.0, 10)).await;
        assert_eq!(registry.tracked(), 2);
    }
}
