//! Process-local hit/miss counters.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::ports::{CacheCounter, CacheCounterStore, CounterSnapshot, CounterStoreError};

/// [`CacheCounterStore`] kept in atomics; never fails.
#[derive(Debug, Default)]
pub struct LocalCacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LocalCacheCounters {
    const fn cell(&self, counter: CacheCounter) -> &AtomicU64 {
        match counter {
            CacheCounter::Hit => &self.hits,
            CacheCounter::Miss => &self.misses,
        }
    }
}

fn saturating_sub(cell: &AtomicU64, amount: u64) {
    // `fetch_update` only errs when the closure returns `None`, which it never does.
    let _previous: Result<u64, u64> =
        cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(current.saturating_sub(amount))
        });
}

#[async_trait]
impl CacheCounterStore for LocalCacheCounters {
    async fn increment(&self, counter: CacheCounter) -> Result<(), CounterStoreError> {
        self.cell(counter).fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn snapshot(&self) -> Result<CounterSnapshot, CounterStoreError> {
        Ok(CounterSnapshot {
            hits: self.hits.load(Ordering::Acquire),
            misses: self.misses.load(Ordering::Acquire),
        })
    }

    async fn subtract(&self, exported: &CounterSnapshot) -> Result<(), CounterStoreError> {
        saturating_sub(&self.hits, exported.hits);
        saturating_sub(&self.misses, exported.misses);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increments_are_visible_in_snapshots() {
        let counters = LocalCacheCounters::default();
        counters.increment(CacheCounter::Hit).await.expect("increment");
        counters.increment(CacheCounter::Hit).await.expect("increment");
        counters.increment(CacheCounter::Miss).await.expect("increment");

        let snapshot = counters.snapshot().await.expect("snapshot");
        assert_eq!(snapshot, CounterSnapshot { hits: 2, misses: 1 });
    }

    #[tokio::test]
    async fn subtract_keeps_increments_made_after_the_snapshot() {
        let counters = LocalCacheCounters::default();
        counters.increment(CacheCounter::Miss).await.expect("increment");
        let exported = counters.snapshot().await.expect("snapshot");
        counters.increment(CacheCounter::Miss).await.expect("increment");

        counters.subtract(&exported).await.expect("subtract");

        let remaining = counters.snapshot().await.expect("snapshot");
        assert_eq!(remaining, CounterSnapshot { hits: 0, misses: 1 });
    }

    #[tokio::test]
    async fn subtract_never_underflows() {
        let counters = LocalCacheCounters::default();
        counters
            .subtract(&CounterSnapshot { hits: 5, misses: 5 })
            .await
            .expect("subtract");
        assert!(counters.snapshot().await.expect("snapshot").is_empty());
    }
}
