//! Process-local cache tier.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::places::CachedBatch;
use crate::domain::query_key::QueryKey;

#[derive(Debug)]
struct LocalEntry {
    batch: Arc<CachedBatch>,
    stored_at: DateTime<Utc>,
}

/// Concurrent map of batches with a fixed TTL and a soft size cap.
#[derive(Debug)]
pub struct LocalBatchTier {
    entries: DashMap<QueryKey, LocalEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl LocalBatchTier {
    /// Create an empty tier.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live entry for `key`, dropping it if it has expired.
    pub fn get(&self, key: &QueryKey, now: DateTime<Utc>) -> Option<Arc<CachedBatch>> {
        match self.entries.get(key) {
            Some(entry) if self.is_fresh(&entry, now) => return Some(Arc::clone(&entry.batch)),
            Some(_) => {}
            None => return None,
        }
        self.entries
            .remove_if(key, |_, entry| !self.is_fresh(entry, now));
        None
    }

    /// Store a batch, evicting stale or oldest entries past the size cap.
    pub fn insert(&self, key: QueryKey, batch: Arc<CachedBatch>, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            LocalEntry {
                batch,
                stored_at: now,
            },
        );
        if self.entries.len() > self.max_entries {
            self.evict(now);
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, entry: &LocalEntry, now: DateTime<Utc>) -> bool {
        (now - entry.stored_at)
            .to_std()
            .map_or(true, |age| age < self.ttl)
    }

    fn evict(&self, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().stored_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
