//! Port for the cache hit/miss counters read by the metrics exporter.
//!
//! Counters live in the shared cache when one exists so every instance adds to
//! the same totals; the exporter subtracts what it pushed, leaving increments
//! that raced with the export for the next flush.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by the counter store.
    pub enum CounterStoreError {
        /// The backing store failed.
        Backend { message: String } => "cache counter store failure: {message}",
    }
}

/// Which counter to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCounter {
    /// A lookup served from either cache tier.
    Hit,
    /// A lookup that went past both tiers.
    Miss,
}

impl CacheCounter {
    /// Stable counter name used in keys and metric names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache_hit",
            Self::Miss => "cache_miss",
        }
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Cache hits since the last export.
    pub hits: u64,
    /// Cache misses since the last export.
    pub misses: u64,
}

impl CounterSnapshot {
    /// `true` when there is nothing to export.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.hits == 0 && self.misses == 0
    }
}

/// Counter storage shared by request handlers and the exporter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheCounterStore: Send + Sync {
    /// Increment one counter by one.
    async fn increment(&self, counter: CacheCounter) -> Result<(), CounterStoreError>;

    /// Read both counters.
    async fn snapshot(&self) -> Result<CounterSnapshot, CounterStoreError>;

    /// Subtract previously exported amounts.
    async fn subtract(&self, exported: &CounterSnapshot) -> Result<(), CounterStoreError>;
}
