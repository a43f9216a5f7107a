//! The aggregate-and-classify use-case.
//!
//! A request first consults the two-tier cache. On a miss the service takes a
//! per-key in-process permit, re-checks the cache, then tries the distributed
//! lock:
//!
//! - acquired: fetch every category, write the batch through, release;
//! - contended: poll the cache until the holder fills it or the wait budget
//!   runs out, then fetch independently;
//! - unavailable or not configured: fetch independently.
//!
//! The batch is then aggregated into categorised places.

mod inflight;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use self::inflight::{InflightFetches, InflightPermit};
use super::aggregator::PlaceAggregator;
use super::batch_cache::BatchCache;
use super::category_fetcher::CategoryFetcher;
use super::geo::Coordinate;
use super::lock::{
    DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_TTL, DEFAULT_LOCK_WAIT_BUDGET, lock_resource,
};
use super::places::{CachedBatch, CategorizedPlaces};
use super::ports::{
    CacheCounter, CacheCounterStore, DistributedLock, PlacesQuery, PlacesRequest,
};
use super::query_key::QueryKey;
use super::runtime::Sleeper;

/// Lock timing for the miss path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacesServiceConfig {
    /// Prefix for lock keys; matches the cache key prefix.
    pub key_prefix: String,
    /// Lock expiry.
    pub lock_ttl: Duration,
    /// How long a contended caller waits for the cache to fill.
    pub lock_wait_budget: Duration,
    /// Gap between cache polls while waiting.
    pub lock_poll_interval: Duration,
}

impl Default for PlacesServiceConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            lock_ttl: DEFAULT_LOCK_TTL,
            lock_wait_budget: DEFAULT_LOCK_WAIT_BUDGET,
            lock_poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
        }
    }
}

impl PlacesServiceConfig {
    fn poll_attempts(&self) -> u128 {
        let interval = self.lock_poll_interval.as_millis().max(1);
        (self.lock_wait_budget.as_millis() / interval).max(1)
    }
}

/// Collaborators of [`PlacesService`].
pub struct PlacesServicePorts {
    /// Two-tier batch cache.
    pub cache: Arc<BatchCache>,
    /// Paced upstream fetcher.
    pub fetcher: Arc<CategoryFetcher>,
    /// Classifier and enricher.
    pub aggregator: Arc<PlaceAggregator>,
    /// Cluster lock; `None` when no shared cache is configured.
    pub lock: Option<Arc<dyn DistributedLock>>,
    /// Hit/miss counters.
    pub counters: Arc<dyn CacheCounterStore>,
    /// Sleeper used while polling a contended lock.
    pub sleeper: Arc<dyn Sleeper>,
    /// Clock stamping fetched batches.
    pub clock: Arc<dyn Clock>,
}

/// Places use-case wiring cache, lock, fetcher and aggregator together.
pub struct PlacesService {
    ports: PlacesServicePorts,
    config: PlacesServiceConfig,
    inflight: InflightFetches,
}

impl PlacesService {
    /// Build the service.
    pub fn new(ports: PlacesServicePorts, config: PlacesServiceConfig) -> Self {
        Self {
            ports,
            config,
            inflight: InflightFetches::default(),
        }
    }

    /// Cached or freshly fetched batch for a query.
    pub async fn load_batch(&self, center: Coordinate, radius_meters: u32) -> Arc<CachedBatch> {
        let key = QueryKey::new(center.lat, center.lon, radius_meters);
        if let Some(batch) = self.ports.cache.get(&key).await {
            self.count(CacheCounter::Hit).await;
            return batch;
        }
        self.count(CacheCounter::Miss).await;

        let _permit = self.inflight.enter(&key).await;
        if let Some(batch) = self.ports.cache.get(&key).await {
            debug!(%key, "batch filled by a concurrent request");
            return batch;
        }

        let Some(lock) = self.ports.lock.as_ref() else {
            return self.fetch_and_store(&key, center, radius_meters).await;
        };
        let resource = lock_resource(&self.config.key_prefix, &key);
        match lock.try_acquire(&resource, self.config.lock_ttl).await {
            Ok(Some(handle)) => {
                let acquired_at = Instant::now();
                let batch = match self.ports.cache.get(&key).await {
                    Some(batch) => batch,
                    None => self.fetch_and_store(&key, center, radius_meters).await,
                };
                if acquired_at.elapsed() >= handle.validity() {
                    warn!(
                        %key,
                        validity_ms = handle.validity().as_millis(),
                        "fetch outlived the lock; another instance may have fetched too"
                    );
                }
                if let Err(error) = lock.release(handle).await {
                    warn!(%key, %error, "failed to release fetch lock; it will expire");
                }
                batch
            }
            Ok(None) => {
                if let Some(batch) = self.wait_for_holder(&key).await {
                    return batch;
                }
                info!(%key, "lock wait budget exhausted; fetching independently");
                self.fetch_and_store(&key, center, radius_meters).await
            }
            Err(error) => {
                warn!(%key, %error, "fetch lock unavailable; fetching without exclusivity");
                self.fetch_and_store(&key, center, radius_meters).await
            }
        }
    }

    async fn wait_for_holder(&self, key: &QueryKey) -> Option<Arc<CachedBatch>> {
        for _ in 0..self.config.poll_attempts() {
            self.ports
                .sleeper
                .sleep(self.config.lock_poll_interval)
                .await;
            if let Some(batch) = self.ports.cache.get(key).await {
                debug!(%key, "batch filled by lock holder");
                return Some(batch);
            }
        }
        None
    }

    async fn fetch_and_store(
        &self,
        key: &QueryKey,
        center: Coordinate,
        radius_meters: u32,
    ) -> Arc<CachedBatch> {
        let report = self.ports.fetcher.fetch_all(center, radius_meters).await;
        let total_failure = report.is_total_failure();
        let complete = report.is_complete();
        let failed = report.failed_categories.len();
        let batch = CachedBatch {
            elements: report.elements,
            fetched_at: self.ports.clock.utc(),
        };
        if complete {
            self.ports.cache.put(key, batch).await
        } else if total_failure {
            warn!(%key, "every category failed; result not cached");
            Arc::new(batch)
        } else {
            warn!(%key, failed, "partial fetch cached locally only");
            self.ports.cache.put_local(key, batch)
        }
    }

    async fn count(&self, counter: CacheCounter) {
        if let Err(error) = self.ports.counters.increment(counter).await {
            debug!(counter = counter.as_str(), %error, "failed to record cache counter");
        }
    }
}

#[async_trait]
impl PlacesQuery for PlacesService {
    async fn places_near(&self, request: PlacesRequest) -> CategorizedPlaces {
        let batch = self
            .load_batch(request.center, request.radius_meters)
            .await;
        self.ports
            .aggregator
            .aggregate(&batch.elements, request.center)
            .await
    }
}
