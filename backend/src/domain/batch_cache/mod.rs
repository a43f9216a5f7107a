//! Two-tier read-through/write-through cache for place batches.
//!
//! The local tier is a per-process map with a short TTL. The optional remote
//! tier is shared by every instance and holds compressed payloads for longer.
//! Remote failures of any kind degrade to a miss; the caller never sees a
//! cache error.

pub mod codec;
mod local;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, warn};

pub use self::local::LocalBatchTier;
use crate::domain::places::CachedBatch;
use crate::domain::ports::RemoteBatchStore;
use crate::domain::query_key::QueryKey;
use crate::domain::runtime::TtlJitter;

/// Default lifetime of a remote entry.
pub const DEFAULT_REMOTE_TTL: Duration = Duration::from_secs(6 * 60 * 60);
/// Default lifetime of a local entry.
pub const DEFAULT_LOCAL_TTL: Duration = Duration::from_secs(5 * 60);
/// Default local tier size cap.
pub const DEFAULT_LOCAL_CAPACITY: usize = 512;

/// Cache tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCacheConfig {
    /// Prefix prepended to every remote key.
    pub key_prefix: String,
    /// Local entry lifetime. Clamped below `remote_ttl`.
    pub local_ttl: Duration,
    /// Remote entry lifetime before jitter.
    pub remote_ttl: Duration,
    /// Local tier size cap.
    pub local_capacity: usize,
}

impl Default for BatchCacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            local_ttl: DEFAULT_LOCAL_TTL,
            remote_ttl: DEFAULT_REMOTE_TTL,
            local_capacity: DEFAULT_LOCAL_CAPACITY,
        }
    }
}

impl BatchCacheConfig {
    /// Local TTL guaranteed to be strictly shorter than the remote TTL
    /// whenever a remote tier is in use.
    #[must_use]
    pub fn effective_local_ttl(&self) -> Duration {
        if self.local_ttl < self.remote_ttl {
            self.local_ttl
        } else {
            self.remote_ttl / 2
        }
    }
}

/// Collaborators for [`BatchCache`].
pub struct BatchCacheDeps {
    /// Shared tier, absent in single-instance deployments.
    pub remote: Option<Arc<dyn RemoteBatchStore>>,
    /// Clock used for local expiry.
    pub clock: Arc<dyn Clock>,
    /// Remote TTL jitter.
    pub jitter: Arc<dyn TtlJitter>,
}

/// The two-tier cache.
pub struct BatchCache {
    local: LocalBatchTier,
    remote: Option<Arc<dyn RemoteBatchStore>>,
    key_prefix: String,
    remote_ttl: Duration,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn TtlJitter>,
}

impl BatchCache {
    /// Build a cache from its configuration and collaborators.
    pub fn new(config: &BatchCacheConfig, deps: BatchCacheDeps) -> Self {
        let local_ttl = if deps.remote.is_some() {
            config.effective_local_ttl()
        } else {
            config.local_ttl
        };
        Self {
            local: LocalBatchTier::new(local_ttl, config.local_capacity),
            remote: deps.remote,
            key_prefix: config.key_prefix.clone(),
            remote_ttl: config.remote_ttl,
            clock: deps.clock,
            jitter: deps.jitter,
        }
    }

    /// Whether a shared tier is configured.
    #[must_use]
    pub const fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Local tier lifetime in effect.
    #[must_use]
    pub const fn local_ttl(&self) -> Duration {
        self.local.ttl()
    }

    /// Remote key for a query: `prefix + "overpass:" + key`.
    #[must_use]
    pub fn remote_key(&self, key: &QueryKey) -> String {
        format!("{}overpass:{key}", self.key_prefix)
    }

    /// Look a batch up in the local tier, then the remote tier.
    ///
    /// A remote hit is promoted into the local tier.
    pub async fn get(&self, key: &QueryKey) -> Option<Arc<CachedBatch>> {
        if let Some(batch) = self.local.get(key, self.clock.utc()) {
            debug!(%key, "local cache hit");
            return Some(batch);
        }
        let remote = self.remote.as_ref()?;
        let remote_key = self.remote_key(key);
        let payload = match remote.load(&remote_key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(error) => {
                warn!(%key, %error, "remote cache read failed; treating as miss");
                return None;
            }
        };
        match codec::decode(&payload) {
            Ok(batch) => {
                debug!(%key, "remote cache hit; promoting to local tier");
                let stamp = self.promotion_stamp(&batch, self.clock.utc());
                let batch = Arc::new(batch);
                self.local.insert(key.clone(), Arc::clone(&batch), stamp);
                Some(batch)
            }
            Err(error) => {
                warn!(%key, %error, "remote cache payload malformed; treating as miss");
                None
            }
        }
    }

    /// Local timestamp for a promoted remote batch.
    ///
    /// The shared entry expires no earlier than `fetched_at + remote_ttl`, so
    /// the local copy is back-dated until its expiry falls on or before that
    /// instant.
    fn promotion_stamp(&self, batch: &CachedBatch, now: DateTime<Utc>) -> DateTime<Utc> {
        let headroom = self.remote_ttl.saturating_sub(self.local.ttl());
        TimeDelta::from_std(headroom)
            .ok()
            .and_then(|headroom| batch.fetched_at.checked_add_signed(headroom))
            .map_or(now, |latest| latest.min(now))
    }

    /// Store a batch in both tiers. The remote write is best-effort.
    pub async fn put(&self, key: &QueryKey, batch: CachedBatch) -> Arc<CachedBatch> {
        let batch = self.put_local(key, batch);
        let Some(remote) = self.remote.as_ref() else {
            return batch;
        };
        let payload = match codec::encode(&batch) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%key, %error, "failed to encode batch for remote cache");
                return batch;
            }
        };
        let ttl = self.jitter.jittered_ttl(self.remote_ttl);
        if let Err(error) = remote.store(&self.remote_key(key), &payload, ttl).await {
            warn!(%key, %error, "remote cache write failed");
        }
        batch
    }

    /// Store a batch in the local tier only.
    pub fn put_local(&self, key: &QueryKey, batch: CachedBatch) -> Arc<CachedBatch> {
        let batch = Arc::new(batch);
        self.local
            .insert(key.clone(), Arc::clone(&batch), self.clock.utc());
        batch
    }
}
