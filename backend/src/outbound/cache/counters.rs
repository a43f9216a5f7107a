//! Cluster-wide hit/miss counters kept as Redis integers.

use async_trait::async_trait;
use bb8_redis::redis;

use super::{RedisPool, RedisPoolError};
use crate::domain::ports::{CacheCounter, CacheCounterStore, CounterSnapshot, CounterStoreError};

/// [`CacheCounterStore`] over one Redis node.
///
/// Keys are `{prefix}metrics:cache_hit` and `{prefix}metrics:cache_miss`.
#[derive(Clone)]
pub struct RedisCacheCounters {
    pool: RedisPool,
    hit_key: String,
    miss_key: String,
}

impl RedisCacheCounters {
    /// Counters under `key_prefix`.
    pub fn new(pool: RedisPool, key_prefix: &str) -> Self {
        Self {
            pool,
            hit_key: counter_key(key_prefix, CacheCounter::Hit),
            miss_key: counter_key(key_prefix, CacheCounter::Miss),
        }
    }

    fn key(&self, counter: CacheCounter) -> &str {
        match counter {
            CacheCounter::Hit => &self.hit_key,
            CacheCounter::Miss => &self.miss_key,
        }
    }

    async fn decrement(&self, counter: CacheCounter, by: u64) -> Result<(), CounterStoreError> {
        if by == 0 {
            return Ok(());
        }
        self.pool
            .query::<i64>(redis::cmd("DECRBY").arg(self.key(counter)).arg(by))
            .await
            .map(|_: i64| ())
            .map_err(map_pool_error)
    }
}

fn counter_key(key_prefix: &str, counter: CacheCounter) -> String {
    format!("{key_prefix}metrics:{}", counter.as_str())
}

fn map_pool_error(error: RedisPoolError) -> CounterStoreError {
    CounterStoreError::backend(error.to_string())
}

/// Counters can dip below zero if a subtract races a key expiry; report zero.
fn non_negative(value: Option<i64>) -> u64 {
    value.and_then(|raw| u64::try_from(raw).ok()).unwrap_or(0)
}

#[async_trait]
impl CacheCounterStore for RedisCacheCounters {
    async fn increment(&self, counter: CacheCounter) -> Result<(), CounterStoreError> {
        self.pool
            .query::<i64>(redis::cmd("INCR").arg(self.key(counter)))
            .await
            .map(|_: i64| ())
            .map_err(map_pool_error)
    }

    async fn snapshot(&self) -> Result<CounterSnapshot, CounterStoreError> {
        let (hits, misses): (Option<i64>, Option<i64>) = self
            .pool
            .query(redis::cmd("MGET").arg(&self.hit_key).arg(&self.miss_key))
            .await
            .map_err(map_pool_error)?;
        Ok(CounterSnapshot {
            hits: non_negative(hits),
            misses: non_negative(misses),
        })
    }

    async fn subtract(&self, exported: &CounterSnapshot) -> Result<(), CounterStoreError> {
        self.decrement(CacheCounter::Hit, exported.hits).await?;
        self.decrement(CacheCounter::Miss, exported.misses).await
    }
}
