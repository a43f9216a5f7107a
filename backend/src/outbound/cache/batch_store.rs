//! Shared cache tier stored as plain Redis strings with a `PX` expiry.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;

use super::{RedisPool, RedisPoolError, expiry_millis};
use crate::domain::ports::{RemoteBatchStore, RemoteStoreError};

/// [`RemoteBatchStore`] over one Redis node.
#[derive(Clone)]
pub struct RedisBatchStore {
    pool: RedisPool,
}

impl RedisBatchStore {
    /// Wrap a pool.
    #[must_use]
    pub const fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: RedisPoolError) -> RemoteStoreError {
    match error {
        RedisPoolError::Timeout { .. } => RemoteStoreError::timeout(error.to_string()),
        other => RemoteStoreError::backend(other.to_string()),
    }
}

#[async_trait]
impl RemoteBatchStore for RedisBatchStore {
    async fn load(&self, key: &str) -> Result<Option<String>, RemoteStoreError> {
        self.pool
            .query(redis::cmd("GET").arg(key))
            .await
            .map_err(map_pool_error)
    }

    async fn store(
        &self,
        key: &str,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), RemoteStoreError> {
        self.pool
            .query::<()>(
                redis::cmd("SET")
                    .arg(key)
                    .arg(payload)
                    .arg("PX")
                    .arg(expiry_millis(ttl)),
            )
            .await
            .map_err(map_pool_error)
    }
}
