//! Lock node backed by `SET NX PX` and a compare-and-delete script.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;

use super::{RedisPool, RedisPoolError, expiry_millis};
use crate::domain::ports::{LockNode, LockNodeError};

/// Deletes the key only while it still holds the caller's token.
const RELEASE_SCRIPT: &str = r#"if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end"#;

/// [`LockNode`] over one Redis node.
#[derive(Clone)]
pub struct RedisLockNode {
    pool: RedisPool,
}

impl RedisLockNode {
    /// Wrap a pool.
    #[must_use]
    pub const fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: RedisPoolError) -> LockNodeError {
    match error {
        RedisPoolError::Timeout { .. } => LockNodeError::timeout(error.to_string()),
        other => LockNodeError::unavailable(other.to_string()),
    }
}

#[async_trait]
impl LockNode for RedisLockNode {
    async fn set_if_absent(
        &self,
        resource: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, LockNodeError> {
        let reply: Option<String> = self
            .pool
            .query(
                redis::cmd("SET")
                    .arg(resource)
                    .arg(token)
                    .arg("NX")
                    .arg("PX")
                    .arg(expiry_millis(ttl)),
            )
            .await
            .map_err(map_pool_error)?;
        Ok(reply.is_some())
    }

    async fn release_if_owner(&self, resource: &str, token: &str) -> Result<bool, LockNodeError> {
        let deleted: i64 = self
            .pool
            .query(
                redis::cmd("EVAL")
                    .arg(RELEASE_SCRIPT)
                    .arg(1)
                    .arg(resource)
                    .arg(token),
            )
            .await
            .map_err(map_pool_error)?;
        Ok(deleted == 1)
    }
}
