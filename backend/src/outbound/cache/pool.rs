//! Async connection pool for Redis.
//!
//! This module wraps `bb8-redis` so each adapter gets pooled multiplexed
//! connections with a bound on every round trip. The pool is built lazily:
//! construction never touches the network, so a Redis outage at start-up
//! degrades the cache instead of failing the process.

use std::time::Duration;

use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::{Cmd, FromRedisValue};
use tokio::time::timeout;

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedisPoolError {
    /// The connection URL was rejected.
    #[error("failed to build redis pool: {message}")]
    Build {
        /// Client error text.
        message: String,
    },

    /// Failed to check out a connection from the pool.
    #[error("failed to get redis connection from pool: {message}")]
    Checkout {
        /// Pool error text.
        message: String,
    },

    /// Redis answered with an error or the connection dropped.
    #[error("redis command failed: {message}")]
    Command {
        /// Redis error text.
        message: String,
    },

    /// Checkout plus round trip exceeded the operation timeout.
    #[error("redis operation timed out after {timeout:?}")]
    Timeout {
        /// Bound that was exceeded.
        timeout: Duration,
    },
}

impl RedisPoolError {
    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Create a command error with the given message.
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }
}

/// Configuration for one Redis connection pool.
///
/// # Example
///
/// ```ignore
/// let config = RedisPoolConfig::new("redis://127.0.0.1:6379")
///     .with_max_size(16)
///     .with_operation_timeout(Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    url: String,
    max_size: u32,
    connection_timeout: Duration,
    operation_timeout: Duration,
}

impl RedisPoolConfig {
    /// Create a new configuration with the given Redis URL.
    ///
    /// Defaults: 8 connections, 2 s checkout timeout, 1 s per operation.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_size: 8,
            connection_timeout: Duration::from_secs(2),
            operation_timeout: Duration::from_secs(1),
        }
    }

    /// Set the maximum number of connections in the pool.
    #[must_use]
    pub const fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the connection checkout timeout.
    #[must_use]
    pub const fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the bound on checkout plus one command round trip.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Get the Redis URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Pooled Redis client shared by the cache, lock and counter adapters.
#[derive(Clone)]
pub struct RedisPool {
    inner: Pool<RedisConnectionManager>,
    operation_timeout: Duration,
}

impl RedisPool {
    /// Create a pool without connecting.
    ///
    /// # Errors
    ///
    /// Returns `RedisPoolError::Build` if the URL cannot be parsed.
    pub fn new(config: &RedisPoolConfig) -> Result<Self, RedisPoolError> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|err| RedisPoolError::build(err.to_string()))?;
        let inner = Pool::builder()
            .max_size(config.max_size.max(1))
            .connection_timeout(config.connection_timeout)
            .build_unchecked(manager);
        Ok(Self {
            inner,
            operation_timeout: config.operation_timeout,
        })
    }

    /// Run one command on a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns `RedisPoolError::Timeout` when checkout plus the round trip
    /// exceeds the operation timeout, otherwise the checkout or command error.
    pub async fn query<T: FromRedisValue>(&self, command: &Cmd) -> Result<T, RedisPoolError> {
        let round_trip = async {
            let mut conn = self
                .inner
                .get()
                .await
                .map_err(|err| RedisPoolError::checkout(err.to_string()))?;
            command
                .query_async::<T>(&mut *conn)
                .await
                .map_err(|err| RedisPoolError::command(err.to_string()))
        };
        timeout(self.operation_timeout, round_trip)
            .await
            .map_err(|_| RedisPoolError::Timeout {
                timeout: self.operation_timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_config_default_values() {
        let config = RedisPoolConfig::new("redis://localhost:6379");

        assert_eq!(config.url(), "redis://localhost:6379");
        assert_eq!(config.max_size, 8);
        assert_eq!(config.connection_timeout, Duration::from_secs(2));
        assert_eq!(config.operation_timeout, Duration::from_secs(1));
    }

    #[rstest]
    fn pool_config_builder_pattern() {
        let config = RedisPoolConfig::new("redis://localhost:6379")
            .with_max_size(16)
            .with_connection_timeout(Duration::from_millis(300))
            .with_operation_timeout(Duration::from_millis(200));

        assert_eq!(config.max_size, 16);
        assert_eq!(config.connection_timeout, Duration::from_millis(300));
        assert_eq!(config.operation_timeout, Duration::from_millis(200));
    }

    #[rstest]
    fn invalid_url_fails_to_build() {
        let result = RedisPool::new(&RedisPoolConfig::new("not a url"));
        assert!(matches!(result, Err(RedisPoolError::Build { .. })));
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_server_fails_within_the_operation_timeout() {
        let config = RedisPoolConfig::new("redis://127.0.0.1:1")
            .with_connection_timeout(Duration::from_millis(100))
            .with_operation_timeout(Duration::from_millis(250));
        let pool = RedisPool::new(&config).expect("valid url");

        let result: Result<Option<String>, _> =
            pool.query(bb8_redis::redis::cmd("GET").arg("key")).await;

        assert!(result.is_err());
    }
}
