//! Redis-backed adapters for the shared cache tier, lock nodes and counters.
//!
//! All three share one [`RedisPool`] per Redis node. Every command is bounded
//! by the pool's operation timeout; adapters translate pool errors into the
//! port's own error type and never retry.

mod batch_store;
mod counters;
mod lock_node;
mod pool;

use std::time::Duration;

pub use batch_store::RedisBatchStore;
pub use counters::RedisCacheCounters;
pub use lock_node::RedisLockNode;
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError};

/// Millisecond expiry for `PX`, never zero.
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_at_least_one_millisecond() {
        assert_eq!(expiry_millis(Duration::ZERO), 1);
        assert_eq!(expiry_millis(Duration::from_micros(10)), 1);
        assert_eq!(expiry_millis(Duration::from_secs(6 * 3600)), 21_600_000);
    }
}
