//! Cluster-wide mutual exclusion for upstream fetches.
//!
//! Two [`DistributedLock`](crate::domain::ports::DistributedLock) strategies
//! share the [`LockNode`](crate::domain::ports::LockNode) primitive:
//! [`SingleNodeLock`] for one shared cache and [`QuorumLock`] for several
//! independent ones. Only one is active at a time, and neither is used when no
//! shared cache is configured.

pub mod quorum;
pub mod single_node;

use std::time::Duration;

pub use self::quorum::QuorumLock;
pub use self::single_node::SingleNodeLock;
use crate::domain::query_key::QueryKey;

/// Floor for how long a fetch lock is held before it expires on its own.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(60);
/// How long a contended caller waits for the holder to fill the cache.
pub const DEFAULT_LOCK_WAIT_BUDGET: Duration = Duration::from_secs(10);
/// How often a contended caller re-checks the cache.
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Lock key for a query: `prefix + "lock:overpass:" + key`.
#[must_use]
pub fn lock_resource(key_prefix: &str, key: &QueryKey) -> String {
    format!("{key_prefix}lock:overpass:{key}")
}

/// Lock expiry covering a full paced fetch where every category runs to its
/// request timeout, never below [`DEFAULT_LOCK_TTL`].
#[must_use]
pub fn lock_ttl_for_fetch(
    categories: usize,
    request_timeout: Duration,
    pacing: Duration,
) -> Duration {
    let count = u32::try_from(categories).unwrap_or(u32::MAX);
    let worst_case = request_timeout
        .saturating_mul(count)
        .saturating_add(pacing.saturating_mul(count.saturating_sub(1)));
    worst_case.max(DEFAULT_LOCK_TTL)
}

#[cfg(test)]
mod tests {
    //! Unit tests for lock key naming and expiry sizing.
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(7, 30_000, 1_100, Duration::from_millis(7 * 30_000 + 6 * 1_100))]
    #[case(1, 30_000, 1_100, Duration::from_secs(60))]
    #[case(0, 30_000, 1_100, Duration::from_secs(60))]
    #[case(3, 1_000, 0, Duration::from_secs(60))]
    fn lock_ttl_covers_a_worst_case_fetch(
        #[case] categories: usize,
        #[case] timeout_ms: u64,
        #[case] pacing_ms: u64,
        #[case] expected: Duration,
    ) {
        assert_eq!(
            lock_ttl_for_fetch(
                categories,
                Duration::from_millis(timeout_ms),
                Duration::from_millis(pacing_ms)
            ),
            expected
        );
    }

    #[test]
    fn lock_resource_uses_prefix_and_key() {
        let key = QueryKey::new(35.36, 138.73, 5000);
        assert_eq!(
            lock_resource("places:", &key),
            "places:lock:overpass:35.3600:138.7300:5000"
        );
    }
}
