//! Runtime seams for time-dependent behaviour: sleeping and TTL jitter.
//!
//! Services take these as trait objects so tests can swap in immediate
//! sleepers and fixed jitter.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Async sleep abstraction for pacing and lock polling.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleep for the provided duration.
    ///
    /// # Examples
    /// ```
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::time::Duration;
    ///
    /// use async_trait::async_trait;
    /// use places_backend::domain::runtime::Sleeper;
    ///
    /// #[derive(Default)]
    /// struct CountingSleeper {
    ///     calls: AtomicUsize,
    /// }
    ///
    /// #[async_trait]
    /// impl Sleeper for CountingSleeper {
    ///     async fn sleep(&self, _duration: Duration) {
    ///         self.calls.fetch_add(1, Ordering::SeqCst);
    ///     }
    /// }
    /// ```
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Spreads remote cache expiries so keys written together do not expire
/// together.
pub trait TtlJitter: Send + Sync {
    /// Return `base` extended by some amount.
    fn jittered_ttl(&self, base: Duration) -> Duration;
}

/// Adds up to a tenth of the base TTL at random.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTtlJitter;

impl TtlJitter for RandomTtlJitter {
    fn jittered_ttl(&self, base: Duration) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = base_ms / 10;
        if max_extra == 0 {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0..=max_extra);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for TTL jitter bounds and the Tokio sleeper.
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Duration::from_secs(3600))]
    #[case(Duration::from_millis(95))]
    fn random_jitter_stays_within_a_tenth(#[case] base: Duration) {
        for _ in 0..50 {
            let ttl = RandomTtlJitter.jittered_ttl(base);
            assert!(ttl >= base);
            assert!(ttl <= base + base / 10);
        }
    }

    #[test]
    fn tiny_ttls_are_unchanged() {
        let base = Duration::from_millis(5);
        assert_eq!(RandomTtlJitter.jittered_ttl(base), base);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_advances_virtual_time() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
