//! Deterministic clock, sleeper and jitter doubles.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::runtime::{Sleeper, TtlJitter};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start the clock at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Start the clock at a fixed instant in November 2023.
    #[must_use]
    pub fn at_fixed_instant() -> Self {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        Self::new(now)
    }

    /// Move the clock forward.
    ///
    /// # Panics
    /// Panics if `delta` does not fit a `TimeDelta` or the clock mutex is
    /// poisoned.
    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Sleeper that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl Sleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Sleeper that records requested durations and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    /// Durations requested so far.
    ///
    /// # Panics
    /// Panics if the sleeper mutex is poisoned.
    #[must_use]
    pub fn recorded(&self) -> Vec<Duration> {
        match self.0.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => panic!("sleeper mutex"),
        }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let mut entries = match self.0.lock() {
            Ok(entries) => entries,
            Err(_) => panic!("sleeper mutex"),
        };
        entries.push(duration);
    }
}

/// Sleeper that advances a [`MutableClock`] instead of waiting.
#[derive(Debug)]
pub struct ClockAdvancingSleeper(pub std::sync::Arc<MutableClock>);

#[async_trait]
impl Sleeper for ClockAdvancingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.0.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Jitter that leaves TTLs untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl TtlJitter for NoJitter {
    fn jittered_ttl(&self, base: Duration) -> Duration {
        base
    }
}
