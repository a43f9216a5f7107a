//! Best-effort, rate-limited export of cache hit/miss counters.
//!
//! Request handlers call [`MetricsExporter::maybe_flush`] after assembling a
//! response. At most one flush runs per process at a time and flushes are at
//! least `interval` apart. A flush reads the counters, pushes them to every
//! sink and, if any sink accepted them, subtracts the exported amounts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::ports::{CacheCounterStore, CounterSnapshot, CounterStoreError, MetricsSink};

/// Default minimum gap between flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);
/// Default bound on one flush.
pub const DEFAULT_FLUSH_BUDGET: Duration = Duration::from_secs(5);

/// Exporter tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsExporterConfig {
    /// Minimum gap between flushes.
    pub interval: Duration,
    /// Bound on one flush; kept below `interval`.
    pub budget: Duration,
}

impl Default for MetricsExporterConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_FLUSH_INTERVAL,
            budget: DEFAULT_FLUSH_BUDGET,
        }
    }
}

/// What a flush did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Counters were pushed and subtracted.
    Exported(CounterSnapshot),
    /// Counters were zero; nothing was pushed.
    NothingToExport,
}

/// Why a flush did not complete.
#[derive(Debug, Error)]
pub enum FlushError {
    /// Counters could not be read or decremented.
    #[error(transparent)]
    Counters(#[from] CounterStoreError),
    /// Every sink rejected the push.
    #[error("all {0} metrics sinks failed")]
    AllSinksFailed(usize),
    /// The flush ran past its budget.
    #[error("metrics flush exceeded {0:?}")]
    Timeout(Duration),
}

#[derive(Debug)]
struct FlushState {
    last_flush: DateTime<Utc>,
    in_flight: bool,
}

/// Clears the in-flight flag when a flush ends, however it ends.
struct InFlightGuard<'a> {
    state: &'a Mutex<FlushState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock_state(self.state).in_flight = false;
    }
}

fn lock_state(state: &Mutex<FlushState>) -> MutexGuard<'_, FlushState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide counter exporter.
pub struct MetricsExporter {
    counters: Arc<dyn CacheCounterStore>,
    sinks: Vec<Arc<dyn MetricsSink>>,
    clock: Arc<dyn Clock>,
    config: MetricsExporterConfig,
    state: Mutex<FlushState>,
}

impl MetricsExporter {
    /// Build an exporter. The first flush becomes due one interval after
    /// construction.
    pub fn new(
        counters: Arc<dyn CacheCounterStore>,
        sinks: Vec<Arc<dyn MetricsSink>>,
        clock: Arc<dyn Clock>,
        config: MetricsExporterConfig,
    ) -> Self {
        let budget = config.budget.min(config.interval / 2);
        let state = Mutex::new(FlushState {
            last_flush: clock.utc(),
            in_flight: false,
        });
        Self {
            counters,
            sinks,
            clock,
            config: MetricsExporterConfig { budget, ..config },
            state,
        }
    }

    /// Counter store shared with the request path.
    #[must_use]
    pub fn counters(&self) -> Arc<dyn CacheCounterStore> {
        Arc::clone(&self.counters)
    }

    /// Start a background flush if one is due and none is running.
    ///
    /// Returns whether a flush was started. Must be called inside a Tokio
    /// runtime.
    pub fn maybe_flush(self: &Arc<Self>) -> bool {
        if !self.try_begin() {
            return false;
        }
        let exporter = Arc::clone(self);
        tokio::spawn(async move {
            exporter.run_claimed_flush().await;
        });
        true
    }

    /// Run a flush now if one is due, waiting for it to finish.
    ///
    /// Returns `None` when the flush was skipped.
    pub async fn flush_if_due(&self) -> Option<Result<FlushOutcome, FlushError>> {
        if !self.try_begin() {
            return None;
        }
        Some(self.run_claimed_flush().await)
    }

    fn try_begin(&self) -> bool {
        let now = self.clock.utc();
        let mut state = lock_state(&self.state);
        if state.in_flight {
            return false;
        }
        let interval = TimeDelta::from_std(self.config.interval).unwrap_or(TimeDelta::MAX);
        if now - state.last_flush < interval {
            return false;
        }
        state.in_flight = true;
        state.last_flush = now;
        true
    }

    async fn run_claimed_flush(&self) -> Result<FlushOutcome, FlushError> {
        let _guard = InFlightGuard { state: &self.state };
        let result = match timeout(self.config.budget, self.export()).await {
            Ok(result) => result,
            Err(_) => Err(FlushError::Timeout(self.config.budget)),
        };
        match &result {
            Ok(FlushOutcome::Exported(snapshot)) => {
                debug!(hits = snapshot.hits, misses = snapshot.misses, "cache metrics exported");
            }
            Ok(FlushOutcome::NothingToExport) => debug!("no cache metrics to export"),
            Err(error) => warn!(%error, "cache metrics flush failed"),
        }
        result
    }

    async fn export(&self) -> Result<FlushOutcome, FlushError> {
        let snapshot = self.counters.snapshot().await?;
        if snapshot.is_empty() {
            return Ok(FlushOutcome::NothingToExport);
        }
        let mut delivered = 0_usize;
        for sink in &self.sinks {
            match sink.push(&snapshot).await {
                Ok(()) => delivered += 1,
                Err(error) => warn!(sink = sink.name(), %error, "metrics sink push failed"),
            }
        }
        if delivered == 0 {
            return Err(FlushError::AllSinksFailed(self.sinks.len()));
        }
        self.counters.subtract(&snapshot).await?;
        Ok(FlushOutcome::Exported(snapshot))
    }
}
