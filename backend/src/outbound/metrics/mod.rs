//! Outbound adapters for cache counters and metrics collectors.
//!
//! [`LocalCacheCounters`] keeps hit/miss totals in process when no shared
//! cache exists. [`PushgatewaySink`] and [`StatsdSink`] receive the deltas the
//! exporter flushes.

mod local_counters;
mod prometheus_push;
mod statsd;

pub use local_counters::LocalCacheCounters;
pub use prometheus_push::{PushgatewayConfig, PushgatewaySink, render_exposition};
pub use statsd::{StatsdConfig, StatsdSink, render_statsd_lines};
