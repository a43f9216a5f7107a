//! Port for external metrics collectors receiving cache counters.
use async_trait::async_trait;

use super::{CounterSnapshot, define_port_error};

define_port_error! {
    /// Errors surfaced while pushing metrics.
    pub enum MetricsSinkError {
        /// The payload could not be rendered.
        Encode { message: String } => "metrics encoding failed: {message}",
        /// The collector could not be reached or rejected the push.
        Push { message: String } => "metrics push failed: {message}",
    }
}

/// Destination for exported counter deltas.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Push the counter deltas.
    async fn push(&self, snapshot: &CounterSnapshot) -> Result<(), MetricsSinkError>;
}
