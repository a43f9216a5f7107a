//! Prometheus Pushgateway adapter for cache counter deltas.
//!
//! Each flush renders a fresh registry holding two counters and POSTs its
//! text exposition to `{gateway}/metrics/job/{job}/instance/{instance}`.
//!
//! # Metric Specification
//!
//! - **Names**: `cache_hit`, `cache_miss`
//! - **Type**: Counter (value is the delta since the previous flush)
//! - **Labels**: `job`, `instance`

use std::time::Duration;

use async_trait::async_trait;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use reqwest::{Client, Url};

use crate::domain::ports::{CacheCounter, CounterSnapshot, MetricsSink, MetricsSinkError};

/// Pushgateway target and grouping labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushgatewayConfig {
    /// Base URL, e.g. `http://pushgateway:9091`.
    pub gateway: Url,
    /// `job` grouping label.
    pub job: String,
    /// `instance` grouping label.
    pub instance: String,
    /// Bound on one push.
    pub timeout: Duration,
}

/// Render the text exposition for one snapshot.
///
/// # Errors
///
/// Returns an error when a label or metric name is rejected by the
/// `prometheus` crate.
pub fn render_exposition(
    snapshot: &CounterSnapshot,
    job: &str,
    instance: &str,
) -> Result<String, prometheus::Error> {
    let registry = Registry::new();
    for (counter, value, help) in [
        (CacheCounter::Hit, snapshot.hits, "Places batch cache hits"),
        (CacheCounter::Miss, snapshot.misses, "Places batch cache misses"),
    ] {
        let metric = IntCounter::with_opts(
            Opts::new(counter.as_str(), help)
                .const_label("job", job)
                .const_label("instance", instance),
        )?;
        metric.inc_by(value);
        registry.register(Box::new(metric))?;
    }
    TextEncoder::new().encode_to_string(&registry.gather())
}

/// [`MetricsSink`] pushing to a Prometheus Pushgateway.
pub struct PushgatewaySink {
    client: Client,
    endpoint: Url,
    job: String,
    instance: String,
}

impl PushgatewaySink {
    /// Build the sink.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsSinkError::Encode`] when the gateway URL cannot carry
    /// path segments, or [`MetricsSinkError::Push`] when the HTTP client
    /// cannot be built.
    pub fn new(config: PushgatewayConfig) -> Result<Self, MetricsSinkError> {
        let endpoint = grouping_url(&config.gateway, &config.job, &config.instance)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| MetricsSinkError::push(error.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            job: config.job,
            instance: config.instance,
        })
    }

    /// Fully resolved push URL.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn grouping_url(gateway: &Url, job: &str, instance: &str) -> Result<Url, MetricsSinkError> {
    let mut url = gateway.clone();
    url.path_segments_mut()
        .map_err(|()| MetricsSinkError::encode(format!("{gateway} cannot be a base URL")))?
        .pop_if_empty()
        .extend(["metrics", "job", job, "instance", instance]);
    Ok(url)
}

#[async_trait]
impl MetricsSink for PushgatewaySink {
    fn name(&self) -> &'static str {
        "pushgateway"
    }

    async fn push(&self, snapshot: &CounterSnapshot) -> Result<(), MetricsSinkError> {
        let body = render_exposition(snapshot, &self.job, &self.instance)
            .map_err(|error| MetricsSinkError::encode(error.to_string()))?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, TextEncoder::new().format_type())
            .body(body)
            .send()
            .await
            .map_err(|error| MetricsSinkError::push(error.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(MetricsSinkError::push(format!(
                "pushgateway answered {}",
                status.as_u16()
            )))
        }
    }
}
