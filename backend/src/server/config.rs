//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use places_backend::domain::metrics_exporter::MetricsExporter;
use places_backend::domain::ports::PlacesQuery;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) places: Arc<dyn PlacesQuery>,
    pub(crate) metrics: Option<Arc<MetricsExporter>>,
}

impl ServerConfig {
    /// Construct a server configuration around the places use-case.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, places: Arc<dyn PlacesQuery>) -> Self {
        Self {
            bind_addr,
            places,
            metrics: None,
        }
    }

    /// Attach the cache counter exporter flushed from the request path.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Option<Arc<MetricsExporter>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Return the socket address the server will bind to.
    #[cfg_attr(
        not(test),
        expect(dead_code, reason = "Exercised by bootstrap tests")
    )]
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
