//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::metrics_exporter::MetricsExporter;
use crate::domain::ports::PlacesQuery;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Places use-case.
    pub places: Arc<dyn PlacesQuery>,
    /// Cache counter exporter, nudged after each places response.
    pub metrics: Option<Arc<MetricsExporter>>,
}

impl HttpState {
    /// State without a metrics exporter.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use places_backend::domain::ports::FixturePlacesQuery;
    /// use places_backend::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(Arc::new(FixturePlacesQuery));
    /// assert!(state.metrics.is_none());
    /// ```
    pub fn new(places: Arc<dyn PlacesQuery>) -> Self {
        Self {
            places,
            metrics: None,
        }
    }

    /// Attach a metrics exporter.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsExporter>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
