//! Nearby-places backend library.
//!
//! Aggregates OpenStreetMap points of interest around a coordinate through the
//! Overpass API, caches the raw batches in a process-local tier and an optional
//! shared Redis tier, and classifies the result into named buckets. The binary
//! in `main.rs` wires these modules into an Actix server.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
