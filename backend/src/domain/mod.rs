//! Domain primitives, ports and services for the nearby-places pipeline.
//!
//! Purpose: keep classification, caching and locking rules independent of
//! HTTP, Redis and Overpass. Adapters in `inbound` and `outbound` plug into
//! the traits in [`ports`].
//!
//! [`Error`] and [`ErrorCode`] are re-exported at this level along with the
//! request [`TraceId`].

pub mod aggregator;
pub mod batch_cache;
pub mod categories;
pub mod category_fetcher;
pub mod classification;
pub mod error;
pub mod geo;
pub mod lock;
pub mod metrics_exporter;
pub mod places;
pub mod places_service;
pub mod ports;
pub mod query_key;
pub mod runtime;
pub mod trace_id;

pub use self::error::{Error, ErrorCode};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use places_backend::domain::{ApiResult, Error};
///
/// fn radius(raw: &str) -> ApiResult<u32> {
///     raw.parse().map_err(|_| Error::invalid_request("radius must be a number"))
/// }
///
/// assert!(radius("500").is_ok());
/// ```
pub type ApiResult<T> = Result<T, Error>;
