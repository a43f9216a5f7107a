//! Overpass outbound adapters.
//!
//! This module provides a thin HTTP implementation of the
//! `OverpassCategorySource` port.

mod dto;
mod http_source;

pub use http_source::{DEFAULT_OVERPASS_ENDPOINT, OverpassHttpIdentity, OverpassHttpSource};
