//! Driving port consumed by inbound adapters to answer places requests.
use async_trait::async_trait;

use crate::domain::geo::Coordinate;
use crate::domain::places::CategorizedPlaces;

/// Validated places request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacesRequest {
    /// Query centre.
    pub center: Coordinate,
    /// Search radius in metres.
    pub radius_meters: u32,
}

/// Aggregate-and-classify use-case.
///
/// Every degraded dependency is absorbed inside the implementation, so the
/// operation has no error path of its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlacesQuery: Send + Sync {
    /// Categorised places around the request centre.
    async fn places_near(&self, request: PlacesRequest) -> CategorizedPlaces;
}

/// Fixture returning an empty result with no buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixturePlacesQuery;

#[async_trait]
impl PlacesQuery for FixturePlacesQuery {
    async fn places_near(&self, _request: PlacesRequest) -> CategorizedPlaces {
        CategorizedPlaces::default()
    }
}
