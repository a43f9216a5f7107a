//! Driven port for fetching one category of places from Overpass.
//!
//! The domain owns the category templates and the element model; adapters
//! only translate them to and from the wire.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::categories::CategoryQuery;
use crate::domain::geo::Coordinate;
use crate::domain::places::RawElement;

define_port_error! {
    /// Errors surfaced while calling Overpass.
    pub enum OverpassSourceError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "overpass transport failed: {message}",
        /// Overpass call exceeded its timeout.
        Timeout { message: String } =>
            "overpass timeout: {message}",
        /// Overpass rate-limited the request.
        RateLimited { message: String } =>
            "overpass rate limited request: {message}",
        /// Overpass response could not be decoded.
        Decode { message: String } =>
            "overpass response decode failed: {message}",
        /// Overpass rejected the query.
        InvalidRequest { message: String } =>
            "overpass request invalid: {message}",
    }
}

/// Port for querying Overpass one category at a time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverpassCategorySource: Send + Sync {
    /// Fetch the elements of one category around `center`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use places_backend::domain::categories::DEFAULT_CATEGORIES;
    /// use places_backend::domain::geo::Coordinate;
    /// use places_backend::domain::ports::{
    ///     FixtureOverpassCategorySource, OverpassCategorySource,
    /// };
    ///
    /// let source = FixtureOverpassCategorySource;
    /// let elements = source
    ///     .fetch_category(&DEFAULT_CATEGORIES[0], Coordinate::new(35.36, 138.73), 5000)
    ///     .await?;
    /// assert!(elements.is_empty());
    /// # Ok::<(), places_backend::domain::ports::OverpassSourceError>(())
    /// ```
    async fn fetch_category(
        &self,
        category: &CategoryQuery,
        center: Coordinate,
        radius_meters: u32,
    ) -> Result<Vec<RawElement>, OverpassSourceError>;
}

/// Fixture implementation returning no elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureOverpassCategorySource;

#[async_trait]
impl OverpassCategorySource for FixtureOverpassCategorySource {
    async fn fetch_category(
        &self,
        _category: &CategoryQuery,
        _center: Coordinate,
        _radius_meters: u32,
    ) -> Result<Vec<RawElement>, OverpassSourceError> {
        Ok(Vec::new())
    }
}
