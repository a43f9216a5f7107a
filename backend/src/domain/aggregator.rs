//! Turns raw elements into categorised, distance-ordered places.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::debug;

use super::classification::Classifier;
use super::geo::{Coordinate, MapLinks, haversine_distance};
use super::places::{CategorizedPlaces, ElementKind, EnrichedPlace, RawElement};
use super::ports::PhotoResolver;

/// Default number of photo lookups in flight per request.
pub const DEFAULT_PHOTO_CONCURRENCY: usize = 4;
/// Default bound on a single photo lookup.
pub const DEFAULT_PHOTO_TIMEOUT: Duration = Duration::from_secs(3);

/// Where a place's photo comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// A URL usable as is.
    Direct(String),
    /// A Commons file reference needing a thumbnail lookup.
    CommonsFile(String),
    /// No photo information.
    Absent,
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

fn is_commons_file(value: &str) -> bool {
    value.starts_with("File:") || value.starts_with("Image:")
}

/// Photo source from tags: an `image` URL first, then a `wikimedia_commons`
/// URL, then a Commons file reference from either tag.
pub fn photo_source(element: &RawElement) -> PhotoSource {
    let image = element.tag("image").map(str::trim);
    let commons = element.tag("wikimedia_commons").map(str::trim);

    if let Some(url) = image.filter(|value| is_http_url(value)) {
        return PhotoSource::Direct(url.to_owned());
    }
    if let Some(url) = commons.filter(|value| is_http_url(value)) {
        return PhotoSource::Direct(url.to_owned());
    }
    commons
        .into_iter()
        .chain(image)
        .find(|value| is_commons_file(value))
        .map_or(PhotoSource::Absent, |file| {
            PhotoSource::CommonsFile(file.to_owned())
        })
}

/// Enrich one element relative to `center`.
#[must_use]
pub fn enrich(element: &RawElement, center: Coordinate, photo_url: Option<String>) -> EnrichedPlace {
    let coordinate = element.representative_coordinate();
    let name = element.name();
    EnrichedPlace {
        id: element.reference(),
        kind: element.kind,
        name: name.map(str::to_owned),
        coordinate,
        tags: element.tags.clone(),
        distance_meters: coordinate.map(|point| haversine_distance(center, point)),
        map_links: MapLinks::for_element(element.kind, element.id, coordinate, name),
        photo_url,
    }
}

/// Sort a bucket: located places by ascending distance, then unlocated places
/// in their original order.
pub fn order_bucket(places: &mut [EnrichedPlace]) {
    places.sort_by(|a, b| match (a.distance_meters, b.distance_meters) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Photo lookup limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Lookups in flight per request.
    pub photo_concurrency: usize,
    /// Bound on one lookup.
    pub photo_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            photo_concurrency: DEFAULT_PHOTO_CONCURRENCY,
            photo_timeout: DEFAULT_PHOTO_TIMEOUT,
        }
    }
}

/// Merges, enriches and classifies elements.
pub struct PlaceAggregator {
    classifier: Arc<Classifier>,
    photos: Arc<dyn PhotoResolver>,
    config: AggregatorConfig,
}

impl PlaceAggregator {
    /// Build an aggregator.
    pub fn new(
        classifier: Arc<Classifier>,
        photos: Arc<dyn PhotoResolver>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            classifier,
            photos,
            config,
        }
    }

    /// Categorise `elements` around `center`.
    ///
    /// Elements repeated across categories are kept once, at their first
    /// occurrence. Every bucket the classifier knows is present in the output.
    pub async fn aggregate(&self, elements: &[RawElement], center: Coordinate) -> CategorizedPlaces {
        let mut seen: HashSet<(ElementKind, i64)> = HashSet::with_capacity(elements.len());
        let unique: Vec<&RawElement> = elements
            .iter()
            .filter(|element| seen.insert((element.kind, element.id)))
            .collect();
        let photos = self.resolve_photos(&unique).await;

        let mut places = CategorizedPlaces::with_buckets(self.classifier.bucket_names());
        for (element, photo_url) in unique.into_iter().zip(photos) {
            let bucket = self.classifier.classify(&element.tags);
            places.push(bucket, enrich(element, center, photo_url));
        }
        for bucket in places.buckets_mut() {
            order_bucket(bucket);
        }
        places
    }

    async fn resolve_photos(&self, elements: &[&RawElement]) -> Vec<Option<String>> {
        let lookups: Vec<_> = elements
            .iter()
            .map(|element| self.resolve_one(photo_source(element)))
            .collect();
        stream::iter(lookups)
            .buffered(self.config.photo_concurrency.max(1))
            .collect()
            .await
    }

    async fn resolve_one(&self, source: PhotoSource) -> Option<String> {
        match source {
            PhotoSource::Direct(url) => Some(url),
            PhotoSource::CommonsFile(file) => self.lookup(&file).await,
            PhotoSource::Absent => None,
        }
    }

    async fn lookup(&self, file: &str) -> Option<String> {
        match timeout(self.config.photo_timeout, self.photos.thumbnail_url(file)).await {
            Ok(Ok(url)) => url,
            Ok(Err(error)) => {
                debug!(file, %error, "photo lookup failed");
                None
            }
            Err(_) => {
                debug!(file, "photo lookup timed out");
                None
            }
        }
    }
}
