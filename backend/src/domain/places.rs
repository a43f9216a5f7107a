//! Place records: raw upstream elements, cached batches and enriched output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo::{Coordinate, MapLinks, centroid};

/// Upstream element geometry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Single point.
    Node,
    /// Ordered list of nodes (line or closed ring).
    Way,
    /// Group of members.
    Relation,
}

impl ElementKind {
    /// Lowercase name as used in element references.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

/// Element as returned by the upstream geodata service.
///
/// Any of the coordinate sources may be missing. An element with none of them
/// is still a valid record; it simply has no distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    /// Geometry type.
    pub kind: ElementKind,
    /// Upstream identifier, unique per kind.
    pub id: i64,
    /// Node position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<Coordinate>,
    /// Upstream-computed centre for ways and relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<Coordinate>,
    /// Outline points for ways.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boundary_points: Vec<Coordinate>,
    /// OSM tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl RawElement {
    /// Create an element with no geometry and no tags.
    #[must_use]
    pub const fn new(kind: ElementKind, id: i64) -> Self {
        Self {
            kind,
            id,
            point: None,
            centroid: None,
            boundary_points: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Representative coordinate: point, then centroid, then the mean of the
    /// boundary points.
    #[must_use]
    pub fn representative_coordinate(&self) -> Option<Coordinate> {
        self.point
            .filter(Coordinate::is_finite)
            .or_else(|| self.centroid.filter(Coordinate::is_finite))
            .or_else(|| centroid(&self.boundary_points))
    }

    /// Tag value by key.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Display name, preferring `name` over `name:en`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.tag("name")
            .or_else(|| self.tag("name:en"))
            .filter(|name| !name.trim().is_empty())
    }

    /// Reference such as `node/123`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.id)
    }
}

/// Result of one multi-category fetch, replaced wholesale in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedBatch {
    /// Elements in category order.
    pub elements: Vec<RawElement>,
    /// When the upstream fetch completed.
    pub fetched_at: DateTime<Utc>,
}

/// A place ready for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPlace {
    /// Element reference, e.g. `way/99`.
    pub id: String,
    /// Geometry type.
    pub kind: ElementKind,
    /// Display name.
    pub name: Option<String>,
    /// Representative coordinate.
    pub coordinate: Option<Coordinate>,
    /// OSM tags.
    pub tags: BTreeMap<String, String>,
    /// Distance from the query centre in metres.
    pub distance_meters: Option<f64>,
    /// External map links.
    pub map_links: MapLinks,
    /// Thumbnail or photo URL.
    pub photo_url: Option<String>,
}

/// Places grouped by bucket name. Every configured bucket is present, even
/// when empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedPlaces {
    buckets: BTreeMap<String, Vec<EnrichedPlace>>,
}

impl CategorizedPlaces {
    /// Create the map with an empty entry for each bucket name.
    pub fn with_buckets<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let buckets = names
            .into_iter()
            .map(|name| (name.to_owned(), Vec::new()))
            .collect();
        Self { buckets }
    }

    /// Append a place to a bucket, creating the bucket if needed.
    pub fn push(&mut self, bucket: &str, place: EnrichedPlace) {
        self.buckets.entry(bucket.to_owned()).or_default().push(place);
    }

    /// Places in one bucket.
    #[must_use]
    pub fn bucket(&self, name: &str) -> Option<&[EnrichedPlace]> {
        self.buckets.get(name).map(Vec::as_slice)
    }

    /// Iterate buckets in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[EnrichedPlace])> {
        self.buckets
            .iter()
            .map(|(name, places)| (name.as_str(), places.as_slice()))
    }

    /// Total number of places across buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// `true` when no bucket holds a place.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn buckets_mut(&mut self) -> impl Iterator<Item = &mut Vec<EnrichedPlace>> {
        self.buckets.values_mut()
    }

    /// Consume into the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Vec<EnrichedPlace>> {
        self.buckets
    }
}
