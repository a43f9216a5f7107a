//! DTOs for decoding Overpass JSON responses.
//!
//! The adapter decodes into these transport DTOs first, then maps into domain
//! elements (`RawElement`) in one pass. Elements without any coordinates are
//! kept; the domain decides how to present them.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::geo::Coordinate;
use crate::domain::places::{ElementKind, RawElement};

#[derive(Debug, Deserialize)]
pub(super) struct OverpassResponseDto {
    #[serde(default)]
    pub(super) elements: Vec<OverpassElementDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OverpassElementDto {
    #[serde(rename = "type")]
    pub(super) kind: ElementKind,
    pub(super) id: i64,
    pub(super) lat: Option<f64>,
    pub(super) lon: Option<f64>,
    pub(super) center: Option<OverpassPointDto>,
    #[serde(default)]
    pub(super) geometry: Vec<Option<OverpassPointDto>>,
    #[serde(default)]
    pub(super) tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(super) struct OverpassPointDto {
    pub(super) lat: f64,
    pub(super) lon: f64,
}

impl OverpassPointDto {
    fn into_coordinate(self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat, self.lon)).filter(Coordinate::is_finite)
    }
}

impl OverpassResponseDto {
    pub(super) fn into_domain_elements(self) -> Vec<RawElement> {
        self.elements
            .into_iter()
            .map(OverpassElementDto::into_domain_element)
            .collect()
    }
}

impl OverpassElementDto {
    fn into_domain_element(self) -> RawElement {
        let point = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)).filter(Coordinate::is_finite),
            _ => None,
        };
        RawElement {
            kind: self.kind,
            id: self.id,
            point,
            centroid: self.center.and_then(OverpassPointDto::into_coordinate),
            boundary_points: self
                .geometry
                .into_iter()
                .flatten()
                .filter_map(OverpassPointDto::into_coordinate)
                .collect(),
            tags: self.tags,
        }
    }
}
