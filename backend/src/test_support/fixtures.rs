//! Element builders shared by unit and integration tests.

use std::collections::BTreeMap;

use crate::domain::geo::Coordinate;
use crate::domain::places::{ElementKind, RawElement};

/// Build a tag map from pairs.
#[must_use]
pub fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// Node at a point.
#[must_use]
pub fn node(id: i64, lat: f64, lon: f64, pairs: &[(&str, &str)]) -> RawElement {
    RawElement {
        point: Some(Coordinate::new(lat, lon)),
        tags: tags(pairs),
        ..RawElement::new(ElementKind::Node, id)
    }
}

/// Way described only by its outline.
#[must_use]
pub fn way_with_boundary(id: i64, points: &[(f64, f64)], pairs: &[(&str, &str)]) -> RawElement {
    RawElement {
        boundary_points: points
            .iter()
            .map(|(lat, lon)| Coordinate::new(*lat, *lon))
            .collect(),
        tags: tags(pairs),
        ..RawElement::new(ElementKind::Way, id)
    }
}

/// Element with tags but no usable geometry.
#[must_use]
pub fn unlocated(kind: ElementKind, id: i64, pairs: &[(&str, &str)]) -> RawElement {
    RawElement {
        tags: tags(pairs),
        ..RawElement::new(kind, id)
    }
}

/// `leisure=spa` node about 140 m from (35.36, 138.73).
#[must_use]
pub fn fuji_spa() -> RawElement {
    node(
        1001,
        35.361,
        138.731,
        &[("leisure", "spa"), ("name", "Fuji Onsen")],
    )
}

/// `tourism=hotel` way outlined around (35.365, 138.735).
#[must_use]
pub fn fuji_hotel() -> RawElement {
    way_with_boundary(
        2002,
        &[(35.364, 138.734), (35.366, 138.734), (35.365, 138.737)],
        &[("tourism", "hotel"), ("name", "Lakeside Hotel")],
    )
}
