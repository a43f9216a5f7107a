//! Geographic helpers: great-circle distance, centroids and map links.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::places::ElementKind;

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

const GOOGLE_MAPS_SEARCH: &str = "https://www.google.com/maps/search/";
const OPENSTREETMAP_BASE: &str = "https://www.openstreetmap.org";

/// WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Finite, with latitude in `[-90, 90]` and longitude in `[-180, 180]`.
    #[must_use]
    pub fn is_on_globe(&self) -> bool {
        self.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Haversine distance between two coordinates, in metres.
#[must_use]
pub fn haversine_distance(from: Coordinate, to: Coordinate) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let delta_phi = (to.lat - from.lat).to_radians();
    let delta_lambda = (to.lon - from.lon).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Arithmetic mean of the finite points, or `None` when there are none.
///
/// Boundary rings are small relative to the Earth, so a planar mean is close
/// enough for distance sorting.
#[must_use]
pub fn centroid(points: &[Coordinate]) -> Option<Coordinate> {
    let (count, lat_sum, lon_sum) = points
        .iter()
        .filter(|point| point.is_finite())
        .fold((0_u32, 0.0_f64, 0.0_f64), |(count, lat, lon), point| {
            (count + 1, lat + point.lat, lon + point.lon)
        });
    if count == 0 {
        return None;
    }
    let count = f64::from(count);
    Some(Coordinate::new(lat_sum / count, lon_sum / count))
}

/// External map links for a place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLinks {
    /// Google Maps search link.
    pub google: String,
    /// OpenStreetMap element page.
    pub openstreetmap: String,
}

impl MapLinks {
    /// Build links for an element.
    ///
    /// Google links search by coordinate when one is known and fall back to
    /// the name (or the element reference) otherwise.
    #[must_use]
    pub fn for_element(
        kind: ElementKind,
        id: i64,
        coordinate: Option<Coordinate>,
        name: Option<&str>,
    ) -> Self {
        let search = match (coordinate, name) {
            (Some(point), _) => format!("{:.6},{:.6}", point.lat, point.lon),
            (None, Some(name)) => name.to_owned(),
            (None, None) => format!("{}/{id}", kind.as_str()),
        };
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("api", "1")
            .append_pair("query", &search)
            .finish();
        Self {
            google: format!("{GOOGLE_MAPS_SEARCH}?{query}"),
            openstreetmap: format!("{OPENSTREETMAP_BASE}/{}/{id}", kind.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for distance and centroid helpers.
    use rstest::rstest;

    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let point = Coordinate::new(35.36, 138.73);
        assert!(haversine_distance(point, point).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(Coordinate::new(35.361, 138.731), 130.0, 150.0)]
    #[case(Coordinate::new(35.37, 138.73), 1_100.0, 1_125.0)]
    #[case(Coordinate::new(36.36, 138.73), 111_000.0, 111_400.0)]
    fn distance_from_fuji_center(#[case] target: Coordinate, #[case] min: f64, #[case] max: f64) {
        let center = Coordinate::new(35.36, 138.73);
        let distance = haversine_distance(center, target);
        assert!(
            (min..=max).contains(&distance),
            "distance {distance} outside {min}..={max}"
        );
    }

    #[rstest]
    #[case(Coordinate::new(35.36, 138.73), true)]
    #[case(Coordinate::new(-90.0, 180.0), true)]
    #[case(Coordinate::new(95.0, 138.73), false)]
    #[case(Coordinate::new(35.36, -181.0), false)]
    #[case(Coordinate::new(f64::INFINITY, 0.0), false)]
    fn globe_bounds(#[case] point: Coordinate, #[case] expected: bool) {
        assert_eq!(point.is_on_globe(), expected);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(51.5, -0.12);
        let b = Coordinate::new(48.85, 2.35);
        let forward = haversine_distance(a, b);
        let backward = haversine_distance(b, a);
        assert!((forward - backward).abs() < 1e-6);
    }

    #[test]
    fn centroid_is_mean_of_points() {
        let points = [
            Coordinate::new(35.364, 138.734),
            Coordinate::new(35.366, 138.734),
            Coordinate::new(35.365, 138.737),
        ];
        let centre = centroid(&points).expect("centroid");
        assert!((centre.lat - 35.365).abs() < 1e-9);
        assert!((centre.lon - 138.735).abs() < 1e-9);
    }

    #[test]
    fn centroid_skips_non_finite_points() {
        let points = [Coordinate::new(f64::NAN, 1.0), Coordinate::new(2.0, 4.0)];
        assert_eq!(centroid(&points), Some(Coordinate::new(2.0, 4.0)));
    }

    #[test]
    fn centroid_of_nothing_is_none() {
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn links_use_coordinates_when_known() {
        let links = MapLinks::for_element(
            ElementKind::Node,
            42,
            Some(Coordinate::new(35.361, 138.731)),
            Some("Onsen"),
        );
        assert_eq!(
            links.google,
            "https://www.google.com/maps/search/?api=1&query=35.361000%2C138.731000"
        );
        assert_eq!(links.openstreetmap, "https://www.openstreetmap.org/node/42");
    }

    #[test]
    fn links_fall_back_to_name() {
        let links = MapLinks::for_element(ElementKind::Way, 7, None, Some("Lake Kawaguchi"));
        assert_eq!(
            links.google,
            "https://www.google.com/maps/search/?api=1&query=Lake+Kawaguchi"
        );
        assert_eq!(links.openstreetmap, "https://www.openstreetmap.org/way/7");
    }
}
