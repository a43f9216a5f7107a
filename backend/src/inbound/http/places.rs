//! Nearby places endpoint.
//!
//! ```text
//! GET /places?lat=35.36&lng=138.73&radius=5000
//! ```
//!
//! `lat` and `lng` must be finite numbers. `radius` is optional: anything
//! missing, non-numeric or non-positive falls back to the default, and large
//! values are clamped.

use std::collections::BTreeMap;

use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::domain::geo::Coordinate;
use crate::domain::places::{CategorizedPlaces, EnrichedPlace};
use crate::domain::ports::PlacesRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::public_five_minutes_header;
use crate::inbound::http::error::ErrorResponse;
use crate::inbound::http::state::HttpState;

/// Radius used when the query omits a usable one.
pub const DEFAULT_RADIUS_METERS: u32 = 20_000;
/// Largest radius forwarded upstream.
pub const MAX_RADIUS_METERS: u32 = 50_000;

/// Raw query string; parsed by hand so bad values map to the documented
/// fallbacks instead of extractor errors.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlacesParams {
    /// Latitude of the search centre.
    #[param(example = "35.36")]
    pub lat: Option<String>,
    /// Longitude of the search centre.
    #[param(example = "138.73")]
    pub lng: Option<String>,
    /// Search radius in metres; defaults to 20000, clamped to 50000.
    #[param(example = "5000")]
    pub radius: Option<String>,
}

fn parse_coordinate(raw: Option<&str>, name: &str) -> Result<f64, Error> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::invalid_request("lat and lng query parameters are required"))?;
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| Error::invalid_request(format!("{name} must be a finite number")))
}

/// Resolve the radius query value.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to 1..=MAX_RADIUS_METERS before the cast"
)]
pub fn parse_radius(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .map_or(DEFAULT_RADIUS_METERS, |value| {
            value.round().clamp(1.0, f64::from(MAX_RADIUS_METERS)) as u32
        })
}

impl PlacesParams {
    /// Validate into a domain request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::invalid_request`] when `lat` or `lng` is missing or
    /// not a finite number.
    pub fn into_request(self) -> Result<PlacesRequest, Error> {
        let lat = parse_coordinate(self.lat.as_deref(), "lat")?;
        let lon = parse_coordinate(self.lng.as_deref(), "lng")?;
        Ok(PlacesRequest {
            center: Coordinate::new(lat, lon),
            radius_meters: parse_radius(self.radius.as_deref()),
        })
    }
}

/// External map links for one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MapLinksResponse {
    /// Google Maps search URL.
    #[schema(example = "https://www.google.com/maps/search/?api=1&query=35.361000%2C138.731000")]
    pub google: String,
    /// OpenStreetMap element page.
    #[schema(example = "https://www.openstreetmap.org/node/1001")]
    pub openstreetmap: String,
}

/// One place in a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    /// Element reference such as `node/1001`.
    #[schema(example = "node/1001")]
    pub id: String,
    /// `node`, `way` or `relation`.
    #[schema(example = "node")]
    pub kind: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Latitude of the representative coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude of the representative coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// OSM tags.
    pub tags: BTreeMap<String, String>,
    /// Great-circle distance from the query centre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    /// External map links.
    pub map_links: MapLinksResponse,
    /// Photo or thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl From<EnrichedPlace> for PlaceResponse {
    fn from(place: EnrichedPlace) -> Self {
        Self {
            id: place.id,
            kind: place.kind.as_str().to_owned(),
            name: place.name,
            lat: place.coordinate.map(|coordinate| coordinate.lat),
            lon: place.coordinate.map(|coordinate| coordinate.lon),
            tags: place.tags,
            distance_meters: place.distance_meters,
            map_links: MapLinksResponse {
                google: place.map_links.google,
                openstreetmap: place.map_links.openstreetmap,
            },
            photo_url: place.photo_url,
        }
    }
}

/// Successful places response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlacesResponse {
    /// Always `true`.
    pub ok: bool,
    /// Places keyed by bucket; every bucket is present.
    pub data: BTreeMap<String, Vec<PlaceResponse>>,
}

impl From<CategorizedPlaces> for PlacesResponse {
    fn from(places: CategorizedPlaces) -> Self {
        Self {
            ok: true,
            data: places
                .into_inner()
                .into_iter()
                .map(|(bucket, items)| (bucket, items.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }
}

/// Categorised places around a point.
#[utoipa::path(
    get,
    path = "/places",
    params(PlacesParams),
    description = "Aggregate OpenStreetMap places around a point into categories ordered by distance.",
    responses(
        (
            status = 200,
            description = "Places grouped by category",
            headers(("Cache-Control" = String, description = "public, max-age=300")),
            body = PlacesResponse
        ),
        (status = 400, description = "Missing or malformed coordinates", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tags = ["places"],
    operation_id = "getPlaces"
)]
#[get("/places")]
pub async fn get_places(
    state: web::Data<HttpState>,
    params: web::Query<PlacesParams>,
) -> ApiResult<HttpResponse> {
    let request = params.into_inner().into_request()?;
    let places = state.places.places_near(request).await;
    let body = serde_json::to_vec(&PlacesResponse::from(places))
        .map_err(|err| Error::internal(format!("failed to encode places response: {err}")))?;

    if state
        .metrics
        .as_ref()
        .is_some_and(|metrics| metrics.maybe_flush())
    {
        debug!("metrics flush scheduled");
    }

    Ok(HttpResponse::Ok()
        .insert_header(public_five_minutes_header())
        .content_type("application/json")
        .body(body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::domain::ports::MockPlacesQuery;

    #[rstest]
    #[case(None, DEFAULT_RADIUS_METERS)]
    #[case(Some(""), DEFAULT_RADIUS_METERS)]
    #[case(Some("abc"), DEFAULT_RADIUS_METERS)]
    #[case(Some("0"), DEFAULT_RADIUS_METERS)]
    #[case(Some("-5"), DEFAULT_RADIUS_METERS)]
    #[case(Some("NaN"), DEFAULT_RADIUS_METERS)]
    #[case(Some("5000"), 5000)]
    #[case(Some(" 1500.4 "), 1500)]
    #[case(Some("0.2"), 1)]
    #[case(Some("90000"), MAX_RADIUS_METERS)]
    #[case(Some("inf"), DEFAULT_RADIUS_METERS)]
    fn radius_falls_back_and_clamps(#[case] raw: Option<&str>, #[case] expected: u32) {
        assert_eq!(parse_radius(raw), expected);
    }

    #[rstest]
    #[case(None, Some("138.73"))]
    #[case(Some("35.36"), None)]
    #[case(Some("north"), Some("138.73"))]
    #[case(Some("35.36"), Some("inf"))]
    #[case(Some("  "), Some("138.73"))]
    fn bad_coordinates_are_rejected(#[case] lat: Option<&str>, #[case] lng: Option<&str>) {
        let params = PlacesParams {
            lat: lat.map(str::to_owned),
            lng: lng.map(str::to_owned),
            radius: None,
        };
        let error = params.into_request().expect_err("invalid coordinates");
        assert_eq!(error.code(), crate::domain::ErrorCode::InvalidRequest);
    }

    #[test]
    fn valid_params_build_a_request() {
        let params = PlacesParams {
            lat: Some("35.36".to_owned()),
            lng: Some("138.73".to_owned()),
            radius: Some("5000".to_owned()),
        };
        let request = params.into_request().expect("valid");
        assert_eq!(request.center, Coordinate::new(35.36, 138.73));
        assert_eq!(request.radius_meters, 5000);
    }

    #[actix_web::test]
    async fn responds_with_buckets_and_cache_header() {
        let mut query = MockPlacesQuery::new();
        query
            .expect_places_near()
            .withf(|request| request.radius_meters == DEFAULT_RADIUS_METERS)
            .times(1)
            .returning(|_| CategorizedPlaces::with_buckets(["hot_springs", "other"]));
        let state = HttpState::new(Arc::new(query));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(get_places),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/places?lat=35.36&lng=138.73")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("cache-control")
                .and_then(|value| value.to_str().ok()),
            Some("public, max-age=300")
        );
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({"ok": true, "data": {"hot_springs": [], "other": []}})
        );
    }

    #[actix_web::test]
    async fn missing_coordinates_return_400_without_calling_the_service() {
        let mut query = MockPlacesQuery::new();
        query.expect_places_near().never();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::new(Arc::new(query))))
                .service(get_places),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/places?lng=138.73").to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(response).await;
        assert!(body.get("error").and_then(Value::as_str).is_some());
        assert!(body.get("ok").is_none());
    }
}
