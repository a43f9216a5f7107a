//! Reqwest-backed Overpass source adapter.
//!
//! This adapter owns transport details only: request serialisation, timeout and
//! HTTP error mapping, and JSON decoding into domain elements. Query text comes
//! from the domain's category templates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::OverpassResponseDto;
use crate::domain::categories::CategoryQuery;
use crate::domain::geo::Coordinate;
use crate::domain::places::RawElement;
use crate::domain::ports::{OverpassCategorySource, OverpassSourceError};

/// Public Overpass interpreter used when no endpoint is configured.
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
const DEFAULT_OVERPASS_QUERY_TIMEOUT_SECONDS: u64 = 25;
const DEFAULT_USER_AGENT: &str = "places-backend/0.1";
const DEFAULT_CONTACT: &str = "ops@places.invalid";

/// Outbound identity and query timeout settings for Overpass requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassHttpIdentity {
    /// HTTP user-agent sent to Overpass.
    pub user_agent: String,
    /// Contact header value sent to Overpass.
    pub contact: String,
    /// Timeout directive embedded in Overpass query text.
    pub query_timeout_seconds: u64,
}

impl Default for OverpassHttpIdentity {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            contact: DEFAULT_CONTACT.to_owned(),
            query_timeout_seconds: DEFAULT_OVERPASS_QUERY_TIMEOUT_SECONDS,
        }
    }
}

/// Overpass source adapter that performs HTTP POST requests against one endpoint.
pub struct OverpassHttpSource {
    client: Client,
    endpoint: Url,
    user_agent: String,
    contact: String,
    query_timeout_seconds: u64,
}

impl OverpassHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_identity(endpoint, timeout, OverpassHttpIdentity::default())
    }

    /// Build an adapter with explicit outbound identity and query timeout.
    /// ```rust,ignore
    /// let source = OverpassHttpSource::with_identity(endpoint, timeout, identity);
    /// assert!(source.is_ok() || source.is_err());
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_identity(
        endpoint: Url,
        timeout: Duration,
        identity: OverpassHttpIdentity,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            user_agent: identity.user_agent,
            contact: identity.contact,
            query_timeout_seconds: identity.query_timeout_seconds.max(1),
        })
    }
}

#[async_trait]
impl OverpassCategorySource for OverpassHttpSource {
    async fn fetch_category(
        &self,
        category: &CategoryQuery,
        center: Coordinate,
        radius_meters: u32,
    ) -> Result<Vec<RawElement>, OverpassSourceError> {
        validate_center(center)?;
        let query = category.render(center, radius_meters, self.query_timeout_seconds);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .header("Contact", self.contact.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("data", query)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let elements = parse_elements(body.as_ref())?;
        debug!(
            category = category.id,
            bytes = body.len(),
            elements = elements.len(),
            "overpass category decoded"
        );
        Ok(elements)
    }
}

fn parse_elements(body: &[u8]) -> Result<Vec<RawElement>, OverpassSourceError> {
    let decoded: OverpassResponseDto = serde_json::from_slice(body).map_err(|error| {
        OverpassSourceError::decode(format!("invalid Overpass JSON payload: {error}"))
    })?;
    Ok(decoded.into_domain_elements())
}

fn validate_center(center: Coordinate) -> Result<(), OverpassSourceError> {
    if !center.is_finite() {
        return Err(OverpassSourceError::invalid_request(
            "centre must contain finite coordinates",
        ));
    }
    if !(-90.0..=90.0).contains(&center.lat) {
        return Err(OverpassSourceError::invalid_request(
            "latitude must be within [-90, 90]",
        ));
    }
    if !(-180.0..=180.0).contains(&center.lon) {
        return Err(OverpassSourceError::invalid_request(
            "longitude must be within [-180, 180]",
        ));
    }
    Ok(())
}

fn map_transport_error(error: reqwest::Error) -> OverpassSourceError {
    if error.is_timeout() {
        OverpassSourceError::timeout(error.to_string())
    } else {
        OverpassSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> OverpassSourceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => OverpassSourceError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            OverpassSourceError::timeout(message)
        }
        _ if status.is_client_error() => OverpassSourceError::invalid_request(message),
        _ => OverpassSourceError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network Overpass mapping helpers.

    use super::*;
    use crate::domain::places::ElementKind;
    use rstest::rstest;

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS)]
    fn too_many_requests_is_rate_limited(#[case] status: StatusCode) {
        let error = map_status_error(status, b"rate limited");
        assert!(matches!(error, OverpassSourceError::RateLimited { .. }));
    }

    #[rstest]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT)]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT)]
    fn timeout_statuses_map_to_timeout(#[case] status: StatusCode) {
        let error = map_status_error(status, b"");
        assert!(matches!(error, OverpassSourceError::Timeout { .. }));
        assert_eq!(
            error.to_string(),
            format!("overpass timeout: status {}", status.as_u16())
        );
    }

    #[rstest]
    #[case::bad_request(StatusCode::BAD_REQUEST, true)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, false)]
    #[case::bad_gateway(StatusCode::BAD_GATEWAY, false)]
    fn other_statuses_split_by_class(#[case] status: StatusCode, #[case] client_error: bool) {
        let error = map_status_error(status, b"{\"remark\":\"backend unavailable\"}");
        if client_error {
            assert!(matches!(error, OverpassSourceError::InvalidRequest { .. }));
        } else {
            assert!(matches!(error, OverpassSourceError::Transport { .. }));
        }
    }

    #[test]
    fn body_preview_is_compacted_and_truncated() {
        let long = format!("line one\n\n   {}", "x".repeat(200));
        let preview = body_preview(long.as_bytes());
        assert!(preview.starts_with("line one x"));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 163);
    }

    #[test]
    fn parses_points_centres_and_geometry() {
        let body = r#"{
            "elements": [
                {
                    "type": "node",
                    "id": 101,
                    "lat": 35.361,
                    "lon": 138.731,
                    "tags": { "natural": "hot_spring" }
                },
                {
                    "type": "way",
                    "id": 102,
                    "center": { "lat": 35.37, "lon": 138.74 },
                    "tags": { "tourism": "hotel" }
                },
                {
                    "type": "way",
                    "id": 103,
                    "geometry": [
                        { "lat": 35.30, "lon": 138.70 },
                        null,
                        { "lat": 35.31, "lon": 138.71 }
                    ],
                    "tags": { "waterway": "stream" }
                }
            ]
        }"#;

        let elements = parse_elements(body.as_bytes()).expect("JSON should decode");

        assert_eq!(elements.len(), 3);
        let node = elements.first().expect("node");
        assert_eq!(node.kind, ElementKind::Node);
        assert_eq!(node.point, Some(Coordinate::new(35.361, 138.731)));
        let way = elements.get(1).expect("way");
        assert_eq!(way.centroid, Some(Coordinate::new(35.37, 138.74)));
        let stream = elements.get(2).expect("stream");
        assert_eq!(stream.boundary_points.len(), 2);
        assert_eq!(stream.tag("waterway"), Some("stream"));
    }

    #[test]
    fn keeps_elements_without_coordinates() {
        let body = r#"{ "elements": [ { "type": "relation", "id": 7 } ] }"#;

        let elements = parse_elements(body.as_bytes()).expect("JSON should decode");

        assert_eq!(elements, vec![RawElement::new(ElementKind::Relation, 7)]);
    }

    #[test]
    fn empty_document_has_no_elements() {
        let elements = parse_elements(b"{}").expect("JSON should decode");
        assert!(elements.is_empty());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let error = parse_elements(b"<html>busy</html>").expect_err("decode should fail");
        assert!(matches!(error, OverpassSourceError::Decode { .. }));
    }

    #[rstest]
    #[case(Coordinate::new(f64::NAN, 0.0))]
    #[case(Coordinate::new(91.0, 0.0))]
    #[case(Coordinate::new(0.0, -181.0))]
    fn rejects_centres_outside_wgs84(#[case] center: Coordinate) {
        let error = validate_center(center).expect_err("centre must fail");
        assert!(matches!(error, OverpassSourceError::InvalidRequest { .. }));
    }
}
