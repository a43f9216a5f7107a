//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the places endpoint, the health probes and the
//! response schemas. The document is served at `/api-docs/openapi.json` and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::OpenApi;

use crate::inbound::http::error::ErrorResponse;
use crate::inbound::http::places::{MapLinksResponse, PlaceResponse, PlacesResponse};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Places backend API",
        description = "Nearby OpenStreetMap places grouped into categories, plus health probes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::places::get_places,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(PlacesResponse, PlaceResponse, MapLinksResponse, ErrorResponse)),
    tags(
        (name = "places", description = "Nearby places lookups"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
