//! Tests for the server bootstrap: wiring from settings, routing and readiness.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test as actix_test, web};
use rstest::{fixture, rstest};

use super::*;
use places_backend::domain::ports::FixturePlacesQuery;
use places_backend::settings::PlacesSettings;

#[fixture]
fn health_state() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

#[fixture]
fn local_settings() -> PlacesSettings {
    PlacesSettings {
        bind_addr: Some("127.0.0.1:0".to_owned()),
        photos_enabled: false,
        ..PlacesSettings::default()
    }
}

fn fixture_config() -> ServerConfig {
    let bind_addr = "127.0.0.1:0".parse().expect("valid address");
    ServerConfig::new(bind_addr, Arc::new(FixturePlacesQuery))
}

#[rstest]
fn local_only_settings_build_without_exporter(local_settings: PlacesSettings) {
    let stack = build_places_stack(&local_settings).expect("stack builds");
    assert!(stack.exporter.is_none());
}

#[rstest]
fn statsd_host_enables_the_exporter(local_settings: PlacesSettings) {
    let settings = PlacesSettings {
        statsd_host: Some("127.0.0.1".to_owned()),
        ..local_settings
    };
    let stack = build_places_stack(&settings).expect("stack builds");
    assert!(stack.exporter.is_some());
}

#[rstest]
#[case(PlacesSettings { lock_strategy: Some("raft".to_owned()), ..PlacesSettings::default() })]
#[case(PlacesSettings { overpass_endpoint: Some("not a url".to_owned()), ..PlacesSettings::default() })]
#[case(PlacesSettings { pushgateway_url: Some("::".to_owned()), ..PlacesSettings::default() })]
fn malformed_settings_fail_startup(#[case] settings: PlacesSettings) {
    assert!(build_places_stack(&settings).is_err());
}

#[rstest]
#[actix_rt::test]
async fn create_server_marks_ready(health_state: web::Data<HealthState>) {
    assert!(!health_state.is_ready(), "state should start unready");

    let config = fixture_config();
    assert_eq!(config.bind_addr().port(), 0);
    let _server = create_server(health_state.clone(), config).expect("server should build");

    assert!(
        health_state.is_ready(),
        "server creation should mark readiness"
    );
}

#[rstest]
#[actix_rt::test]
async fn app_serves_places_probes_and_openapi(health_state: web::Data<HealthState>) {
    health_state.mark_ready();
    let http_state = web::Data::new(build_http_state(&fixture_config()));
    let app = actix_test::init_service(build_app(health_state, http_state)).await;

    for (uri, expected) in [
        ("/places?lat=1&lng=2", StatusCode::OK),
        ("/places", StatusCode::BAD_REQUEST),
        ("/health/ready", StatusCode::OK),
        ("/health/live", StatusCode::OK),
        ("/api-docs/openapi.json", StatusCode::OK),
    ] {
        let request = actix_test::TestRequest::get().uri(uri).to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), expected, "{uri}");
        assert!(
            response.headers().contains_key("trace-id"),
            "{uri} should carry a trace id"
        );
    }
}

#[rstest]
#[actix_rt::test]
async fn openapi_document_lists_the_places_path(health_state: web::Data<HealthState>) {
    let http_state = web::Data::new(build_http_state(&fixture_config()));
    let app = actix_test::init_service(build_app(health_state, http_state)).await;

    let request = actix_test::TestRequest::get()
        .uri("/api-docs/openapi.json")
        .to_request();
    let body: serde_json::Value = actix_test::call_and_read_body_json(&app, request).await;

    assert!(body.pointer("/paths/~1places/get").is_some());
}
