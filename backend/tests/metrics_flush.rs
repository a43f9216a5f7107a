//! Cache counters are exported from the request path once the flush
//! interval has elapsed.

mod support;

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::rstest;

use places_backend::domain::metrics_exporter::{MetricsExporter, MetricsExporterConfig};
use places_backend::domain::ports::{CacheCounterStore, MetricsSink};
use places_backend::inbound::http::state::HttpState;
use places_backend::test_support::RecordingMetricsSink;
use support::{Cluster, app, fuji_source, instance};

const FUJI_QUERY: &str = "/places?lat=35.36&lng=138.73&radius=5000";
const INTERVAL: Duration = Duration::from_secs(60);

async fn wait_for_push(sink: &RecordingMetricsSink) {
    for _ in 0..100 {
        if !sink.pushes().is_empty() {
            return;
        }
        actix_rt::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("metrics were never pushed");
}

#[rstest]
#[actix_rt::test]
async fn counters_are_pushed_after_the_interval_and_then_reset() {
    let cluster = Cluster::new();
    let node = instance(&cluster, fuji_source());
    let sink = Arc::new(RecordingMetricsSink::new());
    let counters: Arc<dyn CacheCounterStore> = node.counters.clone();
    let sinks: Vec<Arc<dyn MetricsSink>> = vec![sink.clone()];
    let exporter = Arc::new(MetricsExporter::new(
        counters,
        sinks,
        cluster.clock.clone(),
        MetricsExporterConfig {
            interval: INTERVAL,
            ..MetricsExporterConfig::default()
        },
    ));
    let state = HttpState::new(node.service.clone()).with_metrics(exporter);
    let app = actix_test::init_service(app(state)).await;

    let request = actix_test::TestRequest::get().uri(FUJI_QUERY).to_request();
    assert_eq!(
        actix_test::call_service(&app, request).await.status(),
        StatusCode::OK
    );
    assert!(sink.pushes().is_empty(), "flush is not due yet");

    cluster.clock.advance(INTERVAL + Duration::from_secs(1));
    let request = actix_test::TestRequest::get().uri(FUJI_QUERY).to_request();
    assert_eq!(
        actix_test::call_service(&app, request).await.status(),
        StatusCode::OK
    );
    wait_for_push(&sink).await;

    let pushed = sink.pushes();
    assert_eq!(pushed.len(), 1);
    let first = pushed.first().expect("one push");
    assert_eq!((first.hits, first.misses), (1, 1));

    let mut remaining = node.counters.snapshot().await.expect("local counters");
    for _ in 0..100 {
        if remaining.is_empty() {
            break;
        }
        actix_rt::time::sleep(Duration::from_millis(5)).await;
        remaining = node.counters.snapshot().await.expect("local counters");
    }
    assert_eq!((remaining.hits, remaining.misses), (0, 0));
}
