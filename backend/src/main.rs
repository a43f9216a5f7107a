//! Backend entry-point: loads settings, wires the places service and serves
//! HTTP until shutdown.

mod server;

use std::sync::Arc;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use places_backend::domain::ports::PlacesQuery;
use places_backend::inbound::http::health::HealthState;
use places_backend::settings::PlacesSettings;
use server::{ServerConfig, build_places_stack, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = PlacesSettings::load_from_iter(std::env::args_os())
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let stack = build_places_stack(&settings)?;
    let places: Arc<dyn PlacesQuery> = stack.service;
    let config = ServerConfig::new(bind_addr, places).with_metrics(stack.exporter);

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, "places backend listening");

    let handle = server.handle();
    actix_web::rt::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            health_state.mark_draining();
            handle.stop(true).await;
        }
    });

    server.await
}
