use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use transit_board::clock::{HttpDateTimeSource, SystemTimeSource, TimeRetriever, TimeSource};
use transit_board::config::{API_KEY_ENV, AppConfig};
use transit_board::manager::launcher;
use transit_board::transitland::TransitlandClient;
use transit_board::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("transit_board=info")),
        )
        .init();

    let config = AppConfig::load().expect("Failed to load configuration");
    if config.api_key.is_empty() {
        warn!("{API_KEY_ENV} not set. API calls will fail.");
    }

    match config.time_url.clone() {
        Some(url) => {
            let timeout = Duration::from_secs(config.request_timeout_secs);
            let source =
                HttpDateTimeSource::new(url, timeout).expect("Failed to create time client");
            serve(config, source).await;
        }
        None => serve(config, SystemTimeSource).await,
    }
}

async fn serve<S: TimeSource + 'static>(config: AppConfig, time_source: S) {
    let client =
        TransitlandClient::new(config.client_config()).expect("Failed to create transitland client");

    let launch = launcher(
        Arc::new(client),
        Arc::new(time_source),
        Arc::new(TimeRetriever::new()),
        &config,
    );
    let state = AppState::new(config.zones.clone(), launch).expect("No zones configured");
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("Failed to bind listen address");
    info!(addr = %config.listen_addr, zones = config.zones.len(), "transit board listening");
    info!("  GET  /                  - Departure board");
    info!("  GET  /api/board         - Board snapshot (JSON)");
    info!("  GET  /api/zones         - Configured zones");
    info!("  POST /api/zones/select  - Switch zone");

    axum::serve(listener, app).await.expect("Server error");
}
