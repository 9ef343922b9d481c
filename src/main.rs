//! haptic-relay server entry point.
//!
//! Starts the Axum HTTP server exposing the trigger endpoints.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use haptic_relay::api;
use haptic_relay::app_state::AppState;
use haptic_relay::client::WsControlConnector;
use haptic_relay::config::{LogFormat, RelayConfig};
use haptic_relay::domain::EventBus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env().map_err(|e| anyhow::anyhow!("configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(
        addr = %config.listen_addr,
        client_name = %config.client_name,
        connect_timeout_ms = config.connect_timeout_ms,
        "starting haptic-relay"
    );

    // Build application state
    let connector = WsControlConnector::from_config(&config);
    let event_bus = EventBus::new(config.event_bus_capacity);
    let app_state = AppState::new(connector, event_bus);

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
