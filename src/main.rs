//! quake-gateway server entry point.
//!
//! Loads configuration, selects the store backend and starts the Axum
//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use quake_gateway::api;
use quake_gateway::app_state::{AppState, table_definitions};
use quake_gateway::config::GatewayConfig;
use quake_gateway::service::HttpFeedClient;
use quake_gateway::store::{MemoryRangeStore, PostgresRangeStore, RangeStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting quake-gateway");

    // Select the store backend
    let tables = table_definitions(&config);
    let store: Arc<dyn RangeStore> = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        let store = PostgresRangeStore::new(pool, tables);
        store.ensure_schema().await?;
        tracing::info!("postgres range store ready");
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled, using the in-memory range store");
        Arc::new(MemoryRangeStore::new(tables))
    };

    // Build application state
    let feed = Arc::new(HttpFeedClient::new(config.feed.timeout)?);
    let app_state = AppState::new(&config, store, feed);

    // Build router
    let app = Router::new().merge(api::build_router(&app_state));
    #[cfg(feature = "swagger-ui")]
    let app = app.merge(api::docs_router());
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
