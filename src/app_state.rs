//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::{GatewayConfig, RequestLogConfig};
use crate::domain::event_record::event_table;
use crate::domain::request_log::request_log_table;
use crate::service::{
    AuthGate, AuthService, EventQueryEngine, FeedClient, IngestionPipeline, RequestLogWriter,
    RequestStatsService, TokenService,
};
use crate::store::{RangeStore, RangeStoreClient, TableDefinition};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Login and token refresh.
    pub auth: Arc<AuthService>,
    /// Bearer-token admission for protected routes.
    pub gate: AuthGate,
    /// Feed ingestion into the event table.
    pub ingestion: Arc<IngestionPipeline>,
    /// Paginated event listing.
    pub events: Arc<EventQueryEngine>,
    /// Daily request counts.
    pub stats: Arc<RequestStatsService>,
    /// Completion hook sink.
    pub request_log: RequestLogWriter,
    /// Completion hook settings.
    pub request_log_config: Arc<RequestLogConfig>,
    /// Feed fetched by the ingestion endpoint.
    pub feed_url: Arc<str>,
}

impl AppState {
    /// Wires every service over one store backend and feed client.
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        store: Arc<dyn RangeStore>,
        feed: Arc<dyn FeedClient>,
    ) -> Self {
        let client = RangeStoreClient::new(store);
        let tokens = Arc::new(TokenService::new(&config.auth));

        Self {
            auth: Arc::new(AuthService::new(Arc::clone(&tokens), &config.auth)),
            gate: AuthGate::new(tokens),
            ingestion: Arc::new(IngestionPipeline::new(
                feed,
                client.clone(),
                config.store.event_table.clone(),
                config.feed.ingest_limit,
            )),
            events: Arc::new(EventQueryEngine::new(
                client.clone(),
                config.store.event_table.clone(),
            )),
            stats: Arc::new(RequestStatsService::new(
                client.clone(),
                config.store.request_log_table.clone(),
            )),
            request_log: RequestLogWriter::new(
                client,
                config.store.request_log_table.clone(),
                config.request_log.enabled,
            ),
            request_log_config: Arc::new(config.request_log.clone()),
            feed_url: Arc::from(config.feed.url.as_str()),
        }
    }
}

/// Definitions of every table the gateway reads or writes.
#[must_use]
pub fn table_definitions(config: &GatewayConfig) -> Vec<TableDefinition> {
    vec![
        event_table(&config.store.event_table),
        request_log_table(&config.store.request_log_table),
    ]
}
