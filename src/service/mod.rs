//! Service layer: business logic orchestration.
//!
//! Each service owns a [`crate::store::RangeStoreClient`] (or the token
//! machinery) and exposes one operation family to the HTTP handlers:
//!
//! - [`IngestionPipeline`] pulls the seismic feed into the event table.
//! - [`EventQueryEngine`] pages through stored earthquakes.
//! - [`RequestStatsService`] counts logged API calls per day and endpoint.
//! - [`RequestLogWriter`] persists one record per completed call.
//! - [`TokenService`], [`AuthService`] and [`AuthGate`] issue, refresh and
//!   check bearer tokens.

pub mod auth_gate;
pub mod auth_service;
pub mod event_query;
pub mod ingestion;
pub mod request_log;
pub mod request_stats;
pub mod token_service;

pub use auth_gate::AuthGate;
pub use auth_service::AuthService;
pub use event_query::{EventPage, EventQueryEngine};
pub use ingestion::{FeedClient, HttpFeedClient, IngestionPipeline, IngestionReport};
pub use request_log::RequestLogWriter;
pub use request_stats::{RequestLogAggregator, RequestStatsService};
pub use token_service::TokenService;
