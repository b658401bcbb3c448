//! # quake-gateway
//!
//! Authenticated REST gateway over a feed of seismic events.
//!
//! The gateway pulls the USGS GeoJSON summary feed into a range-indexed
//! store keyed by event type and occurrence time, serves cursor-paginated
//! earthquake listings with date, magnitude and location filters, records
//! one log row per API call, and reports per-day request counts. Access to
//! the earthquake routes requires a short-lived bearer token obtained by
//! logging in; a long-lived refresh token renews it.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── Request-log hook, AuthGate (api/middleware)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── IngestionPipeline ── FeedClient (reqwest)
//!     ├── EventQueryEngine
//!     ├── RequestStatsService, RequestLogWriter
//!     ├── TokenService, AuthService (service/)
//!     │
//!     ├── RangeStoreClient (store/)
//!     │
//!     └── MemoryRangeStore | PostgresRangeStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
