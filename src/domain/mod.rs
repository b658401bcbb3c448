//! Domain layer: typed records, key schemas and query parameters.
//!
//! Store items are untyped JSON documents; every entity crossing the store
//! boundary is converted to or from one of the typed records here.

pub mod event_query;
pub mod event_record;
pub mod request_log;
pub mod token;

use std::collections::BTreeMap;

pub use event_query::{EventQuery, SortField, SortOrder};
pub use event_record::{EventRecord, FeedDocument};
pub use request_log::{RequestLogRecord, RequestLogRow};
pub use token::{AuthenticatedSubject, TokenClaims, TokenPair};

/// Per-day, per-endpoint request counts: `reqDate -> endpointName -> count`.
pub type DailyRequestStats = BTreeMap<String, BTreeMap<String, u64>>;
