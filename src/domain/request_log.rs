//! Request-log records written once per completed API call.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::store::{IndexDefinition, Item, KeySchema, TableDefinition};

/// Secondary index partitioning request logs by calendar day.
pub const REQ_DATE_INDEX: &str = "ReqDateIndex";

/// Table definition for request logs: keyed by request id and request time,
/// with [`REQ_DATE_INDEX`] keyed by `reqDate`.
#[must_use]
pub fn request_log_table(name: &str) -> TableDefinition {
    TableDefinition {
        name: name.to_string(),
        key: KeySchema::new("reqId", "reqTimestamp"),
        indexes: vec![IndexDefinition {
            name: REQ_DATE_INDEX.to_string(),
            key: KeySchema::new("reqDate", "reqTimestamp"),
        }],
    }
}

/// Metadata of one completed API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogRecord {
    /// Random request id.
    pub req_id: Uuid,
    /// Calendar day of the request in the configured zone, `YYYY-MM-DD`.
    pub req_date: String,
    /// Arrival time in epoch milliseconds.
    pub req_timestamp: i64,
    /// Arrival time, RFC 3339 in UTC.
    #[serde(rename = "reqReadableTimestampUTC")]
    pub req_readable_timestamp_utc: String,
    /// Arrival time in the configured zone, `YYYY-MM-DD HH:MM:SS TZ`.
    pub req_readable_timestamp_local: String,
    /// Originating address (`x-forwarded-for` or peer address).
    pub req_ip: String,
    /// Geolocation of `req_ip`; not resolved by this service.
    pub req_geo_location: Option<Value>,
    /// Request path including the query string.
    pub req_path: String,
    /// HTTP method.
    pub req_method: String,
    /// Route template that handled the call, e.g. `/earthquakes-data`.
    pub endpoint_name: String,
    /// Request headers with credentials redacted.
    pub req_headers: Item,
    /// Decoded query parameters.
    pub req_query_params: Item,
    /// Request body when it was JSON.
    pub req_body: Option<Value>,
    /// Handler duration in seconds, rounded to hundredths.
    pub execution_time_in_second: f64,
    /// HTTP status returned to the caller.
    pub response_status: u16,
    /// Response body when it was JSON.
    pub response_data: Option<Value>,
}

impl RequestLogRecord {
    /// Converts the record into a store item.
    ///
    /// # Errors
    ///
    /// Returns the serialization error; cannot happen for well-formed
    /// records since every field maps to JSON.
    pub fn into_item(self) -> Result<Item, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(serde::ser::Error::custom("request log did not serialize to an object")),
        }
    }
}

/// Day and readable timestamps of an arrival instant in `tz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestClock {
    /// `YYYY-MM-DD` in `tz`.
    pub date: String,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    /// RFC 3339 UTC rendering.
    pub utc: String,
    /// Local rendering with zone abbreviation.
    pub local: String,
}

impl RequestClock {
    /// Computes the clock fields of `at` in `tz`.
    #[must_use]
    pub fn at(at: DateTime<Utc>, tz: Tz) -> Self {
        let local = at.with_timezone(&tz);
        Self {
            date: local.format("%Y-%m-%d").to_string(),
            timestamp_ms: at.timestamp_millis(),
            utc: at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            local: local.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        }
    }
}

/// Projection of a request-log item used for aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogRow {
    /// Calendar day bucket.
    pub req_date: String,
    /// Endpoint bucket.
    pub endpoint_name: String,
}

impl RequestLogRow {
    /// Creates a row from its two bucket fields.
    #[must_use]
    pub fn new(req_date: impl Into<String>, endpoint_name: impl Into<String>) -> Self {
        Self {
            req_date: req_date.into(),
            endpoint_name: endpoint_name.into(),
        }
    }

    /// Projects a stored item.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when either field is missing.
    pub fn from_item(item: Item) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(item))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn clock_uses_local_calendar_day() {
        // 2025-01-01 14:30 UTC is already 2025-01-02 in Melbourne (UTC+11).
        let Some(at) = Utc.with_ymd_and_hms(2025, 1, 1, 14, 30, 0).single() else {
            panic!("valid instant");
        };
        let clock = RequestClock::at(at, chrono_tz::Australia::Melbourne);
        assert_eq!(clock.date, "2025-01-02");
        assert_eq!(clock.local, "2025-01-02 01:30:00 AEDT");
        assert_eq!(clock.utc, "2025-01-01T14:30:00.000Z");
        assert_eq!(clock.timestamp_ms, at.timestamp_millis());
    }

    #[test]
    fn record_serializes_with_original_field_names() {
        let record = RequestLogRecord {
            req_id: Uuid::nil(),
            req_date: "2025-01-02".to_string(),
            req_timestamp: 1,
            req_readable_timestamp_utc: "x".to_string(),
            req_readable_timestamp_local: "y".to_string(),
            req_ip: "127.0.0.1".to_string(),
            req_geo_location: None,
            req_path: "/health".to_string(),
            req_method: "GET".to_string(),
            endpoint_name: "/health".to_string(),
            req_headers: Item::new(),
            req_query_params: Item::new(),
            req_body: None,
            execution_time_in_second: 0.01,
            response_status: 200,
            response_data: None,
        };
        let Ok(item) = record.into_item() else {
            panic!("record should serialize");
        };
        assert!(item.contains_key("reqReadableTimestampUTC"));
        assert!(item.contains_key("endpointName"));
        let Ok(row) = RequestLogRow::from_item(item) else {
            panic!("row projection failed");
        };
        assert_eq!(row, RequestLogRow::new("2025-01-02", "/health"));
    }
}
