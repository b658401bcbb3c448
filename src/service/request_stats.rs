//! Daily per-endpoint request counts.

use chrono::NaiveDate;

use crate::domain::request_log::REQ_DATE_INDEX;
use crate::domain::{DailyRequestStats, RequestLogRow};
use crate::error::GatewayError;
use crate::store::{QuerySpec, RangeStoreClient, ScanDirection};

/// Items scanned per round trip when collecting one day of logs.
const SCAN_PAGE: usize = 500;

/// Folds request-log rows into `reqDate -> endpointName -> count`.
///
/// The result does not depend on row order; no rows yield an empty map.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogAggregator;

impl RequestLogAggregator {
    /// Counts `rows` per day and endpoint.
    #[must_use]
    pub fn aggregate<'a>(rows: impl IntoIterator<Item = &'a RequestLogRow>) -> DailyRequestStats {
        let mut stats = DailyRequestStats::new();
        for row in rows {
            *stats
                .entry(row.req_date.clone())
                .or_default()
                .entry(row.endpoint_name.clone())
                .or_default() += 1;
        }
        stats
    }
}

/// Reads one day of request logs and aggregates them.
#[derive(Debug, Clone)]
pub struct RequestStatsService {
    store: RangeStoreClient,
    table: String,
}

impl RequestStatsService {
    /// Creates a service reading from the request-log `table`.
    #[must_use]
    pub fn new(store: RangeStoreClient, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// Counts the requests logged on `date`, per endpoint.
    ///
    /// Follows continuation cursors until the day is exhausted. Stored
    /// items lacking the date or endpoint are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::QueryFailed`] when the store fails.
    pub async fn daily_request_stats(
        &self,
        date: NaiveDate,
    ) -> Result<DailyRequestStats, GatewayError> {
        let day = date.format("%Y-%m-%d").to_string();
        let mut spec = QuerySpec::partition(day.as_str(), SCAN_PAGE);
        spec.index = Some(REQ_DATE_INDEX.to_string());
        spec.direction = ScanDirection::Forward;

        let mut rows = Vec::new();
        let mut round_trips = 0_usize;
        loop {
            let page = self.store.query(&self.table, &spec).await?;
            round_trips += 1;
            rows.extend(page.items.into_iter().filter_map(|item| {
                RequestLogRow::from_item(item)
                    .inspect_err(|e| tracing::warn!(error = %e, "skipping malformed request log"))
                    .ok()
            }));
            match page.cursor {
                Some(cursor) => spec.start = Some(cursor),
                None => break,
            }
        }

        tracing::debug!(day = %day, rows = rows.len(), round_trips, "request logs aggregated");
        Ok(RequestLogAggregator::aggregate(&rows))
    }
}
