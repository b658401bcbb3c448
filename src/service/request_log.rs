//! Persistence of request-log records.

use crate::domain::RequestLogRecord;
use crate::error::GatewayError;
use crate::store::RangeStoreClient;

/// Writes one request-log record per completed API call.
///
/// Writes happen off the response path; a failed write is logged and never
/// affects the caller.
#[derive(Debug, Clone)]
pub struct RequestLogWriter {
    store: RangeStoreClient,
    table: String,
    enabled: bool,
}

impl RequestLogWriter {
    /// Creates a writer targeting `table`. A disabled writer drops records.
    #[must_use]
    pub fn new(store: RangeStoreClient, table: impl Into<String>, enabled: bool) -> Self {
        Self {
            store,
            table: table.into(),
            enabled,
        }
    }

    /// Whether records are persisted at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Schedules `record` for writing on a background task.
    pub fn record(&self, record: RequestLogRecord) {
        if !self.enabled {
            return;
        }
        let writer = self.clone();
        tokio::spawn(async move {
            let endpoint = record.endpoint_name.clone();
            if let Err(e) = writer.write(record).await {
                tracing::warn!(endpoint = %endpoint, error = %e, "request log not persisted");
            }
        });
    }

    /// Writes `record` and waits for the store.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreWriteFailed`] when the record cannot be
    /// serialized or stored.
    pub async fn write(&self, record: RequestLogRecord) -> Result<(), GatewayError> {
        let item = record
            .into_item()
            .map_err(|e| GatewayError::StoreWriteFailed(format!("request log: {e}")))?;
        self.store.put_item(&self.table, item).await
    }
}
