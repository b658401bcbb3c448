//! Feed ingestion: fetch the seismic summary feed and store its events.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EventRecord, FeedDocument};
use crate::error::GatewayError;
use crate::store::{Item, RangeStoreClient};

/// Source of feed documents.
#[async_trait]
pub trait FeedClient: fmt::Debug + Send + Sync {
    /// Downloads and parses the feed at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::FetchFailed`] for transport errors, non-2xx
    /// statuses and bodies that are not a feed document.
    async fn fetch(&self, url: &str) -> Result<FeedDocument, GatewayError>;
}

/// [`FeedClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    inner: reqwest::Client,
}

impl HttpFeedClient {
    /// Builds a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("feed client: {e}")))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<FeedDocument, GatewayError> {
        tracing::debug!(url, "fetching feed");
        let response = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::FetchFailed(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::FetchFailed(format!(
                "feed responded with {status}"
            )));
        }

        response
            .json::<FeedDocument>()
            .await
            .map_err(|e| {
                GatewayError::FetchFailed(format!("feed body is not a feature collection: {e}"))
            })
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    /// Features in the fetched document.
    pub fetched: usize,
    /// Features considered after applying the ingest limit.
    pub selected: usize,
    /// Selected features dropped because they lacked key fields.
    pub skipped: usize,
    /// Records written to the event table.
    pub stored: usize,
}

/// Fetches the feed and writes the newest events to the event table.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    feed: Arc<dyn FeedClient>,
    store: RangeStoreClient,
    table: String,
    limit: usize,
}

impl IngestionPipeline {
    /// Creates a pipeline writing at most `limit` events per run to `table`.
    #[must_use]
    pub fn new(
        feed: Arc<dyn FeedClient>,
        store: RangeStoreClient,
        table: impl Into<String>,
        limit: usize,
    ) -> Self {
        Self {
            feed,
            store,
            table: table.into(),
            limit,
        }
    }

    /// Runs one ingestion against `feed_url`.
    ///
    /// The first `limit` features of the document are converted, in feed
    /// order, and written in batches. Features without an id, a type or a
    /// time are skipped. Re-running overwrites records with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::FetchFailed`] when the feed cannot be read
    /// and [`GatewayError::StoreWriteFailed`] when a batch write fails;
    /// batches written before the failure stay written.
    pub async fn run(&self, feed_url: &str) -> Result<IngestionReport, GatewayError> {
        let document = self.feed.fetch(feed_url).await?;
        if let Some(meta) = &document.metadata {
            tracing::info!(
                title = meta.title.as_deref().unwrap_or_default(),
                generated = meta.generated,
                count = meta.count,
                "feed fetched"
            );
        }

        let fetched = document.features.len();
        let selected = fetched.min(self.limit);
        let mut skipped = 0;
        let items: Vec<Item> = document
            .features
            .into_iter()
            .take(selected)
            .filter_map(|feature| match EventRecord::from_feature(feature) {
                Ok(record) => Some(record.into_item()),
                Err(reason) => {
                    skipped += 1;
                    tracing::warn!(%reason, "skipping malformed feature");
                    None
                }
            })
            .collect();

        let stored = self.store.batch_put_items(&self.table, items).await?;
        let report = IngestionReport {
            fetched,
            selected,
            skipped,
            stored,
        };
        tracing::info!(
            table = %self.table,
            fetched,
            stored,
            skipped,
            "ingestion complete"
        );
        Ok(report)
    }
}
