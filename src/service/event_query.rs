//! Paginated, filtered listing of stored earthquake events.

use serde::Serialize;

use crate::domain::event_record::{EARTHQUAKE, MAGNITUDE_PATH, PLACE_PATH};
use crate::domain::{EventQuery, EventRecord};
use crate::error::GatewayError;
use crate::store::{Cursor, FilterExpr, QuerySpec, RangeStoreClient, SortKeyCondition};

/// One page of events.
///
/// `size` counts the returned items. Because filters run after the scan is
/// limited, a page may hold fewer than `page_size` items, or none, while
/// `cursor` is still set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPage {
    /// Events that passed every filter, in scan order.
    pub items: Vec<EventRecord>,
    /// Number of items in this page.
    pub size: usize,
    /// Continuation token; `None` once the range is exhausted.
    pub cursor: Option<Cursor>,
}

/// Translates [`EventQuery`] values into range-store queries over the
/// `earthquake` partition.
#[derive(Debug, Clone)]
pub struct EventQueryEngine {
    store: RangeStoreClient,
    table: String,
}

impl EventQueryEngine {
    /// Creates an engine reading from `table`.
    #[must_use]
    pub fn new(store: RangeStoreClient, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// Returns one page of earthquake events.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ValidationFailed`] for a malformed cursor and
    /// [`GatewayError::QueryFailed`] when the store fails or returns an item
    /// that is not an event record.
    pub async fn list(&self, query: &EventQuery) -> Result<EventPage, GatewayError> {
        let spec = query_spec(query);
        let page = self.store.query(&self.table, &spec).await?;

        let items = page
            .items
            .into_iter()
            .map(EventRecord::from_item)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GatewayError::QueryFailed(format!("stored event is malformed: {e}")))?;

        tracing::debug!(
            table = %self.table,
            returned = items.len(),
            more = page.cursor.is_some(),
            "events listed"
        );
        Ok(EventPage {
            size: items.len(),
            items,
            cursor: page.cursor,
        })
    }
}

/// Builds the store query for `query`.
///
/// Date bounds become a sort-key range on the occurrence timestamp;
/// magnitude and location become non-key filters.
#[must_use]
pub fn query_spec(query: &EventQuery) -> QuerySpec {
    let mut filters = Vec::new();
    if let Some(min) = query.min_magnitude {
        filters.push(FilterExpr::at_least(MAGNITUDE_PATH, min));
    }
    if let Some(max) = query.max_magnitude {
        filters.push(FilterExpr::at_most(MAGNITUDE_PATH, max));
    }
    if let Some(location) = query.location.as_deref() {
        filters.push(FilterExpr::contains(PLACE_PATH, location));
    }

    QuerySpec {
        index: None,
        partition: EARTHQUAKE.to_string(),
        sort_range: SortKeyCondition::from_bounds(query.start_millis(), query.end_millis()),
        filter: FilterExpr::all(filters),
        limit: usize::try_from(query.page_size).unwrap_or(usize::MAX),
        direction: query.sort_order.scan_direction(),
        start: query.cursor.clone(),
    }
}
