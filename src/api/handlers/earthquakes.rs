//! Earthquake handlers: ingestion trigger and paginated listing.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{EventListResponse, IngestResponse, ListEventsParams};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /earthquakes-data/fetch-store`: Ingest the most recent feed events.
///
/// # Errors
///
/// Returns [`GatewayError::FetchFailed`] when the feed is unreachable and
/// [`GatewayError::StoreWriteFailed`] when a batch write fails.
#[utoipa::path(
    get,
    path = "/earthquakes-data/fetch-store",
    tag = "Earthquakes",
    summary = "Fetch and store recent events",
    description = "Downloads the seismic summary feed and writes its most recent events to the event table, overwriting records with the same key.",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Events stored", body = IngestResponse),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 403, description = "Invalid bearer token", body = ErrorResponse),
        (status = 502, description = "Feed unreachable", body = ErrorResponse),
        (status = 500, description = "Store write failed", body = ErrorResponse),
    )
)]
pub async fn fetch_store(State(state): State<AppState>) -> Result<impl IntoResponse, GatewayError> {
    let report = state.ingestion.run(&state.feed_url).await?;
    Ok(Json(IngestResponse {
        message: format!("Stored {} earthquake events", report.stored),
        report,
    }))
}

/// `GET /earthquakes-data`: List stored earthquakes, newest first by default.
///
/// # Errors
///
/// Returns [`GatewayError::ValidationFailed`] for invalid parameters,
/// [`GatewayError::UnsupportedSort`] for `sort=magnitude`, and
/// [`GatewayError::QueryFailed`] when the store fails.
#[utoipa::path(
    get,
    path = "/earthquakes-data",
    tag = "Earthquakes",
    summary = "List earthquakes",
    description = "Returns one cursor-paginated page of earthquakes. Magnitude and location filters run after the page is scanned, so a page may hold fewer than pageSize items while a cursor is still returned; only a null cursor means no more data.",
    params(ListEventsParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "One page of events", body = EventListResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 403, description = "Invalid bearer token", body = ErrorResponse),
    )
)]
pub async fn list_earthquakes(
    State(state): State<AppState>,
    params: Result<Query<ListEventsParams>, QueryRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Query(params) = params.map_err(|e| GatewayError::ValidationFailed(e.body_text()))?;
    let query = params.into_query()?;
    let page = state.events.list(&query).await?;
    Ok(Json(EventListResponse::from(page)))
}

/// Earthquake routes; all require a bearer token.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/earthquakes-data", get(list_earthquakes))
        .route("/earthquakes-data/fetch-store", get(fetch_store))
}
