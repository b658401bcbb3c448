//! Request statistics handler.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{StatsParams, parse_date};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /earthquakes-data/statistic/api-request-count`: Requests per endpoint on one day.
///
/// # Errors
///
/// Returns [`GatewayError::ValidationFailed`] when `reqDate` is missing or
/// malformed and [`GatewayError::QueryFailed`] when the store fails.
#[utoipa::path(
    get,
    path = "/earthquakes-data/statistic/api-request-count",
    tag = "Statistics",
    summary = "Count API requests",
    description = "Counts the logged API calls of one calendar day, per endpoint. The day is taken in the gateway's configured time zone.",
    params(StatsParams),
    responses(
        (status = 200, description = "reqDate -> endpointName -> count", body = serde_json::Value),
        (status = 400, description = "Invalid reqDate", body = ErrorResponse),
    )
)]
pub async fn api_request_count(
    State(state): State<AppState>,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Query(params) = params.map_err(|e| GatewayError::ValidationFailed(e.body_text()))?;
    let date = parse_date("reqDate", params.req_date)?
        .ok_or_else(|| GatewayError::ValidationFailed("reqDate is required".to_string()))?;
    let stats = state.stats.daily_request_stats(date).await?;
    Ok(Json(stats))
}

/// Statistics routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/earthquakes-data/statistic/api-request-count",
        get(api_request_count),
    )
}
