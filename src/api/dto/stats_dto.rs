//! Request statistics DTOs.

use serde::Deserialize;
use utoipa::IntoParams;

/// Query string of `GET /earthquakes-data/statistic/api-request-count`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatsParams {
    /// Calendar day to count, `YYYY-MM-DD`.
    pub req_date: Option<String>,
}
