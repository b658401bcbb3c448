//! REST endpoint handlers organized by resource.

pub mod auth;
pub mod earthquakes;
pub mod statistics;
pub mod system;

use axum::Router;
use axum::middleware;

use crate::api::middleware::require_bearer;
use crate::app_state::AppState;

/// Composes every resource route; earthquake routes sit behind the
/// bearer-token gate.
pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = earthquakes::routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .merge(auth::routes())
        .merge(protected)
        .merge(statistics::routes())
        .merge(system::routes())
}
