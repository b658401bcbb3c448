//! Bearer token authentication middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;
use crate::error::GatewayError;

/// Middleware that admits only requests carrying a valid access token.
///
/// The token must be provided in the `Authorization` header as:
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// On success the verified [`crate::domain::AuthenticatedSubject`] is
/// attached to the request extensions. A missing token answers 401, an
/// invalid or expired one 403.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthenticated`] or
/// [`GatewayError::TokenInvalid`] as decided by the [`crate::service::AuthGate`].
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let subject = state.gate.admit(header)?;
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}
