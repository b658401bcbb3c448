//! Token handlers: login and refresh.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{AccessTokenResponse, LoginRequest, RefreshRequest};
use crate::app_state::AppState;
use crate::domain::TokenPair;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /auth/login`: Exchange credentials for a token pair.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthenticated`] when the credentials do not
/// match and [`GatewayError::ValidationFailed`] for a malformed body.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    summary = "Log in",
    description = "Checks the configured credentials and returns a short-lived access token and a long-lived refresh token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = body.map_err(|e| GatewayError::ValidationFailed(e.body_text()))?;
    let pair = state
        .auth
        .issue_tokens(&req.username, &req.password)
        .map_err(|e| match e {
            GatewayError::TokenInvalid(reason) => GatewayError::Unauthenticated(reason),
            other => other,
        })?;
    Ok(Json(pair))
}

/// `POST /auth/refresh-token`: Exchange a refresh token for an access token.
///
/// # Errors
///
/// Returns [`GatewayError::ValidationFailed`] when no refresh token is
/// given and [`GatewayError::TokenInvalid`] when it does not verify.
#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    tag = "Auth",
    summary = "Refresh access token",
    description = "Verifies the refresh token and issues a new access token for the same subject. The refresh token stays valid until it expires.",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token issued", body = AccessTokenResponse),
        (status = 400, description = "Refresh token missing", body = ErrorResponse),
        (status = 403, description = "Refresh token invalid or expired", body = ErrorResponse),
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = body.map_err(|e| GatewayError::ValidationFailed(e.body_text()))?;
    let token = req
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GatewayError::ValidationFailed("refreshToken is required".to_string()))?;

    let access_token = state.auth.refresh_access_token(&token)?;
    Ok(Json(AccessTokenResponse { access_token }))
}

/// Token routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh_token))
}
