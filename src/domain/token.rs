//! Bearer token payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Signed token payload. Access and refresh tokens share this shape and
/// differ only in the distance between `iat` and `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Authenticated username.
    pub sub: String,
    /// Issue time, seconds since the epoch.
    pub iat: i64,
    /// Expiry time, seconds since the epoch.
    pub exp: i64,
}

/// Tokens handed out at login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived token presented on every request.
    pub access_token: String,
    /// Long-lived token exchanged for new access tokens.
    pub refresh_token: String,
}

/// Identity attached to a request admitted by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    /// Username carried in the verified token.
    pub subject: String,
}
