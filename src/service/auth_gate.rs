//! Bearer-token admission for protected routes.

use std::sync::Arc;

use crate::domain::AuthenticatedSubject;
use crate::error::GatewayError;

use super::TokenService;

/// Decides whether a request carrying an `Authorization` header may pass.
///
/// A missing, empty, or non-`Bearer` header is unauthenticated and the
/// token service is never consulted. A bearer token that fails
/// verification is forbidden.
#[derive(Debug, Clone)]
pub struct AuthGate {
    tokens: Arc<TokenService>,
}

impl AuthGate {
    /// Creates a gate over a shared [`TokenService`].
    #[must_use]
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    /// Admits or rejects a request by its raw `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] when no bearer token is
    /// present and [`GatewayError::TokenInvalid`] when it does not verify.
    pub fn admit(&self, authorization: Option<&str>) -> Result<AuthenticatedSubject, GatewayError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or_else(|| GatewayError::Unauthenticated("missing bearer token".to_string()))?;

        let claims = self.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            e
        })?;
        Ok(AuthenticatedSubject {
            subject: claims.sub,
        })
    }
}

/// Extracts the token from `Bearer <token>`.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
