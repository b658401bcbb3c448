//! Login and token refresh.

use std::fmt;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::domain::TokenPair;
use crate::error::GatewayError;

use super::TokenService;

/// Checks the configured credentials and hands out token pairs.
#[derive(Clone)]
pub struct AuthService {
    tokens: Arc<TokenService>,
    username: String,
    password: String,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Creates the service over a shared [`TokenService`].
    #[must_use]
    pub fn new(tokens: Arc<TokenService>, config: &AuthConfig) -> Self {
        Self {
            tokens,
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    /// Issues an access/refresh pair when the credentials match.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TokenInvalid`] when the credentials do not
    /// match and [`GatewayError::Internal`] if signing fails.
    pub fn issue_tokens(&self, username: &str, password: &str) -> Result<TokenPair, GatewayError> {
        if username != self.username || password != self.password {
            tracing::warn!(username, "login rejected");
            return Err(GatewayError::TokenInvalid("invalid credentials".to_string()));
        }

        let pair = TokenPair {
            access_token: self.tokens.issue_access_token(username)?,
            refresh_token: self.tokens.issue_refresh_token(username)?,
        };
        tracing::info!(username, "tokens issued");
        Ok(pair)
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TokenInvalid`] when the refresh token is
    /// expired, tampered with, or malformed.
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<String, GatewayError> {
        self.tokens.refresh(refresh_token)
    }
}
