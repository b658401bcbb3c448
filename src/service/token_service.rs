//! Issues and verifies HS256 bearer tokens.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::config::AuthConfig;
use crate::domain::TokenClaims;
use crate::error::GatewayError;

/// Signs and verifies access and refresh tokens with one shared secret.
///
/// Both token kinds carry the same claims and algorithm; only their
/// lifetime differs. Verification checks the signature and the expiry with
/// zero leeway. Nothing is persisted and refresh tokens are never revoked.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a token service from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Issues a short-lived access token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if signing fails.
    pub fn issue_access_token(&self, subject: &str) -> Result<String, GatewayError> {
        self.sign(subject, self.access_ttl)
    }

    /// Issues a long-lived refresh token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if signing fails.
    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, GatewayError> {
        self.sign(subject, self.refresh_ttl)
    }

    /// Verifies signature and expiry and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TokenInvalid`] for a bad signature, a
    /// malformed token, or a token whose `exp` lies in the past.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, GatewayError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| GatewayError::TokenInvalid(e.to_string()))
    }

    /// Exchanges a valid refresh token for a new access token for the same
    /// subject. The refresh token stays usable until it expires.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TokenInvalid`] when the refresh token fails
    /// verification.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, GatewayError> {
        let claims = self.verify(refresh_token)?;
        self.issue_access_token(&claims.sub)
    }

    fn sign(&self, subject: &str, ttl: Duration) -> Result<String, GatewayError> {
        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(format!("token signing failed: {e}")))
    }
}
