use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::error::PalisadeError;

/// JWT claims payload.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Why a token was rejected. Callers treat every variant identically
/// (reject the request); the distinction exists for logging and tests.
/// There are no partial-trust states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("expired token")]
    Expired,

    #[error("invalid token signature")]
    SignatureInvalid,
}

impl From<TokenError> for PalisadeError {
    fn from(err: TokenError) -> Self {
        // Only the error class crosses the boundary, never token contents.
        PalisadeError::Unauthenticated(err.to_string())
    }
}

/// Issue a signed token for the given username.
///
/// Pure function of input + secret + clock; the only failure mode is a
/// signing problem, which is a startup-class error rather than a
/// per-request one.
pub fn issue_token(
    username: &str,
    secret: &str,
    expiry_hours: u64,
) -> Result<String, PalisadeError> {
    let now = Utc::now();
    let expires = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: username.to_string(),
        exp: expires.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| PalisadeError::Internal(format!("Failed to sign token: {}", e)))
}

/// Validate a token's signature and expiry and return the claims.
///
/// Expiry is exclusive at issuance + TTL: zero leeway, so a token is
/// rejected from the exact instant its `exp` passes.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        _ => TokenError::Malformed,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_identity() {
        let token = issue_token("admin", "secret", 1).unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_signature_invalid() {
        let token = issue_token("admin", "secret", 1).unwrap();
        assert_eq!(
            validate_token(&token, "other").unwrap_err(),
            TokenError::SignatureInvalid
        );
    }

    #[test]
    fn garbage_is_malformed() {
        for garbage in ["", "not.a.token", "random"] {
            assert_eq!(
                validate_token(garbage, "secret").unwrap_err(),
                TokenError::Malformed
            );
        }
    }

    #[test]
    fn expired_token_is_rejected_despite_valid_signature() {
        // TTL of zero hours puts exp at issuance; with zero leeway the
        // token is already past its expiry instant.
        let token = issue_token("admin", "secret", 0).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert_eq!(
            validate_token(&token, "secret").unwrap_err(),
            TokenError::Expired
        );
    }
}
