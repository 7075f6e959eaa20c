//! Access token signing and refresh token minting.
//!
//! Access tokens are HS256 JWTs carrying only the subject and the issue/expiry
//! timestamps. They are never looked up in storage. Refresh tokens are not JWTs:
//! they are 128 random bits rendered as a UUID and mean nothing without the
//! refresh token store.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 30 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user id rendered as a decimal string
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Result of generating an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Result of minting a refresh token value.
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    /// Opaque token value
    pub token: Uuid,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Signing keys and token lifetimes, built once at startup.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: u64,
    refresh_ttl: u64,
}

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
    #[error("Failed to decode token: {0}")]
    Decoding(#[source] jsonwebtoken::errors::Error),
    #[error("Token has expired")]
    Expired,
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl JwtConfig {
    /// Create a configuration with the default token lifetimes.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttls(
            secret,
            ACCESS_TOKEN_DURATION_SECS,
            REFRESH_TOKEN_DURATION_SECS,
        )
    }

    /// Create a configuration with explicit lifetimes (in seconds).
    pub fn with_ttls(secret: &[u8], access_ttl: u64, refresh_ttl: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> u64 {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> u64 {
        self.refresh_ttl
    }

    /// Generate a signed access token for a user.
    pub fn generate_access_token(&self, user_id: i64) -> Result<AccessTokenResult, JwtError> {
        let now = unix_now();

        let claims = AccessClaims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.access_ttl,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            duration: self.access_ttl,
        })
    }

    /// Verify signature and structure of an access token.
    ///
    /// Expiry is deliberately left to [`JwtConfig::validate_not_expired`] so
    /// callers can tell a tampered token from a stale one.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::Decoding)
    }

    /// Reject claims whose expiry is now or in the past.
    pub fn validate_not_expired(&self, claims: &AccessClaims) -> Result<(), JwtError> {
        if unix_now() >= claims.exp {
            return Err(JwtError::Expired);
        }
        Ok(())
    }

    /// Mint a new opaque refresh token value and its expiry.
    pub fn generate_refresh_token(&self) -> RefreshTokenResult {
        let now = unix_now();

        RefreshTokenResult {
            token: Uuid::from_bytes(rand::random()),
            issued_at: now,
            expires_at: now + self.refresh_ttl,
            duration: self.refresh_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_decode_access_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.generate_access_token(42).unwrap();
        assert_eq!(result.duration, ACCESS_TOKEN_DURATION_SECS);

        let claims = config.decode(&result.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_DURATION_SECS);
        assert!(config.validate_not_expired(&claims).is_ok());
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");
        assert!(matches!(
            config.decode("invalid-token"),
            Err(JwtError::Decoding(_))
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"secret-1");
        let config2 = JwtConfig::new(b"secret-2");

        let result = config1.generate_access_token(1).unwrap();
        assert!(config2.decode(&result.token).is_err());
    }

    #[test]
    fn test_expired_token_decodes_but_fails_expiry_check() {
        let secret = b"test-secret";
        let now = unix_now();

        let claims = AccessClaims {
            sub: "7".to_string(),
            iat: now - 100,
            exp: now - 50,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let config = JwtConfig::new(secret);
        let decoded = config.decode(&token).unwrap();
        assert_eq!(decoded.sub, "7");
        assert!(matches!(
            config.validate_not_expired(&decoded),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_zero_ttl_token_is_expired_immediately() {
        let config = JwtConfig::with_ttls(b"secret", 0, 60);
        let result = config.generate_access_token(1).unwrap();
        let claims = config.decode(&result.token).unwrap();
        assert!(config.validate_not_expired(&claims).is_err());
    }

    #[test]
    fn test_numeric_subject_is_rejected() {
        let secret = b"test-secret";
        let now = unix_now();
        let token = jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({ "sub": 7, "iat": now, "exp": now + 60 }),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(JwtConfig::new(secret).decode(&token).is_err());
    }

    #[test]
    fn test_missing_expiry_is_rejected() {
        let secret = b"test-secret";
        let token = jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({ "sub": "7", "iat": unix_now() }),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(JwtConfig::new(secret).decode(&token).is_err());
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let first = config.generate_refresh_token();
        let second = config.generate_refresh_token();

        assert_ne!(first.token, second.token);
        assert_eq!(first.duration, REFRESH_TOKEN_DURATION_SECS);
        assert_eq!(first.expires_at - first.issued_at, REFRESH_TOKEN_DURATION_SECS);
    }
}
