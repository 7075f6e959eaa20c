//! Session lifecycle: registration, login, refresh, logout and access token
//! identity resolution.
//!
//! A session is one access token plus one persisted refresh token. Logging in
//! replaces any previous session of the user; refreshing rotates the refresh
//! token in place so a presented value is accepted at most once.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::db::{Database, RefreshTokenSession, User};
use crate::jwt::{JwtConfig, unix_now};
use crate::password::{MAX_PASSWORD_BYTES, PasswordError, PasswordHasher};

use super::credentials::CredentialVerifier;
use super::errors::AuthError;

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 64;
const PASSWORD_MIN_LEN: usize = 6;
const PASSWORD_MAX_LEN: usize = 128;

/// Tokens handed to a client after login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Uuid,
    pub token_type: &'static str,
    /// Access token lifetime in seconds (cookie `Max-Age`).
    #[serde(skip)]
    pub access_max_age: u64,
    /// Refresh token lifetime in seconds (cookie `Max-Age`).
    #[serde(skip)]
    pub refresh_max_age: u64,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    jwt: Arc<JwtConfig>,
    hasher: PasswordHasher,
    credentials: CredentialVerifier,
}

impl SessionManager {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, hasher: PasswordHasher) -> Self {
        let credentials = CredentialVerifier::new(db.users(), hasher.clone());
        Self {
            db,
            jwt,
            hasher,
            credentials,
        }
    }

    /// Create an active user.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        validate_username(username)?;
        validate_password(password)?;

        let password_hash = self.hasher.hash(password).await.map_err(|e| match e {
            PasswordError::Empty => {
                AuthError::InvalidInput("Password must be between 6 and 128 characters")
            }
            PasswordError::TooLong => AuthError::InvalidInput("Password must be at most 72 bytes"),
            other => other.into(),
        })?;

        match self.db.users().create(username, &password_hash).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "User registered");
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::debug!("Registration rejected: username taken");
                Err(AuthError::UsernameTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and start a new session, ending any previous one.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self.credentials.authenticate(username, password).await?;

        let access = self.jwt.generate_access_token(user.id)?;
        let refresh = self.jwt.generate_refresh_token();

        self.db
            .refresh_tokens()
            .issue(user.id, refresh.token, refresh.expires_at)
            .await?;

        tracing::info!(user_id = user.id, "User logged in");

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer",
            access_max_age: access.duration,
            refresh_max_age: refresh.duration,
        })
    }

    /// Exchange a refresh token for a new pair, invalidating the presented one.
    pub async fn refresh(&self, refresh_token: Uuid) -> Result<TokenPair, AuthError> {
        let session = self
            .db
            .refresh_tokens()
            .lookup(refresh_token)
            .await?
            .ok_or(AuthError::RefreshToken)?;

        self.validate_refresh_expired(&session)?;

        let access = self.jwt.generate_access_token(session.user_id)?;
        let next = self.jwt.generate_refresh_token();

        let rotated = self
            .db
            .refresh_tokens()
            .rotate(session.id, refresh_token, next.token, next.expires_at)
            .await?;

        if rotated.is_none() {
            tracing::debug!(user_id = session.user_id, "Refresh lost a concurrent rotation");
            return Err(AuthError::RefreshToken);
        }

        tracing::info!(user_id = session.user_id, "Session refreshed");

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: next.token,
            token_type: "Bearer",
            access_max_age: access.duration,
            refresh_max_age: next.duration,
        })
    }

    /// Reject a stored session whose expiry has passed.
    pub fn validate_refresh_expired(&self, session: &RefreshTokenSession) -> Result<(), AuthError> {
        if session.is_expired(unix_now()) {
            tracing::debug!(user_id = session.user_id, "Refresh rejected: token expired");
            return Err(AuthError::RefreshToken);
        }
        Ok(())
    }

    /// End the session holding this refresh token.
    ///
    /// The raw value comes straight from the client, so absence, garbage and
    /// unknown tokens all map to [`AuthError::RefreshToken`].
    pub async fn logout(&self, raw_token: Option<&str>) -> Result<(), AuthError> {
        let raw_token = raw_token.ok_or(AuthError::RefreshToken)?;
        let token = Uuid::parse_str(raw_token).map_err(|_| AuthError::RefreshToken)?;

        let session = self
            .db
            .refresh_tokens()
            .lookup(token)
            .await?
            .ok_or(AuthError::RefreshToken)?;

        if self.db.refresh_tokens().revoke(token).await? == 0 {
            tracing::debug!(user_id = session.user_id, "Logout lost a concurrent revocation");
            return Err(AuthError::RefreshToken);
        }

        tracing::info!(user_id = session.user_id, "User logged out");
        Ok(())
    }

    /// Map a valid, unexpired access token to the user id it was issued for.
    pub fn resolve_identity(&self, access_token: &str) -> Result<i64, AuthError> {
        let claims = self.jwt.decode(access_token).map_err(|e| {
            tracing::debug!(error = %e, "Access token rejected");
            AuthError::WrongCredentials
        })?;

        self.jwt
            .validate_not_expired(&claims)
            .map_err(|_| AuthError::WrongCredentials)?;

        claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::WrongCredentials)
    }

    /// Load the user an access token belongs to. `None` if the user is gone.
    pub async fn current_user(&self, access_token: &str) -> Result<Option<User>, AuthError> {
        let user_id = self.resolve_identity(access_token)?;
        Ok(self.db.users().get_by_id(user_id).await?)
    }
}

fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AuthError::InvalidInput(
            "Username must be between 3 and 64 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AuthError::InvalidInput(
            "Username may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(AuthError::InvalidInput(
            "Password must be between 6 and 128 characters",
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::InvalidInput("Password must be at most 72 bytes"));
    }
    Ok(())
}
