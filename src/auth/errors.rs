//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::jwt::JwtError;
use crate::password::PasswordError;

/// Errors surfaced by the session manager, permission gate and HTTP layer.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password, inactive user at login, or an access
    /// token that failed validation. Deliberately indistinguishable.
    #[error("Wrong credentials")]
    WrongCredentials,

    /// Missing, unknown, expired or already rotated refresh token.
    #[error("Invalid or expired refresh token")]
    RefreshToken,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::WrongCredentials | AuthError::RefreshToken | AuthError::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InactiveUser => StatusCode::FORBIDDEN,
            AuthError::UsernameTaken => StatusCode::CONFLICT,
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::Database(_) | AuthError::Password(_) | AuthError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show a client. Internal failures are not described.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::Password(_) | AuthError::Token(_) => {
                "Internal server error".to_string()
            }
            AuthError::InvalidInput(reason) => (*reason).to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Authentication backend failure");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.client_message(),
            }),
        )
            .into_response()
    }
}
