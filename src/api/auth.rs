//! Authentication API endpoints.
//!
//! - POST `/register` - Create a user
//! - POST `/login` - Exchange credentials for a token pair (JSON + cookies)
//! - POST `/refresh` - Rotate the refresh token cookie into a new pair
//! - POST `/logout` - End the session and clear cookies
//! - GET `/me` - The active user behind the access token

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{
    AuthError, Authorized, REFRESH_COOKIE_NAME, SessionManager, clear_auth_cookies, get_cookie,
    session_cookies,
};
use crate::impl_has_auth_backend;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionManager,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

#[derive(Deserialize)]
struct CredentialsRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct RegisteredUser {
    id: i64,
    username: String,
}

#[derive(Serialize)]
struct CurrentUser {
    id: i64,
    username: String,
    is_active: bool,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn register(
    State(state): State<AuthState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state.sessions.register(&req.username, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            id: user.id,
            username: user.username,
        }),
    ))
}

async fn login(
    State(state): State<AuthState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let pair = state.sessions.login(&req.username, &req.password).await?;

    Ok((
        AppendHeaders(session_cookies(&pair, state.secure_cookies)),
        Json(pair),
    ))
}

/// Rotate the refresh token. Any failure clears both cookies.
async fn refresh(State(state): State<AuthState>, headers: HeaderMap) -> Response {
    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME).and_then(|raw| Uuid::parse_str(raw).ok());

    let result = match presented {
        Some(token) => state.sessions.refresh(token).await,
        None => Err(AuthError::RefreshToken),
    };

    match result {
        Ok(pair) => (
            AppendHeaders(session_cookies(&pair, state.secure_cookies)),
            Json(pair),
        )
            .into_response(),
        Err(e) => (AppendHeaders(clear_auth_cookies(state.secure_cookies)), e).into_response(),
    }
}

/// Revoke the refresh token. Cookies are cleared whether or not it was valid.
async fn logout(State(state): State<AuthState>, headers: HeaderMap) -> Response {
    let cleared = AppendHeaders(clear_auth_cookies(state.secure_cookies));

    match state
        .sessions
        .logout(get_cookie(&headers, REFRESH_COOKIE_NAME))
        .await
    {
        Ok(()) => (
            cleared,
            Json(MessageResponse {
                message: "Logged out",
            }),
        )
            .into_response(),
        Err(e) => (cleared, e).into_response(),
    }
}

async fn me(auth: Authorized) -> Json<CurrentUser> {
    let user = auth.into_user();
    Json(CurrentUser {
        id: user.id,
        username: user.username,
        is_active: user.is_active,
    })
}
