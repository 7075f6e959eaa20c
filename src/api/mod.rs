mod auth;

use axum::Router;

use crate::auth::SessionManager;

pub use auth::AuthState;

/// Create the API router.
pub fn create_api_router(sessions: SessionManager, secure_cookies: bool) -> Router {
    let auth_state = AuthState {
        sessions,
        secure_cookies,
    };

    Router::new().nest("/auth", auth::router(auth_state))
}
