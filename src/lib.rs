pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod db;
pub mod jwt;
pub mod password;

use api::create_api_router;
use auth::SessionManager;
use axum::Router;
use config::AuthSettings;
use db::Database;
use jwt::JwtConfig;
use password::{PasswordError, PasswordHasher};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Token lifetimes and hashing cost
    pub auth: AuthSettings,
}

/// Build the session manager shared by every request.
pub fn create_session_manager(config: &ServerConfig) -> Result<SessionManager, PasswordError> {
    let jwt = Arc::new(JwtConfig::with_ttls(
        &config.jwt_secret,
        config.auth.access_token_ttl,
        config.auth.refresh_token_ttl,
    ));
    let hasher = PasswordHasher::new(config.auth.bcrypt_cost)?;

    Ok(SessionManager::new(config.db.clone(), jwt, hasher))
}

/// Create the application router with the given configuration.
///
/// Fails only if the configured bcrypt cost is out of range.
pub fn create_app(config: &ServerConfig) -> Result<Router, PasswordError> {
    let sessions = create_session_manager(config)?;

    Ok(Router::new().nest(
        "/api",
        create_api_router(sessions, config.secure_cookies),
    ))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config).map_err(std::io::Error::other)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
