#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{body::Body, http::Response};
use catalog_auth::{
    ServerConfig,
    auth::SessionManager,
    config::AuthSettings,
    create_app, create_session_manager,
    db::Database,
    jwt::JwtConfig,
    password::PasswordHasher,
};

pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

/// Cheapest bcrypt cost, so tests are not dominated by hashing.
pub const TEST_BCRYPT_COST: u32 = 4;

pub fn test_settings() -> AuthSettings {
    AuthSettings {
        bcrypt_cost: TEST_BCRYPT_COST,
        ..AuthSettings::default()
    }
}

pub async fn test_config(settings: AuthSettings) -> ServerConfig {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    ServerConfig {
        db,
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        secure_cookies: false,
        auth: settings,
    }
}

/// Create a session manager over a fresh in-memory database.
pub async fn create_test_sessions() -> (SessionManager, Database) {
    create_test_sessions_with(test_settings()).await
}

pub async fn create_test_sessions_with(settings: AuthSettings) -> (SessionManager, Database) {
    let config = test_config(settings).await;
    let sessions = create_session_manager(&config).expect("Failed to build session manager");
    (sessions, config.db)
}

/// A file-backed database in the temp directory, removed on drop.
///
/// Unlike `:memory:`, this gets a multi-connection pool, so concurrent
/// operations actually overlap.
pub struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!(
            "catalog-auth-test-{}-{:016x}.db",
            std::process::id(),
            rand::random::<u64>()
        ));
        Self { path }
    }

    pub async fn open(&self) -> Database {
        let path = self.path.to_str().expect("temp path is UTF-8");
        Database::open(path)
            .await
            .expect("Failed to open file database")
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut sidecar = self.path.clone().into_os_string();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(sidecar);
        }
    }
}

/// Create a session manager over a file database with a real connection pool.
pub async fn create_file_sessions(temp: &TempDatabase) -> (SessionManager, Database) {
    let config = ServerConfig {
        db: temp.open().await,
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        secure_cookies: false,
        auth: test_settings(),
    };
    let sessions = create_session_manager(&config).expect("Failed to build session manager");
    (sessions, config.db)
}

/// Create a test app and return (app, db).
pub async fn create_test_app() -> (axum::Router, Database) {
    let config = test_config(test_settings()).await;
    let app = create_app(&config).expect("Failed to build app");
    (app, config.db)
}

/// A session manager sharing `db` but signing with a different secret.
pub fn foreign_sessions(db: &Database) -> SessionManager {
    SessionManager::new(
        db.clone(),
        Arc::new(JwtConfig::new(b"some-other-secret-nobody-trusts")),
        PasswordHasher::new(TEST_BCRYPT_COST).expect("valid cost"),
    )
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=;", cookie_name)) && c.contains("Max-Age=0"))
}

/// Value of a cookie set by the response, if any.
pub fn cookie_value(cookies: &[String], cookie_name: &str) -> Option<String> {
    let prefix = format!("{}=", cookie_name);
    cookies.iter().find_map(|c| {
        let rest = c.strip_prefix(&prefix)?;
        let value = rest.split(';').next()?;
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Flip one character in the middle of a JWT signature.
pub fn tamper(token: &str) -> String {
    let sig_start = token.rfind('.').expect("JWT has three parts") + 1;
    let mut bytes = token.as_bytes().to_vec();
    let idx = sig_start + (bytes.len() - sig_start) / 2;
    bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
    String::from_utf8(bytes).expect("JWT is ASCII")
}
