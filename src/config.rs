//! Tunables for token lifetimes and password hashing.

use crate::jwt::{ACCESS_TOKEN_DURATION_SECS, REFRESH_TOKEN_DURATION_SECS};
use crate::password::DEFAULT_COST;

/// Authentication settings, fixed for the lifetime of the server.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Access token lifetime in seconds
    pub access_token_ttl: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl: u64,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: ACCESS_TOKEN_DURATION_SECS,
            refresh_token_ttl: REFRESH_TOKEN_DURATION_SECS,
            bcrypt_cost: DEFAULT_COST,
        }
    }
}
