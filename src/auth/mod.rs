//! JWT authentication with persisted refresh sessions.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless) and
//! long-lived refresh tokens (30 days, one database row per user, rotated on
//! every refresh).

mod cookie;
mod credentials;
mod errors;
mod extractors;
mod permissions;
mod session;
mod state;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_auth_cookies, get_bearer_token, get_cookie,
    session_cookies,
};
pub use credentials::CredentialVerifier;
pub use errors::AuthError;
pub use extractors::{Authorized, access_token_from_parts};
pub use permissions::{
    ActiveUserOnly, AuthenticatedOnly, Permission, PermissionSet, RequestContext,
    check_permissions, is_active, is_authenticated,
};
pub use session::{SessionManager, TokenPair};
pub use state::HasAuthBackend;
