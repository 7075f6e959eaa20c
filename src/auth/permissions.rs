//! Ordered permission checks run before a protected handler.

use axum::http::Method;

use crate::db::User;

use super::errors::AuthError;

/// What a permission check may know about the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
}

/// A single check. `None` means no user could be resolved for the request.
pub type Permission = fn(Option<&User>, &RequestContext) -> Result<(), AuthError>;

/// A request must carry a resolvable user.
pub fn is_authenticated(user: Option<&User>, _ctx: &RequestContext) -> Result<(), AuthError> {
    match user {
        Some(_) => Ok(()),
        None => Err(AuthError::NotAuthenticated),
    }
}

/// The resolved user must be active.
pub fn is_active(user: Option<&User>, _ctx: &RequestContext) -> Result<(), AuthError> {
    match user {
        Some(user) if user.is_active => Ok(()),
        Some(_) => Err(AuthError::InactiveUser),
        None => Err(AuthError::NotAuthenticated),
    }
}

/// Run `checks` in order. The first failure wins.
pub fn check_permissions(
    checks: &[Permission],
    user: Option<&User>,
    ctx: &RequestContext,
) -> Result<(), AuthError> {
    checks.iter().try_for_each(|check| check(user, ctx))
}

/// A static list of checks attached to an extractor.
pub trait PermissionSet: Send + Sync + 'static {
    const CHECKS: &'static [Permission];
}

/// Any authenticated user.
pub struct AuthenticatedOnly;

impl PermissionSet for AuthenticatedOnly {
    const CHECKS: &'static [Permission] = &[is_authenticated];
}

/// An authenticated user whose account is active.
pub struct ActiveUserOnly;

impl PermissionSet for ActiveUserOnly {
    const CHECKS: &'static [Permission] = &[is_authenticated, is_active];
}
