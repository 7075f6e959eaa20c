//! Axum extractors for authentication.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::db::User;

use super::cookie::{ACCESS_COOKIE_NAME, get_bearer_token, get_cookie};
use super::errors::AuthError;
use super::permissions::{ActiveUserOnly, PermissionSet, RequestContext, check_permissions};
use super::state::HasAuthBackend;

/// Access token from the `access_token` cookie, else the `Authorization` header.
pub fn access_token_from_parts(parts: &Parts) -> Option<&str> {
    get_cookie(&parts.headers, ACCESS_COOKIE_NAME).or_else(|| get_bearer_token(&parts.headers))
}

/// Resolve the user behind a request, if any.
///
/// A presented but invalid access token is an error; no token at all is
/// `Ok(None)` so the permission checks decide what anonymity means.
async fn resolve_user<S>(parts: &Parts, state: &S) -> Result<Option<User>, AuthError>
where
    S: HasAuthBackend + Send + Sync,
{
    match access_token_from_parts(parts) {
        Some(token) => state.sessions().current_user(token).await,
        None => Ok(None),
    }
}

/// Extractor for endpoints guarded by a [`PermissionSet`].
///
/// Defaults to [`ActiveUserOnly`].
pub struct Authorized<P: PermissionSet = ActiveUserOnly> {
    pub user: User,
    _checks: PhantomData<fn() -> P>,
}

impl<P: PermissionSet> Authorized<P> {
    pub fn into_user(self) -> User {
        self.user
    }
}

impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: HasAuthBackend + Send + Sync,
    P: PermissionSet,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;

        let ctx = RequestContext {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
        };
        check_permissions(P::CHECKS, user.as_ref(), &ctx)?;

        // An empty check list still requires a user.
        let user = user.ok_or(AuthError::NotAuthenticated)?;

        Ok(Self {
            user,
            _checks: PhantomData,
        })
    }
}
