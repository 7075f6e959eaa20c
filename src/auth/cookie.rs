//! Cookie parsing and formatting for authentication.

use axum::http::{HeaderMap, HeaderName, header};

use super::session::TokenPair;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract a bearer token from the Authorization header.
pub fn get_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn format_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        name, value, max_age, secure
    )
}

/// `Set-Cookie` headers carrying both tokens of a pair.
pub fn session_cookies(pair: &TokenPair, secure: bool) -> [(HeaderName, String); 2] {
    [
        (
            header::SET_COOKIE,
            format_cookie(
                ACCESS_COOKIE_NAME,
                &pair.access_token,
                pair.access_max_age,
                secure,
            ),
        ),
        (
            header::SET_COOKIE,
            format_cookie(
                REFRESH_COOKIE_NAME,
                &pair.refresh_token.hyphenated().to_string(),
                pair.refresh_max_age,
                secure,
            ),
        ),
    ]
}

/// `Set-Cookie` headers that expire both auth cookies.
pub fn clear_auth_cookies(secure: bool) -> [(HeaderName, String); 2] {
    [
        (
            header::SET_COOKIE,
            format_cookie(ACCESS_COOKIE_NAME, "", 0, secure),
        ),
        (
            header::SET_COOKIE,
            format_cookie(REFRESH_COOKIE_NAME, "", 0, secure),
        ),
    ]
}
