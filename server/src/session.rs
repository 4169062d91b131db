//! Two-state session flag carried in a signed cookie.
//!
//! The cookie value is `<username>:<issued-at unix seconds>`. The signature
//! makes it tamper-proof; the timestamp lets the server expire it even if a
//! client ignores `Max-Age`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use time::{Duration, OffsetDateTime};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::debug;

use crate::{error::AppError, state::AppState};

pub const SESSION_COOKIE: &str = "_pokedex_session";
pub const SESSION_TTL: Duration = Duration::hours(1);

/// Username of the current session, if the cookie is present, correctly
/// signed and not older than `SESSION_TTL`.
pub fn current_user(state: &AppState, cookies: &Cookies) -> Option<String> {
    let cookie = cookies.signed(&state.session_key).get(SESSION_COOKIE)?;
    let (username, issued_at) = cookie.value().rsplit_once(':')?;
    let issued_at = OffsetDateTime::from_unix_timestamp(issued_at.parse().ok()?).ok()?;
    let age = OffsetDateTime::now_utc() - issued_at;
    if username.is_empty() || age > SESSION_TTL || age < -Duration::minutes(1) {
        debug!(%age, "rejecting stale session cookie");
        return None;
    }
    Some(username.to_string())
}

pub fn start(state: &AppState, cookies: &Cookies, username: &str) {
    let value = format!("{username}:{}", OffsetDateTime::now_utc().unix_timestamp());
    let cookie = Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.session_cookie_secure)
        .max_age(SESSION_TTL)
        .build();
    cookies.signed(&state.session_key).add(cookie);
}

pub fn end(state: &AppState, cookies: &Cookies) {
    let cookie = Cookie::build(SESSION_COOKIE).path("/").build();
    cookies.signed(&state.session_key).remove(cookie);
}

/// Route layer for everything behind login.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match current_user(&state, &cookies) {
        Some(username) => {
            debug!(%username, "session accepted");
            Ok(next.run(request).await)
        }
        None => Err(AppError::Unauthorized),
    }
}
