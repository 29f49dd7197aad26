// ============================
// filestation-lib/src/middleware/session_gate.rs
// ============================
//! Session gate: redirect unauthenticated requests to the login page.
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::AppState;

/// Cookie carrying the session token; a convention shared with the HTTP
/// layer, not part of the auth engine itself.
pub const SESSION_COOKIE: &str = "session_token";

/// Where unauthenticated requests are sent.
pub const LOGIN_PATH: &str = "/admin/login";

/// Require a valid session cookie; otherwise redirect to the login page.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match session_cookie(request.headers()) {
        Some(token) if state.auth.verify_session(&token) => next.run(request).await,
        _ => Redirect::to(LOGIN_PATH).into_response(),
    }
}

/// Extract the session token from the `Cookie` header, if present.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}
