// ============================
// filestation-lib/src/middleware/csrf_gate.rs
// ============================
//! CSRF gate: state-changing requests must carry a one-time token.
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::error::AuthError;
use crate::AppState;

/// Header carrying the CSRF token when the body is not a form.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Form field carrying the CSRF token.
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Cap on buffered form bodies. CSRF-bearing forms are tiny; anything
/// larger is rejected rather than held in memory.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Pass safe methods through; require a consumable CSRF token otherwise.
///
/// The token comes from the `csrf_token` field of a urlencoded body, or
/// from the `x-csrf-token` header. Consumption removes the token whether or
/// not it was valid, so a rejected request cannot retry with the same one.
pub async fn require_csrf(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let method = request.method();
    if method == Method::GET || method == Method::HEAD {
        return Ok(next.run(request).await);
    }

    let (request, token) = extract_token(request).await?;
    match token {
        Some(token) if state.auth.verify_and_consume_csrf(&token) => Ok(next.run(request).await),
        _ => Err(AuthError::CsrfRejected),
    }
}

/// Pull the CSRF token out of the request, buffering and restoring the body
/// when it is a urlencoded form.
async fn extract_token(request: Request) -> Result<(Request, Option<String>), AuthError> {
    if !is_urlencoded_form(request.headers()) {
        let token = header_token(request.headers());
        return Ok((request, token));
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| AuthError::CsrfRejected)?;

    let token = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
        .ok()
        .and_then(|fields| {
            fields
                .into_iter()
                .find(|(name, _)| name == CSRF_FORM_FIELD)
                .map(|(_, value)| value)
        })
        .or_else(|| header_token(&parts.headers));

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn is_urlencoded_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}
