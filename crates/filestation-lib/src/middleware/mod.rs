// ============================
// filestation-lib/src/middleware/mod.rs
// ============================
//! Request filters for the HTTP layer.

pub mod csrf_gate;
pub mod session_gate;

pub use csrf_gate::{require_csrf, CSRF_FORM_FIELD, CSRF_HEADER};
pub use session_gate::{require_session, session_cookie, LOGIN_PATH, SESSION_COOKIE};
