// ============================
// filestation-lib/src/error.rs
// ============================
//! Central error type + axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::password::PolicyViolation;

/// Authentication failures surfaced to the request layer.
///
/// Everything except `Hashing` is a normal, recoverable outcome of a
/// request. `Hashing` outside of startup means the environment is broken;
/// it is reported as a server error rather than unwinding the process.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("password policy violation: {0}")]
    Policy(#[from] PolicyViolation),

    #[error("too many failed login attempts")]
    RateLimited,

    #[error("invalid CSRF token")]
    CsrfRejected,

    #[error("hashing failure: {0}")]
    Hashing(anyhow::Error),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AuthError::Policy(_) => StatusCode::BAD_REQUEST,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::CsrfRejected => StatusCode::FORBIDDEN,
            AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential => "AUTH_001",
            AuthError::Policy(_) => "AUTH_002",
            AuthError::RateLimited => "AUTH_003",
            AuthError::CsrfRejected => "CSRF_001",
            AuthError::Hashing(_) => "HASH_001",
        }
    }

    /// Get a sanitized message suitable for production use.
    ///
    /// Login and CSRF failures collapse to a single message each so that
    /// callers cannot distinguish missing from expired tokens.
    pub fn sanitized_message(&self) -> String {
        match self {
            AuthError::InvalidCredential => "Authentication failed".to_string(),
            // the policy reason is user-actionable and safe to show
            AuthError::Policy(violation) => violation.to_string(),
            AuthError::RateLimited => {
                "Too many login attempts, please try again later".to_string()
            },
            AuthError::CsrfRejected => "Invalid CSRF token".to_string(),
            AuthError::Hashing(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": self.sanitized_message(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
