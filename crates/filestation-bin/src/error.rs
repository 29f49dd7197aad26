//! Error type for the file-share surface + axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use filestation_lib::error::AuthError;

/// Failures in the file-share glue around the auth core.
#[derive(Error, Debug)]
pub enum ShareError {
    #[error("file not found")]
    NotFound,

    #[error("invalid filename")]
    InvalidFilename,

    #[error("wrong file password")]
    WrongPassword,

    #[error("upload rejected: {0}")]
    BadUpload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ShareError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShareError::NotFound => StatusCode::NOT_FOUND,
            ShareError::InvalidFilename | ShareError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ShareError::WrongPassword => StatusCode::FORBIDDEN,
            ShareError::Io(_) | ShareError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ShareError::Auth(auth) => auth.status_code(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ShareError::NotFound => "FILE_001",
            ShareError::InvalidFilename => "FILE_002",
            ShareError::WrongPassword => "FILE_003",
            ShareError::BadUpload(_) => "FILE_004",
            ShareError::Io(_) => "IO_001",
            ShareError::Json(_) => "JSON_001",
            ShareError::Auth(auth) => auth.error_code(),
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            ShareError::NotFound => "File not found".to_string(),
            ShareError::InvalidFilename => "Invalid filename".to_string(),
            ShareError::WrongPassword => "Wrong password".to_string(),
            ShareError::BadUpload(reason) => format!("Upload rejected: {reason}"),
            ShareError::Io(_) | ShareError::Json(_) => {
                "An internal server error occurred".to_string()
            },
            ShareError::Auth(auth) => auth.sanitized_message(),
        }
    }
}

impl IntoResponse for ShareError {
    fn into_response(self) -> Response {
        // auth failures keep their own response envelope
        if let ShareError::Auth(auth) = self {
            return auth.into_response();
        }

        let status = self.status_code();
        let body = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.sanitized_message(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}
