use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::waitlist::repo::RepoError;

/// Error returned by route handlers. Always rendered as
/// `{"success": false, "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("Email already exists. Please use a different email.")]
    DuplicateEmail,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Database connection failed")]
    DatabaseUnavailable(#[source] RepoError),

    #[error("{message}")]
    Storage {
        message: &'static str,
        #[source]
        source: RepoError,
    },

    #[error("Server error")]
    Session(#[from] tower_sessions::session::Error),
}

impl ApiError {
    /// Maps a repository failure, using `message` for generic storage errors.
    pub fn from_repo(e: RepoError, message: &'static str) -> Self {
        match e {
            RepoError::DuplicateEmail => ApiError::DuplicateEmail,
            e @ RepoError::Unavailable(_) => ApiError::DatabaseUnavailable(e),
            e @ RepoError::Database(_) => ApiError::Storage { message, source: e },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::DuplicateEmail => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::DatabaseUnavailable(_) | ApiError::Storage { .. } | ApiError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::DatabaseUnavailable(source) | ApiError::Storage { source, .. } => {
                tracing::error!(error = %source, "storage failure");
            }
            ApiError::Session(e) => tracing::error!(error = %e, "session store failure"),
            _ => {}
        }

        let body = json!({ "success": false, "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
