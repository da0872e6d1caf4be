//! Server error type and its JSON rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fairway_engine::Error as EngineError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(sqlx::Error::RowNotFound) | AppError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Engine(EngineError::InsufficientPermissions { .. })
            | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Engine(EngineError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Engine(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message shown to the caller. Storage failures are not described.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(sqlx::Error::RowNotFound) => "Not found".to_string(),
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Forbidden(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, "request failed: {:?}", self);
        } else {
            tracing::debug!(status = %status, "request rejected: {}", self);
        }

        let details = match &self {
            AppError::Internal(msg) => Some(msg.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.public_message(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
