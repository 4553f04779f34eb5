use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::model::SwapStatus;

pub type Result<T> = std::result::Result<T, RewearError>;

#[derive(Error, Debug)]
pub enum RewearError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot change swap status from {from} to {to}")]
    InvalidTransition { from: SwapStatus, to: SwapStatus },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Media storage error: {0}")]
    Media(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl RewearError {
    fn status_code(&self) -> StatusCode {
        match self {
            RewearError::Auth(_) => StatusCode::UNAUTHORIZED,
            RewearError::Validation(_) | RewearError::InvalidTransition { .. } => {
                StatusCode::BAD_REQUEST
            }
            RewearError::NotFound(_) => StatusCode::NOT_FOUND,
            RewearError::Config(_)
            | RewearError::Database(_)
            | RewearError::Serialization(_)
            | RewearError::Media(_)
            | RewearError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RewearError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal faults are logged server-side and not echoed to clients.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
            "Internal server error.".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<serde_json::Error> for RewearError {
    fn from(err: serde_json::Error) -> Self {
        RewearError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for RewearError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        RewearError::Auth(err.to_string())
    }
}

impl From<uuid::Error> for RewearError {
    fn from(err: uuid::Error) -> Self {
        RewearError::Validation(err.to_string())
    }
}

impl From<std::io::Error> for RewearError {
    fn from(err: std::io::Error) -> Self {
        RewearError::Io(err.to_string())
    }
}
