use crate::services::account_service::AccountError;
use crate::services::asteroid_service::AsteroidError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Upstream error: {message}")]
    Upstream {
        error: String,
        message: String,
        details: Option<String>,
    },

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": msg }))
            }
            AppError::Upstream {
                error,
                message,
                details,
            } => {
                tracing::error!("Upstream error: {} ({:?})", message, details);
                let mut body = json!({ "error": error, "message": message });
                if let Some(details) = details {
                    body["details"] = json!(details);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<AsteroidError> for AppError {
    fn from(err: AsteroidError) -> Self {
        match err {
            AsteroidError::NotFound(name) => {
                AppError::NotFound(format!("Asteroid '{}' not found", name))
            }
            AsteroidError::Feed(e) => AppError::Upstream {
                error: "Failed to fetch cosmic data".to_string(),
                message: e.to_string(),
                details: None,
            },
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => AppError::BadRequest(msg),
            AccountError::AlreadyWatched => AppError::BadRequest(err.to_string()),
            AccountError::Duplicate(msg) => AppError::Conflict(msg),
            AccountError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            AccountError::Unauthorized(msg) => AppError::Unauthorized(msg),
            AccountError::UserNotFound => AppError::NotFound(err.to_string()),
            AccountError::Store(e) => AppError::Internal(e.to_string()),
            AccountError::Token(e) => AppError::Internal(e.to_string()),
        }
    }
}
