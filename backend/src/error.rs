use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Rule(#[from] TaskRuleError),

    #[error("Internal server error")]
    InternalServerError,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Task not found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Rule(rule) => {
                let status = match rule {
                    TaskRuleError::Reopen => StatusCode::CONFLICT,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, rule.to_string())
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Migration(e) => {
                error!("migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}

/// Task writes the store refuses regardless of who asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskRuleError {
    #[error("Title and reminder time are required")]
    MissingFields,

    #[error("Title must not be empty")]
    BlankTitle,

    #[error("Completed tasks cannot be reopened")]
    Reopen,
}

/// Failures talking to the Task Store from the reminder side.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("authentication rejected by task store")]
    Unauthorized,

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("task store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<TaskRuleError> for StoreError {
    fn from(rule: TaskRuleError) -> Self {
        StoreError::Rejected(rule.to_string())
    }
}

impl StoreError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum AudioError {
    /// Playback refused by the host until a user gesture has happened.
    #[error("playback not allowed: {0}")]
    NotAllowed(String),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AudioError {
    pub fn is_policy(&self) -> bool {
        matches!(self, AudioError::NotAllowed(_))
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
