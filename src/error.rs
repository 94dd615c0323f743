use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;

/// Field-level validation failure, rendered into the `details` array.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payload too large")]
    PayloadTooLarge,
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(e) => database_status(e),
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AuthenticationFailed | AppError::Internal | AppError::InternalWithMsg(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message exposed to the client. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(e) => database_message(e).to_string(),
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::RateLimited(msg)
            | AppError::Unavailable(msg) => msg.clone(),
            AppError::PayloadTooLarge => "Request entity too large".to_string(),
            AppError::AuthenticationFailed => "Authentication failed".to_string(),
            AppError::Internal | AppError::InternalWithMsg(_) => "Internal server error".to_string(),
        }
    }
}

/// Maps constraint violations onto client-facing errors; anything else is
/// returned unchanged as a database error.
pub fn handle_database_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Resource already exists".into())
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::BadRequest("Invalid reference".into())
        }
        _ => AppError::Database(err),
    }
}

fn database_status(e: &sqlx::Error) -> StatusCode {
    match e {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StatusCode::CONFLICT,
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn database_message(e: &sqlx::Error) -> &'static str {
    match e {
        sqlx::Error::RowNotFound => "Record not found",
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => "Resource already exists",
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => "Invalid reference",
        _ => "Internal server error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Database(e) if status.is_server_error() => error!("Database error: {:?}", e),
            AppError::InternalWithMsg(msg) => error!("Internal error: {}", msg),
            AppError::Internal => error!("Internal error"),
            _ => {}
        }

        let body = match self {
            AppError::Validation(details) => json!({
                "success": false,
                "error": "Validation failed",
                "details": details,
            }),
            other => json!({
                "success": false,
                "error": other.public_message(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::RateLimited("x".into()).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(AppError::AuthenticationFailed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::AuthenticationFailed.public_message(), "Authentication failed");
        assert_eq!(AppError::InternalWithMsg("secret detail".into()).public_message(), "Internal server error");
    }

    #[test]
    fn test_row_not_found_becomes_not_found() {
        let mapped = handle_database_error(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, AppError::NotFound(ref m) if m == "Record not found"));
    }

    #[test]
    fn test_other_database_errors_pass_through() {
        let mapped = handle_database_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(mapped, AppError::Database(sqlx::Error::PoolTimedOut)));
        assert_eq!(mapped.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
