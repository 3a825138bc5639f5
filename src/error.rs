/// Unified error types for the store authentication service
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed or missing input
    #[error("Validation error")]
    Validation(Vec<FieldError>),

    /// Duplicate email or username
    #[error("{} already exists", conflict_label(.field))]
    Conflict { field: &'static str },

    /// Identifier or password did not match. The message never says which.
    #[error("Invalid email/username or password")]
    InvalidCredentials,

    /// Access or refresh token failed verification
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Password reset token unknown, already used or past its expiry
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    /// Role gate rejection
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity absent
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid session where one is required
    #[error("{0}")]
    Unauthorized(String),

    /// Current password did not match on change-password
    #[error("Current password is incorrect")]
    IncorrectPassword,

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Token encoding errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Password hashing errors
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn conflict_label(field: &str) -> &'static str {
    match field {
        "email" => "Email",
        "userName" => "Username",
        _ => "Record",
    }
}

impl AuthError {
    /// Single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AuthError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::IncorrectPassword => StatusCode::BAD_REQUEST,
            AuthError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            AuthError::Conflict { .. } => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Database(_)
            | AuthError::Jwt(_)
            | AuthError::Hashing(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Unreadable request bodies surface as a validation error on `body`
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::invalid("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AuthError {
    fn from(rejection: QueryRejection) -> Self {
        AuthError::invalid("query", rejection.body_text())
    }
}

/// Error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = if self.is_internal() {
            tracing::error!(error = %self, "Request failed with internal error");
            ErrorResponse {
                success: false,
                message: "An error occurred".to_string(), // Don't leak details
                errors: None,
            }
        } else {
            let message = self.to_string();
            let errors = match self {
                AuthError::Validation(errors) => Some(errors),
                _ => None,
            };
            ErrorResponse {
                success: false,
                message,
                errors,
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for service operations
pub type AuthResult<T> = Result<T, AuthError>;
