// HTTP API Error Types
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::filter::FilterError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),
    /// Any failure to resolve a bearer token. Always answered the same way.
    InvalidToken,

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity
    UnprocessableEntity { field_errors: HashMap<String, String> },

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) | ApiError::InvalidToken => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed(_) => 405,
            ApiError::Conflict(_) => 409,
            ApiError::UnprocessableEntity { .. } => 422,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::MethodNotAllowed(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg) => msg,
            ApiError::InvalidToken => "invalid or missing authentication token",
            ApiError::UnprocessableEntity { .. } => "failed validation",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::UnprocessableEntity { field_errors } => json!({ "error": field_errors }),
            _ => json!({ "error": self.message() }),
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found() -> Self {
        ApiError::NotFound("the requested resource could not be found".to_string())
    }

    pub fn method_not_allowed(method: &str) -> Self {
        ApiError::MethodNotAllowed(format!("the {} method is not supported for this resource", method))
    }

    pub fn edit_conflict() -> Self {
        ApiError::Conflict("unable to update the record due to an edit conflict, please try again".to_string())
    }

    pub fn failed_validation(field_errors: HashMap<String, String>) -> Self {
        ApiError::UnprocessableEntity { field_errors }
    }

    pub fn field(key: &str, message: &str) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(key.to_string(), message.to_string());
        ApiError::UnprocessableEntity { field_errors }
    }

    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("invalid authentication credentials".to_string())
    }

    pub fn invalid_authentication_token() -> Self {
        ApiError::InvalidToken
    }

    pub fn authentication_required() -> Self {
        ApiError::Unauthorized("you must be authenticated to access this resource".to_string())
    }

    pub fn inactive_account() -> Self {
        ApiError::Forbidden("your user account must be activated to access this resource".to_string())
    }

    pub fn not_permitted() -> Self {
        ApiError::Forbidden(
            "your user account doesn't have the necessary permissions to access this resource".to_string(),
        )
    }

    pub fn server_error() -> Self {
        ApiError::InternalServerError(
            "the server encountered a problem and could not process your request".to_string(),
        )
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound => ApiError::not_found(),
            DatabaseError::EditConflict => ApiError::edit_conflict(),
            DatabaseError::DuplicateEmail => {
                ApiError::field("email", "a user with this email address already exists")
            }
            DatabaseError::MissingReference(field) => {
                ApiError::field(field, "must reference an existing record")
            }
            DatabaseError::Filter(err) => err.into(),
            other => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database error: {}", other);
                ApiError::server_error()
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        tracing::warn!("Rejected sort parameter: {}", err);
        ApiError::field("sort", "invalid sort value")
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::error!("Credential error: {}", err);
        ApiError::server_error()
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.to_json())).into_response();
        if matches!(self, ApiError::InvalidToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
