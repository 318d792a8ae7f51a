//! Error Types for the procedure layer
//!
//! Every procedure failure is reported as an [`ApiError`]: a stable
//! [`ErrorCode`], a human-readable message and optional details. The code
//! carries an HTTP-style status so any transport can map it directly.

use fitbase_core::{FitError, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors (400, 404)
    // ========================================================================
    /// Payload or filter violates the table schema
    ValidationFailed,

    /// Procedure input could not be decoded
    InvalidInput,

    /// Lookup by id found no row
    EntityNotFound,

    /// No procedure with that name
    UnknownProcedure,

    // ========================================================================
    // Upstream Errors (502, 503)
    // ========================================================================
    /// Data service answered with a failure status or an unreadable body
    UpstreamError,

    /// Data service could not be reached
    ServiceUnavailable,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Table declarations are invalid
    SchemaInvalid,

    /// Service configuration is missing or invalid
    ConfigInvalid,

    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput => 400,
            ErrorCode::EntityNotFound | ErrorCode::UnknownProcedure => 404,
            ErrorCode::UpstreamError => 502,
            ErrorCode::ServiceUnavailable => 503,
            ErrorCode::SchemaInvalid | ErrorCode::ConfigInvalid | ErrorCode::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn unknown_procedure(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownProcedure,
            format!("No procedure named '{}'", name),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<FitError> for ApiError {
    fn from(err: FitError) -> Self {
        let code = match &err {
            FitError::Schema(_) => ErrorCode::SchemaInvalid,
            FitError::Validation(_) => ErrorCode::ValidationFailed,
            FitError::NotFound { .. } => ErrorCode::EntityNotFound,
            FitError::Transport(TransportError::Unreachable { .. }) => {
                ErrorCode::ServiceUnavailable
            }
            FitError::Transport(_) => ErrorCode::UpstreamError,
            FitError::Config(_) => ErrorCode::ConfigInvalid,
        };
        // Inner message, without the wrapper's prefix.
        let message = match &err {
            FitError::Schema(e) => e.to_string(),
            FitError::Validation(e) => e.to_string(),
            FitError::Transport(e) => e.to_string(),
            FitError::Config(e) => e.to_string(),
            FitError::NotFound { .. } => err.to_string(),
        };
        let api = Self::new(code, message);
        match &err {
            FitError::Transport(TransportError::Status { status, .. }) => {
                api.with_details(serde_json::json!({ "upstreamStatus": status }))
            }
            _ => api,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_error(format!("Failed to serialize result: {}", err))
    }
}

/// Result type for procedure calls.
pub type ApiResult<T> = Result<T, ApiError>;
