//! Error Types for the ClusterIQ API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ciq_core::{ConfigError, InventoryError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested account is not in the held snapshot
    AccountNotFound,

    /// No route matches the request path
    RouteNotFound,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Startup configuration is invalid
    InvalidConfiguration,

    /// The inventory could not be loaded from the snapshot store
    SnapshotUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::AccountNotFound | ErrorCode::RouteNotFound => StatusCode::NOT_FOUND,

            ErrorCode::SnapshotUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError | ErrorCode::InvalidConfiguration => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::AccountNotFound => "Account not found",
            ErrorCode::RouteNotFound => "Route not found",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::InvalidConfiguration => "Invalid configuration",
            ErrorCode::SnapshotUnavailable => "Inventory snapshot unavailable",
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

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn account_not_found(name: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::AccountNotFound,
            format!("Account '{}' not found", name),
        )
    }

    pub fn route_not_found(path: impl fmt::Display) -> Self {
        Self::new(ErrorCode::RouteNotFound, format!("No route for {}", path))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn snapshot_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SnapshotUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::AccountNotFound { name } => ApiError::account_not_found(name),
            // The cache serves last known good instead of returning these;
            // reaching this arm means a caller bypassed it.
            InventoryError::Retrieval(_) | InventoryError::Deserialization { .. } => {
                tracing::error!(error = %err, "Inventory refresh failure reached the API layer");
                ApiError::snapshot_unavailable(err.to_string())
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::InvalidConfiguration, err.to_string())
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ciq_core::RetrievalError;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::AccountNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::RouteNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::SnapshotUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::InvalidConfiguration.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_no_code_maps_to_bad_request() -> Result<(), serde_json::Error> {
        // Every route is parameterless or takes a free-form name.
        let codes = [
            ErrorCode::AccountNotFound,
            ErrorCode::RouteNotFound,
            ErrorCode::InternalError,
            ErrorCode::InvalidConfiguration,
            ErrorCode::SnapshotUnavailable,
        ];
        for code in codes {
            assert_ne!(code.status_code(), StatusCode::BAD_REQUEST, "{}", code);
        }
        assert!(serde_json::from_str::<ErrorCode>("\"INVALID_INPUT\"").is_err());
        Ok(())
    }

    #[test]
    fn test_account_not_found_body() -> Result<(), serde_json::Error> {
        let err: ApiError = InventoryError::AccountNotFound {
            name: "acct9".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let json = serde_json::to_value(&err)?;
        assert_eq!(json["code"], "ACCOUNT_NOT_FOUND");
        assert!(json["message"].as_str().unwrap_or_default().contains("acct9"));
        assert!(json.get("details").is_none());
        Ok(())
    }

    #[test]
    fn test_refresh_failure_maps_to_unavailable() {
        let err: ApiError = InventoryError::Retrieval(RetrievalError::KeyNotFound {
            key: "Stock".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::SnapshotUnavailable);
    }

    #[test]
    fn test_config_error_conversion() {
        let err: ApiError = ConfigError::InvalidValue {
            field: "CIQ_API_PORT".to_string(),
            value: "http".to_string(),
            reason: "not a port number".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        assert!(err.message.contains("CIQ_API_PORT"));
    }

    #[test]
    fn test_api_error_with_details() {
        let details = serde_json::json!({ "path": "/nope" });
        let err = ApiError::route_not_found("/nope").with_details(details.clone());
        assert_eq!(err.details, Some(details));
    }

    #[test]
    fn test_error_serialization_round_trip() -> Result<(), serde_json::Error> {
        let err = ApiError::from_code(ErrorCode::InternalError);
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("INTERNAL_ERROR"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::internal_error("Bind failed");
        let display = format!("{}", err);
        assert!(display.contains("InternalError"));
        assert!(display.contains("Bind failed"));
    }
}
