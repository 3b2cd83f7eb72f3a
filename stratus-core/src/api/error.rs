//! API error handling.
//!
//! Provides consistent error responses for both HTTP surfaces.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::Error;

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Stable error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a 400 validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION", message)
    }

    /// Create a 400 not-found error. Unknown ids surface as 400 on this
    /// API, not 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "NOT_FOUND", message)
    }

    /// Create a 503 Service Unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            message,
        )
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::validation(msg),
            Error::AlreadyExistsByName { name } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "ALREADY_EXISTS_BY_NAME",
                format!("a service with name '{name}' already exists"),
            )
            .with_details(serde_json::json!({ "name": name })),
            Error::AlreadyExistsByAddressAndServicePort { address, port } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "ALREADY_EXISTS_BY_ADDRESS_AND_SERVICE_PORT",
                format!("a service with service port {port} at {address} already exists"),
            )
            .with_details(serde_json::json!({ "address": address, "port": port })),
            Error::AlreadyExistsByAddressAndManagementPort { address, port } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "ALREADY_EXISTS_BY_ADDRESS_AND_MANAGEMENT_PORT",
                format!("a service with management port {port} at {address} already exists"),
            )
            .with_details(serde_json::json!({ "address": address, "port": port })),
            Error::InterestAlreadyExists {
                microservice_id,
                category_name,
            } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INTEREST_ALREADY_EXISTS",
                format!(
                    "an interest in category '{category_name}' for service '{microservice_id}' already exists"
                ),
            ),
            Error::NotFound { entity_type, id } => {
                ApiError::not_found(format!("{entity_type} with id '{id}' does not exist"))
            }
            Error::DependencyUnavailable(msg) => {
                tracing::error!("Dependency unavailable: {msg}");
                ApiError::service_unavailable("a required dependency is unavailable")
            }
            Error::Configuration(msg) => ApiError::validation(msg),
            _ => {
                tracing::error!("Unexpected error: {err}");
                ApiError::internal("an unexpected error occurred")
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
