//! Error handling for the Greengrocer storefront backend
//!
//! Business-rule violations carry a human-readable message naming the
//! offending entity. Internal failures are logged in full and reported to
//! the caller generically.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{FieldError, TransitionError, Unit};
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation failed on {} field(s)", .0.len())]
    ValidationErrors(Vec<FieldError>),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business rule violations
    #[error("Vegetable not found: {0}")]
    VegetableNotFound(Uuid),

    #[error("{0} is currently unavailable")]
    VegetableUnavailable(String),

    #[error("No price set for {0}")]
    NoPriceSet(String),

    #[error("{name} is not sold by {unit}")]
    UnitNotSold { name: String, unit: Unit },

    #[error("Quantity of {0} is too large")]
    QuantityOutOfRange(String),

    #[error("Insufficient stock for {name}. Available: {available}kg")]
    InsufficientStock { name: String, available: Decimal },

    #[error(transparent)]
    StatusChange(#[from] TransitionError),

    // Storage errors
    #[error("Order number already taken: {0}")]
    OrderNumberConflict(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            details: None,
        }
    }
}

impl AppError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Validation { .. } | AppError::ValidationErrors(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::VegetableNotFound(_) => (StatusCode::BAD_REQUEST, "VEGETABLE_NOT_FOUND"),
            AppError::VegetableUnavailable(_) => {
                (StatusCode::BAD_REQUEST, "VEGETABLE_UNAVAILABLE")
            }
            AppError::NoPriceSet(_) => (StatusCode::BAD_REQUEST, "NO_PRICE_SET"),
            AppError::UnitNotSold { .. } => (StatusCode::BAD_REQUEST, "UNIT_NOT_SOLD"),
            AppError::QuantityOutOfRange(_) => (StatusCode::BAD_REQUEST, "QUANTITY_OUT_OF_RANGE"),
            AppError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"),
            AppError::StatusChange(TransitionError::Terminal(_)) => {
                (StatusCode::BAD_REQUEST, "ORDER_TERMINAL")
            }
            AppError::StatusChange(TransitionError::Invalid { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_STATE_TRANSITION")
            }
            AppError::OrderNumberConflict(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ORDER_NUMBER_CONFLICT")
            }
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Internal(_) | AppError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    /// Expected in normal operation, as opposed to a server fault
    pub fn is_business_error(&self) -> bool {
        !self.status_and_code().0.is_server_error()
    }

    fn detail(&self) -> ErrorDetail {
        let (_, code) = self.status_and_code();
        match self {
            AppError::Validation { field, message } => ErrorDetail {
                field: Some(field.clone()),
                ..ErrorDetail::new(code, message.clone())
            },
            AppError::ValidationErrors(errors) => ErrorDetail {
                details: Some(errors.clone()),
                ..ErrorDetail::new(code, "Validation error")
            },
            AppError::NotFound(resource) => ErrorDetail::new(code, format!("{} not found", resource)),
            AppError::Unauthorized(message) | AppError::Forbidden(message) => {
                ErrorDetail::new(code, message.clone())
            }
            AppError::OrderNumberConflict(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => {
                ErrorDetail::new(code, "An internal server error occurred")
            }
            other => ErrorDetail::new(code, other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
