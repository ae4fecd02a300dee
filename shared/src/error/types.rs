//! Error type carried through every core operation

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// This is the primary error type of the core, providing:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages the panel can show inline
/// - Optional structured details for debugging
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a precondition error from its code with the default message
    pub fn precondition(code: ErrorCode) -> Self {
        debug_assert_eq!(code.category(), ErrorCategory::Precondition);
        Self::new(code)
    }

    /// Create a gateway error
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::GatewayUnavailable, msg)
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PersistenceFailed, msg)
    }

    /// Create a webhook error
    pub fn webhook(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::WebhookFailed, msg)
    }

    /// Create a checkout error
    pub fn checkout(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::CheckoutFailed, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a session-not-ready error
    pub fn not_ready() -> Self {
        Self::new(ErrorCode::SessionNotReady)
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
