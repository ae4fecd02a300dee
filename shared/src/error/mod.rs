//! Unified error system for the control panel core
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by range
//! - [`AppError`]: Rich error type with codes, messages, and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Validation errors
//! - 2xxx: Precondition errors
//! - 3xxx: Transient I/O errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ErrorCategory};
//!
//! let err = AppError::new(ErrorCode::TrialExpired);
//! assert_eq!(err.category(), ErrorCategory::Precondition);
//!
//! let err = AppError::gateway("status call failed").with_detail("action", "status");
//! assert!(err.is_retryable());
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
