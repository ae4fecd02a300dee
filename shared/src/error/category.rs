//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Validation errors
/// - 2xxx: Precondition errors
/// - 3xxx: Transient I/O errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Validation errors (1xxx)
    Validation,
    /// Precondition errors (2xxx)
    Precondition,
    /// Transient I/O errors (3xxx)
    Transient,
    /// System errors (everything else)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Validation,
            2000..3000 => Self::Precondition,
            3000..4000 => Self::Transient,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Validation => "validation",
            Self::Precondition => "precondition",
            Self::Transient => "transient",
            Self::System => "system",
        }
    }

    /// Whether the error should be shown to the tenant as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Validation | Self::Precondition | Self::Transient)
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
