//! Unified error codes for the control panel core
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Validation errors (user input, always user-facing)
//! - 2xxx: Precondition errors (blocked action, user must resolve)
//! - 3xxx: Transient I/O errors (collaborator call failed, retryable)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility with the panel frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,

    // ==================== 1xxx: Validation ====================
    /// Coupon code is not in the registry
    CouponInvalid = 1001,
    /// Coupon only applies to purchases above the base fee
    CouponIneligible = 1002,
    /// Required training fields are missing
    TrainingIncomplete = 1003,
    /// Feature is locked for the current plan
    FeatureLocked = 1004,
    /// Feature combination is not allowed
    FeatureConflict = 1005,

    // ==================== 2xxx: Precondition ====================
    /// Trial period has ended
    TrialExpired = 2001,
    /// No messaging channel is connected
    NoChannelConnected = 2002,
    /// An extra channel must be purchased first
    ExtraChannelRequired = 2003,
    /// A connect attempt is already running
    ConnectInProgress = 2004,
    /// Session has not finished loading
    SessionNotReady = 2006,
    /// Connection state transition not allowed
    InvalidTransition = 2007,

    // ==================== 3xxx: Transient I/O ====================
    /// Messaging gateway call failed
    GatewayUnavailable = 3001,
    /// Persistence call failed
    PersistenceFailed = 3002,
    /// Conversation webhook call failed
    WebhookFailed = 3003,
    /// Conversation webhook call timed out
    WebhookTimeout = 3004,
    /// Checkout call failed
    CheckoutFailed = 3005,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Configuration error
    ConfigError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Transient failures may be retried by the caller
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        self.code() >= 3000 && self.code() < 4000
    }

    /// Get the user-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",

            // Validation
            ErrorCode::CouponInvalid => "Invalid or expired coupon",
            ErrorCode::CouponIneligible => {
                "Coupon only applies to plans above the base fee. Add an add-on to use it"
            }
            ErrorCode::TrainingIncomplete => "Fill in the assistant training first",
            ErrorCode::FeatureLocked => "This feature is not available on your plan",
            ErrorCode::FeatureConflict => "These options cannot be enabled together",

            // Precondition
            ErrorCode::TrialExpired => "Your free trial has ended. Upgrade to activate the assistant",
            ErrorCode::NoChannelConnected => "Connect WhatsApp first",
            ErrorCode::ExtraChannelRequired => "Purchase an extra channel in the subscription tab",
            ErrorCode::ConnectInProgress => "A connection attempt is already in progress",
            ErrorCode::SessionNotReady => "Configuration is still loading",
            ErrorCode::InvalidTransition => "Connection state change not allowed",

            // Transient
            ErrorCode::GatewayUnavailable => "Messaging gateway did not respond",
            ErrorCode::PersistenceFailed => "Could not save changes",
            ErrorCode::WebhookFailed => "Assistant workflow returned an error",
            ErrorCode::WebhookTimeout => "The assistant took too long to answer. Try again shortly",
            ErrorCode::CheckoutFailed => "Could not open the automatic checkout",

            // System
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),

            // Validation
            1001 => Ok(ErrorCode::CouponInvalid),
            1002 => Ok(ErrorCode::CouponIneligible),
            1003 => Ok(ErrorCode::TrainingIncomplete),
            1004 => Ok(ErrorCode::FeatureLocked),
            1005 => Ok(ErrorCode::FeatureConflict),

            // Precondition
            2001 => Ok(ErrorCode::TrialExpired),
            2002 => Ok(ErrorCode::NoChannelConnected),
            2003 => Ok(ErrorCode::ExtraChannelRequired),
            2004 => Ok(ErrorCode::ConnectInProgress),
            2006 => Ok(ErrorCode::SessionNotReady),
            2007 => Ok(ErrorCode::InvalidTransition),

            // Transient
            3001 => Ok(ErrorCode::GatewayUnavailable),
            3002 => Ok(ErrorCode::PersistenceFailed),
            3003 => Ok(ErrorCode::WebhookFailed),
            3004 => Ok(ErrorCode::WebhookTimeout),
            3005 => Ok(ErrorCode::CheckoutFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
