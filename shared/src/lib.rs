//! Shared types for the gym concierge control panel
//!
//! Persisted models (tenant configuration, subscription, trial override,
//! interaction logs) and the unified error system used by every crate in
//! the workspace.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
