//! Data models
//!
//! Persisted shapes of the external store, serialized with the store's
//! column names.

pub mod config;
pub mod connection;
pub mod interaction;
pub mod subscription;
pub mod trial;

// Re-exports
pub use config::*;
pub use connection::*;
pub use interaction::*;
pub use subscription::*;
pub use trial::*;
