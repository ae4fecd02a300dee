//! Messaging channel connection state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a messaging channel
///
/// Only `Connected` and `Disconnected` are ever written to the store; the
/// intermediate states exist while a pairing attempt is running. Any stored
/// value that is not recognized loads as `Disconnected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Instance creation requested, waiting for the gateway
    Connecting,
    /// Pairing artifact issued, waiting for the phone to scan it
    AwaitingScan,
    Connected,
}

impl ConnectionState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingScan => "awaiting_scan",
            Self::Connected => "connected",
        }
    }

    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// The value that may be persisted as the last confirmed state
    pub const fn confirmed(&self) -> Self {
        match self {
            Self::Connected => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl From<String> for ConnectionState {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "connected" | "open" => Self::Connected,
            "connecting" => Self::Connecting,
            "awaiting_scan" => Self::AwaitingScan,
            _ => Self::Disconnected,
        }
    }
}

impl From<ConnectionState> for &'static str {
    fn from(state: ConnectionState) -> Self {
        state.as_str()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
