//! Messaging channel connection state machine
//!
//! Every state change goes through [`transition`]; anything not listed in
//! the table is rejected.

use chrono::{DateTime, Utc};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::ConnectionState;

/// Inputs of the connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Tenant asked to pair a new number
    ConnectRequested,
    /// Gateway created the instance
    InstanceCreated,
    /// Gateway refused or failed to create the instance
    CreateFailed,
    /// Gateway reported the session open
    Confirmed,
    /// A status check reported the session not open
    Lost,
    /// Tenant logged the session out
    LoggedOut,
    /// Trial expiry took the channel down
    ForcedPause,
}

/// Transition table
///
/// | from | event | to |
/// |------|-------|----|
/// | Disconnected, AwaitingScan, Connected | ConnectRequested | Connecting |
/// | Connecting | InstanceCreated | AwaitingScan |
/// | Connecting | CreateFailed | Disconnected |
/// | Disconnected, AwaitingScan, Connected | Confirmed | Connected |
/// | Disconnected, AwaitingScan, Connected | Lost, LoggedOut | Disconnected |
/// | any | ForcedPause | Disconnected |
pub fn transition(from: ConnectionState, event: ConnectionEvent) -> AppResult<ConnectionState> {
    use ConnectionEvent as E;
    use ConnectionState as S;

    let to = match (from, event) {
        (S::Connecting, E::ConnectRequested) => {
            return Err(AppError::new(ErrorCode::ConnectInProgress));
        }
        (S::Disconnected | S::AwaitingScan | S::Connected, E::ConnectRequested) => {
            S::Connecting
        }
        (S::Connecting, E::InstanceCreated) => S::AwaitingScan,
        (S::Connecting, E::CreateFailed) => S::Disconnected,
        (S::Disconnected | S::AwaitingScan | S::Connected, E::Confirmed) => S::Connected,
        (S::Disconnected | S::AwaitingScan | S::Connected, E::Lost | E::LoggedOut) => {
            S::Disconnected
        }
        (_, E::ForcedPause) => S::Disconnected,
        (from, event) => {
            return Err(AppError::new(ErrorCode::InvalidTransition)
                .with_detail("from", from.as_str())
                .with_detail("event", format!("{event:?}")));
        }
    };
    Ok(to)
}

/// Live connection state of the gateway channel plus the pairing view
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
    /// QR image as a data URI
    pairing_artifact: Option<String>,
    pairing_open: bool,
    pairing_close_at: Option<DateTime<Utc>>,
    view_focused: bool,
}

impl ConnectionTracker {
    /// Tracker starting from the last persisted state
    pub fn new(persisted: ConnectionState) -> Self {
        Self {
            state: persisted.confirmed(),
            ..Default::default()
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn apply(&mut self, event: ConnectionEvent) -> AppResult<ConnectionState> {
        let next = transition(self.state, event)?;
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, ?event, "Connection state changed");
        }
        self.state = next;
        if next == ConnectionState::Disconnected && event != ConnectionEvent::Lost {
            self.pairing_artifact = None;
        }
        Ok(next)
    }

    // === Pairing view ===

    pub fn open_pairing(&mut self) {
        self.pairing_open = true;
        self.pairing_artifact = None;
        self.pairing_close_at = None;
    }

    pub fn close_pairing(&mut self) {
        self.pairing_open = false;
        self.pairing_close_at = None;
    }

    pub fn is_pairing_open(&self) -> bool {
        self.pairing_open
    }

    pub fn pairing_artifact(&self) -> Option<&str> {
        self.pairing_artifact.as_deref()
    }

    pub fn set_pairing_artifact(&mut self, artifact: String) {
        self.pairing_artifact = Some(artifact);
    }

    /// Close the pairing view at `at` unless it closes earlier
    pub fn schedule_pairing_close(&mut self, at: DateTime<Utc>) {
        if self.pairing_open && self.pairing_close_at.is_none() {
            self.pairing_close_at = Some(at);
        }
    }

    pub fn pairing_close_at(&self) -> Option<DateTime<Utc>> {
        self.pairing_close_at
    }

    /// Close the pairing view if its close time has passed
    pub fn close_pairing_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.pairing_close_at {
            Some(at) if now >= at => {
                self.close_pairing();
                true
            }
            _ => false,
        }
    }

    pub fn set_view_focused(&mut self, focused: bool) {
        self.view_focused = focused;
    }

    /// Whether the status poll should run now
    ///
    /// Polls while waiting for a scan, while the pairing view is open, or
    /// while the connection view is focused and the channel is down. Never
    /// while an instance is being created.
    pub fn should_poll(&self) -> bool {
        if self.state == ConnectionState::Connecting {
            return false;
        }
        self.state == ConnectionState::AwaitingScan
            || self.pairing_open
            || (self.view_focused && !self.is_connected())
    }
}
