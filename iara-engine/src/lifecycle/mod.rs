//! Trial and connection lifecycle
//!
//! - [`trial`]: trial window, countdown and the one-shot expiry guard
//! - [`connection`]: gateway connection state machine and pairing view
//! - [`session`]: the tenant session owning all state
//! - [`runner`]: timer loop and command channel driving a session

pub mod connection;
pub mod runner;
pub mod session;
pub mod trial;

pub use connection::{ConnectionEvent, ConnectionTracker, transition};
pub use runner::{SessionCommand, SessionHandle, SessionRunner, SnapshotEdit};
pub use session::{
    CheckoutOutcome, ConfigEdit, Quote, Session, SessionSettings, TenantIdentity,
};
pub use trial::{ExpiryGuard, TrialSource, TrialStatus, TrialWindow, format_countdown};
