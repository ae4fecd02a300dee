//! IARA Engine - gym concierge control panel core
//!
//! # Overview
//!
//! - **Pricing** (`pricing`): subtotal, discounts, plan tiers, feature
//!   gating, onboarding rewards and checkout routing. Pure functions.
//! - **Lifecycle** (`lifecycle`): trial window with forced pause on
//!   expiry, gateway connection state machine, tenant session and its runner
//! - **Services** (`services`): collaborator traits (store, gateway,
//!   conversation, checkout, clock) with HTTP and in-memory adapters
//!
//! # Layout
//!
//! ```text
//! iara-engine/src/
//! ├── core/          # configuration, background tasks
//! ├── pricing/       # pricing and entitlement engine
//! ├── lifecycle/     # trial, connection, session, runner
//! ├── services/      # collaborator traits and adapters
//! └── utils/         # logging
//! ```

pub mod core;
pub mod lifecycle;
pub mod pricing;
pub mod services;
pub mod utils;

pub use core::{BackgroundTasks, Config, TaskKind};
pub use lifecycle::{Session, SessionHandle, SessionRunner, SessionSettings, TenantIdentity};
pub use pricing::PricingTable;
pub use services::Collaborators;
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use utils::logger::{init_logger, init_logger_with_file};
