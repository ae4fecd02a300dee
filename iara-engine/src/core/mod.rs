//! Configuration and background task management

pub mod config;
pub mod tasks;

pub use config::Config;
pub use tasks::{BackgroundTasks, TaskKind};
