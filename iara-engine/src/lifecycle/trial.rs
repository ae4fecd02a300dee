//! Trial window
//!
//! Resolves when the free trial ends, renders the countdown and tracks the
//! one-way Active -> Expired transition that triggers the forced pause.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use shared::models::TrialOverride;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialSource {
    /// Account creation + default length
    Default,
    /// Operator override
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialWindow {
    pub started_at: DateTime<Utc>,
    pub duration_hours: i64,
    pub source: TrialSource,
}

impl TrialWindow {
    pub fn default_for(created_at: DateTime<Utc>, default_hours: i64) -> Self {
        Self {
            started_at: created_at,
            duration_hours: default_hours.max(0),
            source: TrialSource::Default,
        }
    }

    /// Custom override when usable, default window otherwise
    pub fn resolve(
        created_at: DateTime<Utc>,
        default_hours: i64,
        custom: Option<&TrialOverride>,
    ) -> Self {
        match custom.and_then(TrialOverride::window) {
            Some((started_at, duration_hours)) => Self {
                started_at,
                duration_hours,
                source: TrialSource::Custom,
            },
            None => Self::default_for(created_at, default_hours),
        }
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.started_at + Duration::hours(self.duration_hours)
    }

    pub fn status(&self, now: DateTime<Utc>) -> TrialStatus {
        if now >= self.ends_at() {
            TrialStatus::Expired
        } else {
            TrialStatus::Active
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == TrialStatus::Expired
    }

    /// Time left, never negative
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.ends_at() - now).max(Duration::zero())
    }

    /// Whole hours left, rounded up
    pub fn remaining_hours(&self, now: DateTime<Utc>) -> i64 {
        let ms = self.remaining(now).num_milliseconds();
        (ms + 3_600_000 - 1) / 3_600_000
    }

    pub fn countdown(&self, now: DateTime<Utc>) -> String {
        format_countdown(self.remaining(now))
    }
}

/// `"{d}d {h}h {m}m"` with at least a day left, `"{h}h {m}m {s}s"` below
/// that, `"Expirado"` once nothing is left
pub fn format_countdown(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return "Expirado".to_string();
    }
    let total_secs = remaining.num_seconds();
    let days = total_secs / 86_400;
    let hours = (total_secs / 3_600) % 24;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else {
        format!("{hours}h {minutes}m {seconds}s")
    }
}

/// One-shot guard for the expiry side effect
///
/// Fires once when the window is first seen expired. The guard resets when
/// the window is active again, e.g. after an operator extends the trial.
#[derive(Debug, Default)]
pub struct ExpiryGuard {
    fired: bool,
}

impl ExpiryGuard {
    /// Returns `true` exactly once per expiry
    pub fn observe(&mut self, expired: bool) -> bool {
        if !expired {
            self.fired = false;
            return false;
        }
        if self.fired {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}
