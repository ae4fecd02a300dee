//! Operator trial override

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of `user_trial_settings`
///
/// An operator may grant a tenant a custom trial length with an explicit
/// start. The override only counts when both fields are present and the
/// day count is positive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialOverride {
    #[serde(default)]
    pub trial_days: Option<i64>,
    #[serde(default)]
    pub trial_start_date: Option<DateTime<Utc>>,
}

impl TrialOverride {
    /// Start and duration in hours when the override is usable
    pub fn window(&self) -> Option<(DateTime<Utc>, i64)> {
        match (self.trial_days, self.trial_start_date) {
            (Some(days), Some(start)) if days > 0 => Some((start, days * 24)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_requires_both_fields() {
        let row: TrialOverride =
            serde_json::from_str(r#"{"trial_days": 7, "trial_start_date": "2026-01-01T00:00:00Z"}"#)
                .unwrap();
        let (start, hours) = row.window().unwrap();
        assert_eq!(hours, 168);
        assert_eq!(start.to_rfc3339(), "2026-01-01T00:00:00+00:00");

        let row: TrialOverride = serde_json::from_str(r#"{"trial_days": 7}"#).unwrap();
        assert!(row.window().is_none());

        let row = TrialOverride {
            trial_days: Some(0),
            trial_start_date: Some(Utc::now()),
        };
        assert!(row.window().is_none());
    }
}
