use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tunable streak rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    /// Hours after the last study before the streak breaks.
    pub grace_hours: u32,
    /// Final hours of the grace window reported as at-risk.
    pub at_risk_hours: u32,
    /// Maximum number of memorials kept.
    pub history_limit: usize,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            grace_hours: 48,
            at_risk_hours: 24,
            history_limit: 10,
        }
    }
}

impl StreakPolicy {
    pub fn grace(&self) -> Duration {
        Duration::hours(i64::from(self.grace_hours))
    }

    pub fn at_risk(&self) -> Duration {
        Duration::hours(i64::from(self.at_risk_hours))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.grace_hours == 0 {
            return Err(ValidationError::InvalidValue {
                field: "streak.grace_hours".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.at_risk_hours > self.grace_hours {
            return Err(ValidationError::InvalidValue {
                field: "streak.at_risk_hours".into(),
                message: format!("must not exceed grace_hours ({})", self.grace_hours),
            });
        }
        if self.history_limit == 0 {
            return Err(ValidationError::InvalidValue {
                field: "streak.history_limit".into(),
                message: "must keep at least one memorial".into(),
            });
        }
        Ok(())
    }
}
