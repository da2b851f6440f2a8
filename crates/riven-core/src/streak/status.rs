//! Streak status derived from the time since the last study.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::policy::StreakPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreakStatus {
    Active,
    AtRisk,
    Broken,
}

/// Status together with the time left in the grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReading {
    pub status: StreakStatus,
    /// Never negative.
    pub remaining: Duration,
}

impl StatusReading {
    /// Remaining time rounded up to whole hours.
    pub fn hours_remaining(&self) -> u32 {
        let minutes = self.remaining.num_minutes();
        let has_seconds = self.remaining > Duration::minutes(minutes);
        let minutes = minutes + i64::from(has_seconds);
        u32::try_from((minutes + 59) / 60).unwrap_or(u32::MAX)
    }
}

/// Derive the status of a streak whose last study was `last_study`.
///
/// `remaining <= 0` is broken and `remaining <= at_risk` is at-risk, both
/// inclusive.
pub fn derive_status(
    last_study: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    policy: &StreakPolicy,
) -> StatusReading {
    let Some(last) = last_study else {
        return StatusReading {
            status: StreakStatus::Broken,
            remaining: Duration::zero(),
        };
    };

    let remaining = (last + policy.grace() - now).max(Duration::zero());
    let status = if remaining <= Duration::zero() {
        StreakStatus::Broken
    } else if remaining <= policy.at_risk() {
        StreakStatus::AtRisk
    } else {
        StreakStatus::Active
    };
    StatusReading { status, remaining }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn status_after(elapsed: Duration) -> StatusReading {
        derive_status(Some(now() - elapsed), now(), &StreakPolicy::default())
    }

    #[test]
    fn never_studied_is_broken() {
        let reading = derive_status(None, now(), &StreakPolicy::default());
        assert_eq!(reading.status, StreakStatus::Broken);
        assert_eq!(reading.hours_remaining(), 0);
    }

    #[test]
    fn recent_study_is_active() {
        let reading = status_after(Duration::hours(23));
        assert_eq!(reading.status, StreakStatus::Active);
        assert_eq!(reading.hours_remaining(), 25);
    }

    #[test]
    fn just_under_grace_is_at_risk() {
        let reading = status_after(Duration::hours(47) + Duration::minutes(59));
        assert_eq!(reading.status, StreakStatus::AtRisk);
        assert_eq!(reading.remaining, Duration::minutes(1));
        assert_eq!(reading.hours_remaining(), 1);
    }

    #[test]
    fn just_over_grace_is_broken() {
        let reading = status_after(Duration::hours(48) + Duration::minutes(1));
        assert_eq!(reading.status, StreakStatus::Broken);
        assert_eq!(reading.remaining, Duration::zero());
    }

    #[test]
    fn exactly_twenty_four_hours_is_at_risk() {
        let reading = status_after(Duration::hours(24));
        assert_eq!(reading.status, StreakStatus::AtRisk);
        assert_eq!(reading.hours_remaining(), 24);
    }

    #[test]
    fn exactly_forty_eight_hours_is_broken() {
        assert_eq!(status_after(Duration::hours(48)).status, StreakStatus::Broken);
    }

    #[test]
    fn partial_hours_round_up() {
        let reading = status_after(Duration::hours(30) + Duration::seconds(10));
        // 17h59m50s left
        assert_eq!(reading.hours_remaining(), 18);
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&StreakStatus::AtRisk).unwrap(),
            "\"at-risk\""
        );
    }
}
