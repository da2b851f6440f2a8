use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::streak::StreakMemorial;

/// How a study event changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyOutcome {
    /// Already studied today; only the last study time moved.
    Refreshed,
    /// A new streak of one day began.
    Started,
    /// The running streak grew by one day.
    Extended,
}

/// Every streak state change produces an Event.
/// Presentation code renders them; the session logs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    StateLoaded {
        current_streak: u32,
        longest_streak: u32,
        at: DateTime<Utc>,
    },
    StudyRecorded {
        outcome: StudyOutcome,
        current_streak: u32,
        longest_streak: u32,
        /// Set when this study event was the first to notice a lapse.
        memorial: Option<StreakMemorial>,
        at: DateTime<Utc>,
    },
    StreakBroken {
        memorial: StreakMemorial,
        at: DateTime<Utc>,
    },
    StreakReset {
        at: DateTime<Utc>,
    },
    /// Authentication ended; in-memory state was cleared.
    SignedOut {
        at: DateTime<Utc>,
    },
}
