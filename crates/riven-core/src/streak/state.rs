//! Streak state, memorials, and the wire DTO.
//!
//! [`StreakState`] is the in-memory truth owned by the engine. The DTO is the
//! loose JSON shape exchanged with persistence gateways; converting a DTO into
//! a state never fails and always yields a state that satisfies the streak
//! invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::StreakPolicy;

/// Immutable record of a streak that ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakMemorial {
    /// Length in days of the streak that ended (always > 0).
    pub streak: u32,
    pub start_date: Option<DateTime<Utc>>,
    /// Last study instant before the break.
    pub end_date: Option<DateTime<Utc>>,
}

/// Streak state for the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<DateTime<Utc>>,
    pub streak_start_date: Option<DateTime<Utc>>,
    /// Most recent first.
    pub past_streaks: Vec<StreakMemorial>,
}

impl StreakState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Push a memorial at the head and drop the oldest beyond `limit`.
    pub(crate) fn memorialize(&mut self, memorial: StreakMemorial, limit: usize) {
        self.past_streaks.insert(0, memorial);
        self.past_streaks.truncate(limit);
    }

    /// Check the structural invariants. Used by tests and debug assertions.
    pub fn invariants_hold(&self, policy: &StreakPolicy) -> bool {
        let start_matches = if self.current_streak == 0 {
            self.streak_start_date.is_none()
        } else {
            self.streak_start_date.is_some() && self.last_study_date.is_some()
        };
        start_matches
            && self.longest_streak >= self.current_streak
            && self.past_streaks.len() <= policy.history_limit
            && self.past_streaks.iter().all(|m| m.streak > 0)
    }

    /// Build a state from a possibly partial or malformed DTO.
    ///
    /// Missing numbers become 0, missing or unparseable dates become `None`,
    /// and the result is repaired until every invariant holds.
    pub fn from_dto(dto: &StreakStateDto, policy: &StreakPolicy) -> Self {
        let mut state = Self {
            current_streak: clamp_count(dto.current_streak),
            longest_streak: clamp_count(dto.longest_streak),
            last_study_date: parse_instant(dto.last_study_date.as_deref(), "lastStudyDate"),
            streak_start_date: parse_instant(dto.streak_start_date.as_deref(), "streakStartDate"),
            past_streaks: dto
                .past_streaks
                .iter()
                .filter_map(MemorialDto::to_memorial)
                .take(policy.history_limit)
                .collect(),
        };

        if state.current_streak > 0 && state.last_study_date.is_none() {
            tracing::warn!(
                current_streak = state.current_streak,
                "stored streak has no last study date; treating it as ended"
            );
            state.current_streak = 0;
        }
        if state.current_streak == 0 {
            state.streak_start_date = None;
        } else if state.streak_start_date.is_none() {
            state.streak_start_date = state.last_study_date;
        }
        state.longest_streak = state.longest_streak.max(state.current_streak);
        state
    }

    pub fn to_dto(&self) -> StreakStateDto {
        StreakStateDto {
            current_streak: Some(i64::from(self.current_streak)),
            longest_streak: Some(i64::from(self.longest_streak)),
            last_study_date: self.last_study_date.map(|d| d.to_rfc3339()),
            streak_start_date: self.streak_start_date.map(|d| d.to_rfc3339()),
            past_streaks: self
                .past_streaks
                .iter()
                .map(|m| MemorialDto {
                    streak: Some(i64::from(m.streak)),
                    start_date: m.start_date.map(|d| d.to_rfc3339()),
                    end_date: m.end_date.map(|d| d.to_rfc3339()),
                })
                .collect(),
        }
    }
}

/// JSON shape exchanged with persistence gateways.
///
/// Every field is optional on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakStateDto {
    #[serde(default)]
    pub current_streak: Option<i64>,
    #[serde(default)]
    pub longest_streak: Option<i64>,
    #[serde(default)]
    pub last_study_date: Option<String>,
    #[serde(default)]
    pub streak_start_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub past_streaks: Vec<MemorialDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorialDto {
    #[serde(default)]
    pub streak: Option<i64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl MemorialDto {
    fn to_memorial(&self) -> Option<StreakMemorial> {
        let streak = clamp_count(self.streak);
        if streak == 0 {
            return None;
        }
        Some(StreakMemorial {
            streak,
            start_date: parse_instant(self.start_date.as_deref(), "pastStreaks.startDate"),
            end_date: parse_instant(self.end_date.as_deref(), "pastStreaks.endDate"),
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<MemorialDto>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<MemorialDto>>::deserialize(deserializer)?.unwrap_or_default())
}

fn clamp_count(value: Option<i64>) -> u32 {
    value
        .unwrap_or(0)
        .clamp(0, i64::from(u32::MAX))
        .try_into()
        .unwrap_or(0)
}

fn parse_instant(raw: Option<&str>, field: &str) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(field, value = raw, error = %e, "ignoring unparseable timestamp");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> StreakPolicy {
        StreakPolicy::default()
    }

    #[test]
    fn empty_json_is_empty_state() {
        let dto: StreakStateDto = serde_json::from_str("{}").unwrap();
        let state = StreakState::from_dto(&dto, &policy());
        assert!(state.is_empty());
    }

    #[test]
    fn parses_full_payload() {
        let json = r#"{
            "currentStreak": 4,
            "longestStreak": 9,
            "lastStudyDate": "2024-05-04T18:00:00.000Z",
            "streakStartDate": "2024-05-01T08:00:00Z",
            "pastStreaks": [
                {"streak": 9, "startDate": "2024-03-01T10:00:00Z", "endDate": "2024-03-09T10:00:00Z"}
            ]
        }"#;
        let dto: StreakStateDto = serde_json::from_str(json).unwrap();
        let state = StreakState::from_dto(&dto, &policy());

        assert_eq!(state.current_streak, 4);
        assert_eq!(state.longest_streak, 9);
        assert_eq!(
            state.last_study_date,
            Some(Utc.with_ymd_and_hms(2024, 5, 4, 18, 0, 0).unwrap())
        );
        assert_eq!(state.past_streaks.len(), 1);
        assert_eq!(state.past_streaks[0].streak, 9);
        assert!(state.invariants_hold(&policy()));
    }

    #[test]
    fn repairs_malformed_payload() {
        let json = r#"{
            "currentStreak": 3,
            "longestStreak": -2,
            "lastStudyDate": "2024-05-04T18:00:00Z",
            "streakStartDate": "yesterday",
            "pastStreaks": null
        }"#;
        let dto: StreakStateDto = serde_json::from_str(json).unwrap();
        let state = StreakState::from_dto(&dto, &policy());

        assert_eq!(state.current_streak, 3);
        assert_eq!(state.longest_streak, 3);
        // Unparseable start falls back to the last study date
        assert_eq!(state.streak_start_date, state.last_study_date);
        assert!(state.past_streaks.is_empty());
        assert!(state.invariants_hold(&policy()));
    }

    #[test]
    fn streak_without_last_study_is_dropped() {
        let dto = StreakStateDto {
            current_streak: Some(5),
            longest_streak: Some(5),
            streak_start_date: Some("2024-05-01T08:00:00Z".into()),
            ..Default::default()
        };
        let state = StreakState::from_dto(&dto, &policy());
        assert_eq!(state.current_streak, 0);
        assert_eq!(state.streak_start_date, None);
        assert_eq!(state.longest_streak, 5);
    }

    #[test]
    fn history_is_truncated_and_zero_streaks_dropped() {
        let mut past: Vec<MemorialDto> = (1..=12)
            .map(|n| MemorialDto {
                streak: Some(n),
                ..Default::default()
            })
            .collect();
        past.insert(0, MemorialDto::default());
        let dto = StreakStateDto {
            past_streaks: past,
            ..Default::default()
        };
        let state = StreakState::from_dto(&dto, &policy());

        assert_eq!(state.past_streaks.len(), 10);
        assert_eq!(state.past_streaks[0].streak, 1);
        assert_eq!(state.past_streaks[9].streak, 10);
    }

    #[test]
    fn dto_uses_camel_case_on_the_wire() {
        let state = StreakState {
            current_streak: 2,
            longest_streak: 2,
            last_study_date: Some(Utc.with_ymd_and_hms(2024, 5, 4, 18, 0, 0).unwrap()),
            streak_start_date: Some(Utc.with_ymd_and_hms(2024, 5, 3, 18, 0, 0).unwrap()),
            past_streaks: Vec::new(),
        };
        let value = serde_json::to_value(state.to_dto()).unwrap();
        assert_eq!(value["currentStreak"], 2);
        assert_eq!(value["lastStudyDate"], "2024-05-04T18:00:00+00:00");
        assert!(value["pastStreaks"].as_array().unwrap().is_empty());
    }
}
