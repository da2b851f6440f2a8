//! Streak engine implementation.
//!
//! The engine is a clock-driven state machine with no I/O of its own. The
//! caller feeds it study events and periodic break checks; every mutation
//! returns the [`Event`] it produced so the caller can persist and publish.
//!
//! ## Lifecycle
//!
//! ```text
//! Unloaded -> Loaded -> (sign out) -> Unloaded
//! ```
//!
//! Mutations are no-ops while `Unloaded`, so an engine that never saw the
//! stored state cannot overwrite it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = StreakEngine::new(SystemClock, StreakPolicy::default());
//! engine.hydrate(stored_state);
//! engine.record_study_event();
//! // On a timer:
//! engine.check_and_break_if_lapsed();
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::StreakPolicy;
use super::state::{StreakMemorial, StreakState, StreakStateDto};
use super::status::{derive_status, StatusReading, StreakStatus};
use crate::clock::{Clock, SystemClock};
use crate::events::{Event, StudyOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// No state fetched yet, or the user signed out.
    Unloaded,
    Loaded,
}

/// Read-only view of the streak handed to presentation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakSnapshot {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<DateTime<Utc>>,
    pub streak_start_date: Option<DateTime<Utc>>,
    pub past_streaks: Vec<StreakMemorial>,
    pub status: StreakStatus,
    pub hours_remaining: u32,
    pub studied_today: bool,
    pub loaded: bool,
}

impl StreakSnapshot {
    /// Snapshot of a signed-out or not yet loaded engine.
    pub fn unloaded() -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
            streak_start_date: None,
            past_streaks: Vec::new(),
            status: StreakStatus::Broken,
            hours_remaining: 0,
            studied_today: false,
            loaded: false,
        }
    }
}

/// Core streak engine.
#[derive(Debug)]
pub struct StreakEngine<C: Clock = SystemClock> {
    clock: C,
    policy: StreakPolicy,
    state: StreakState,
    lifecycle: Lifecycle,
}

impl<C: Clock> StreakEngine<C> {
    pub fn new(clock: C, policy: StreakPolicy) -> Self {
        Self {
            clock,
            policy,
            state: StreakState::empty(),
            lifecycle: Lifecycle::Unloaded,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_loaded(&self) -> bool {
        self.lifecycle == Lifecycle::Loaded
    }

    pub fn state(&self) -> &StreakState {
        &self.state
    }

    pub fn policy(&self) -> &StreakPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn status(&self) -> StatusReading {
        derive_status(self.state.last_study_date, self.clock.now(), &self.policy)
    }

    pub fn studied_today(&self) -> bool {
        self.state
            .last_study_date
            .is_some_and(|last| self.clock.local_date(last) == self.clock.today())
    }

    pub fn snapshot(&self) -> StreakSnapshot {
        if !self.is_loaded() {
            return StreakSnapshot::unloaded();
        }
        let reading = self.status();
        StreakSnapshot {
            current_streak: self.state.current_streak,
            longest_streak: self.state.longest_streak,
            last_study_date: self.state.last_study_date,
            streak_start_date: self.state.streak_start_date,
            past_streaks: self.state.past_streaks.clone(),
            status: reading.status,
            hours_remaining: reading.hours_remaining(),
            studied_today: self.studied_today(),
            loaded: true,
        }
    }

    /// State in wire form, for persistence.
    pub fn to_dto(&self) -> StreakStateDto {
        self.state.to_dto()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Install stored state and mark the engine loaded.
    pub fn hydrate(&mut self, state: StreakState) -> Event {
        self.state = state;
        self.lifecycle = Lifecycle::Loaded;
        debug_assert!(self.state.invariants_hold(&self.policy));
        Event::StateLoaded {
            current_streak: self.state.current_streak,
            longest_streak: self.state.longest_streak,
            at: self.clock.now(),
        }
    }

    /// Install state from a gateway payload; `None` means no record yet.
    pub fn hydrate_dto(&mut self, dto: Option<&StreakStateDto>) -> Event {
        let state = dto
            .map(|dto| StreakState::from_dto(dto, &self.policy))
            .unwrap_or_default();
        self.hydrate(state)
    }

    /// Register a completed study or test session.
    pub fn record_study_event(&mut self) -> Option<Event> {
        if !self.is_loaded() {
            return None;
        }
        let now = self.clock.now();

        if self.state.current_streak > 0 && self.studied_today() {
            self.state.last_study_date = Some(now);
            tracing::debug!(current_streak = self.state.current_streak, "study refreshed");
            return Some(self.study_event(StudyOutcome::Refreshed, None, now));
        }

        let status = derive_status(self.state.last_study_date, now, &self.policy).status;
        let memorial = self.break_if_lapsed(status);

        let outcome = if status == StreakStatus::Broken || self.state.current_streak == 0 {
            self.state.current_streak = 1;
            self.state.streak_start_date = Some(now);
            StudyOutcome::Started
        } else {
            self.state.current_streak = self.state.current_streak.saturating_add(1);
            StudyOutcome::Extended
        };
        self.state.last_study_date = Some(now);
        self.state.longest_streak = self.state.longest_streak.max(self.state.current_streak);

        debug_assert!(self.state.invariants_hold(&self.policy));
        tracing::debug!(
            ?outcome,
            current_streak = self.state.current_streak,
            longest_streak = self.state.longest_streak,
            "study recorded"
        );
        Some(self.study_event(outcome, memorial, now))
    }

    /// Close out a lapsed streak, if any.
    pub fn check_and_break_if_lapsed(&mut self) -> Option<Event> {
        if !self.is_loaded() {
            return None;
        }
        let now = self.clock.now();
        let status = derive_status(self.state.last_study_date, now, &self.policy).status;
        let memorial = self.break_if_lapsed(status)?;
        Some(Event::StreakBroken { memorial, at: now })
    }

    /// Clear everything, history included.
    pub fn reset(&mut self) -> Option<Event> {
        if !self.is_loaded() {
            return None;
        }
        self.state = StreakState::empty();
        tracing::info!("streak state reset");
        Some(Event::StreakReset {
            at: self.clock.now(),
        })
    }

    /// Drop in-memory state after the user signs out. Nothing is persisted.
    pub fn sign_out(&mut self) -> Option<Event> {
        if !self.is_loaded() {
            return None;
        }
        self.state = StreakState::empty();
        self.lifecycle = Lifecycle::Unloaded;
        Some(Event::SignedOut {
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn break_if_lapsed(&mut self, status: StreakStatus) -> Option<StreakMemorial> {
        if status != StreakStatus::Broken || self.state.current_streak == 0 {
            return None;
        }
        let memorial = StreakMemorial {
            streak: self.state.current_streak,
            start_date: self.state.streak_start_date,
            end_date: self.state.last_study_date,
        };
        self.state
            .memorialize(memorial.clone(), self.policy.history_limit);
        self.state.current_streak = 0;
        self.state.streak_start_date = None;
        tracing::info!(
            streak = memorial.streak,
            memorials = self.state.past_streaks.len(),
            "streak lapsed"
        );
        Some(memorial)
    }

    fn study_event(
        &self,
        outcome: StudyOutcome,
        memorial: Option<StreakMemorial>,
        at: DateTime<Utc>,
    ) -> Event {
        Event::StudyRecorded {
            outcome,
            current_streak: self.state.current_streak,
            longest_streak: self.state.longest_streak,
            memorial,
            at,
        }
    }
}
