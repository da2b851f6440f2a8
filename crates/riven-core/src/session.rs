//! Runtime wiring for the streak engine.
//!
//! A [`StreakSession`] owns one [`StreakEngine`] for the signed-in user and
//! connects it to its collaborators:
//!
//! - the [`PersistenceGateway`], fed through an ordered save queue drained
//!   by a single writer task (saves never block a mutation, and failures are
//!   logged and dropped);
//! - the [`AuthGateway`], consulted before every operation;
//! - subscribers, notified through a `watch` channel after every change;
//! - an optional periodic break checker.
//!
//! The engine lock is never held across an `.await`, so a read right after a
//! mutation always sees the new state even while the save is in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::events::Event;
use crate::gateway::{AuthGateway, PersistenceGateway};
use crate::streak::{StreakEngine, StreakSnapshot, StreakStateDto};

/// Shortest period accepted by [`StreakSession::spawn_break_checker`].
pub const MIN_CHECK_PERIOD: Duration = Duration::from_secs(1);

struct Shared<C: Clock> {
    engine: Mutex<StreakEngine<C>>,
    auth: Arc<dyn AuthGateway>,
    saves: Mutex<Option<mpsc::UnboundedSender<StreakStateDto>>>,
    snapshots: watch::Sender<StreakSnapshot>,
}

impl<C: Clock> Shared<C> {
    fn engine(&self) -> MutexGuard<'_, StreakEngine<C>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when signed in. Clears in-memory state on the first call after
    /// the user signed out.
    fn authorize(&self) -> bool {
        if self.auth.is_authenticated() {
            return true;
        }
        let signed_out = {
            let mut engine = self.engine();
            engine.sign_out().map(|event| (event, engine.snapshot()))
        };
        if let Some((_event, snapshot)) = signed_out {
            tracing::info!("signed out; streak state cleared from memory");
            self.publish(snapshot);
        }
        false
    }

    /// Apply `op` if signed in, then queue a save and notify subscribers.
    fn mutate(&self, op: impl FnOnce(&mut StreakEngine<C>) -> Option<Event>) -> Option<Event> {
        if !self.authorize() {
            return None;
        }
        let (event, dto, snapshot) = {
            let mut engine = self.engine();
            let event = op(&mut engine)?;
            (event, engine.to_dto(), engine.snapshot())
        };
        self.enqueue(dto);
        self.publish(snapshot);
        Some(event)
    }

    fn enqueue(&self, dto: StreakStateDto) {
        let saves = self.saves.lock().unwrap_or_else(PoisonError::into_inner);
        match saves.as_ref() {
            Some(tx) if tx.send(dto).is_ok() => {}
            _ => tracing::warn!("save queue closed; change kept in memory only"),
        }
    }

    fn publish(&self, snapshot: StreakSnapshot) {
        self.snapshots.send_replace(snapshot);
    }

    fn close_queue(&self) {
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Streak engine bound to its gateways for one signed-in session.
pub struct StreakSession<C: Clock + 'static> {
    shared: Arc<Shared<C>>,
    gateway: Arc<dyn PersistenceGateway>,
    writer: Option<JoinHandle<()>>,
    checker: Option<JoinHandle<()>>,
}

impl<C: Clock + 'static> StreakSession<C> {
    /// Wire `engine` to its gateways and start the save writer.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn start(
        engine: StreakEngine<C>,
        gateway: Arc<dyn PersistenceGateway>,
        auth: Arc<dyn AuthGateway>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(engine.snapshot());
        let writer = tokio::spawn(run_writer(Arc::clone(&gateway), rx));

        Self {
            shared: Arc::new(Shared {
                engine: Mutex::new(engine),
                auth,
                saves: Mutex::new(Some(tx)),
                snapshots,
            }),
            gateway,
            writer: Some(writer),
            checker: None,
        }
    }

    /// Fetch the stored state and run an initial break check.
    ///
    /// Gateway failures fall back to the empty state; the engine is marked
    /// loaded either way. Returns `None` when nobody is signed in.
    pub async fn load(&self) -> Option<Event> {
        if !self.shared.authorize() {
            return None;
        }

        let stored = match self.gateway.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    gateway = self.gateway.name(),
                    error = %e,
                    "streak load failed; starting from empty state"
                );
                None
            }
        };

        let (event, broke, dto, snapshot) = {
            let mut engine = self.shared.engine();
            let event = engine.hydrate_dto(stored.as_ref());
            let broke = engine.check_and_break_if_lapsed();
            (event, broke, engine.to_dto(), engine.snapshot())
        };
        tracing::info!(
            gateway = self.gateway.name(),
            current_streak = snapshot.current_streak,
            longest_streak = snapshot.longest_streak,
            "streak loaded"
        );
        if broke.is_some() {
            self.shared.enqueue(dto);
        }
        self.shared.publish(snapshot);
        Some(event)
    }

    pub fn record_study_event(&self) -> Option<Event> {
        self.shared.mutate(|engine| engine.record_study_event())
    }

    pub fn check_and_break_if_lapsed(&self) -> Option<Event> {
        self.shared.mutate(|engine| engine.check_and_break_if_lapsed())
    }

    pub fn reset(&self) -> Option<Event> {
        self.shared.mutate(|engine| engine.reset())
    }

    /// Re-read the auth gateway, clearing state if the user signed out.
    pub fn sync_auth(&self) -> bool {
        self.shared.authorize()
    }

    /// Current view of the streak; empty once the user has signed out.
    pub fn snapshot(&self) -> StreakSnapshot {
        self.shared.authorize();
        self.shared.engine().snapshot()
    }

    /// Receive a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<StreakSnapshot> {
        self.shared.authorize();
        self.shared.snapshots.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.authorize();
        self.shared.engine().is_loaded()
    }

    /// Run `check_and_break_if_lapsed` every `period` until shutdown.
    ///
    /// Periods below [`MIN_CHECK_PERIOD`] are raised to it. Replaces any
    /// checker already running.
    pub fn spawn_break_checker(&mut self, period: Duration) {
        if let Some(previous) = self.checker.take() {
            previous.abort();
        }
        if period < MIN_CHECK_PERIOD {
            tracing::warn!(?period, "break check period too short; using {MIN_CHECK_PERIOD:?}");
        }
        let period = period.max(MIN_CHECK_PERIOD);
        let shared = Arc::clone(&self.shared);
        self.checker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; load already checked.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Some(Event::StreakBroken { memorial, .. }) =
                    shared.mutate(|engine| engine.check_and_break_if_lapsed())
                {
                    tracing::debug!(streak = memorial.streak, "break checker closed streak");
                }
            }
        }));
    }

    /// Stop the break checker and wait for queued saves to finish.
    pub async fn shutdown(mut self) {
        if let Some(checker) = self.checker.take() {
            checker.abort();
        }
        self.shared.close_queue();
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                tracing::warn!(error = %e, "save writer ended abnormally");
            }
        }
    }
}

impl<C: Clock + 'static> Drop for StreakSession<C> {
    fn drop(&mut self) {
        if let Some(checker) = self.checker.take() {
            checker.abort();
        }
        // The writer drains what is already queued, then exits.
        self.shared.close_queue();
    }
}

async fn run_writer(
    gateway: Arc<dyn PersistenceGateway>,
    mut rx: mpsc::UnboundedReceiver<StreakStateDto>,
) {
    while let Some(mut dto) = rx.recv().await {
        // Every payload is the full state, so only the newest matters.
        while let Ok(newer) = rx.try_recv() {
            dto = newer;
        }
        match gateway.save(&dto).await {
            Ok(()) => tracing::debug!(gateway = gateway.name(), "streak saved"),
            Err(e) => tracing::warn!(
                gateway = gateway.name(),
                error = %e,
                "streak save failed; keeping local state"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gateway::{MemoryGateway, StaticAuth};
    use crate::streak::{StreakPolicy, StreakStatus};
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    struct Harness {
        clock: Arc<ManualClock>,
        gateway: Arc<MemoryGateway>,
        auth: Arc<StaticAuth>,
        session: StreakSession<Arc<ManualClock>>,
    }

    fn harness(gateway: MemoryGateway, signed_in: bool) -> Harness {
        let clock = Arc::new(ManualClock::new(start_time()));
        let gateway = Arc::new(gateway);
        let auth = Arc::new(StaticAuth::new(signed_in));
        let engine = StreakEngine::new(clock.clone(), StreakPolicy::default());
        let session = StreakSession::start(engine, gateway.clone(), auth.clone());
        Harness {
            clock,
            gateway,
            auth,
            session,
        }
    }

    #[tokio::test]
    async fn load_failure_falls_back_to_empty() {
        let gateway = MemoryGateway::new();
        gateway.set_fail_load(true);
        let h = harness(gateway, true);

        assert!(h.session.load().await.is_some());
        assert!(h.session.is_loaded());
        assert_eq!(h.session.snapshot().current_streak, 0);

        // Still usable after a failed load
        h.session.record_study_event();
        assert_eq!(h.session.snapshot().current_streak, 1);
    }

    #[tokio::test]
    async fn load_breaks_lapsed_streak_and_saves() {
        let stored = StreakStateDto {
            current_streak: Some(6),
            longest_streak: Some(6),
            last_study_date: Some("2024-06-07T12:00:00Z".into()),
            streak_start_date: Some("2024-06-02T12:00:00Z".into()),
            past_streaks: Vec::new(),
        };
        let h = harness(MemoryGateway::with_state(stored), true);
        h.session.load().await;

        let snap = h.session.snapshot();
        assert_eq!(snap.current_streak, 0);
        assert_eq!(snap.longest_streak, 6);
        assert_eq!(snap.past_streaks[0].streak, 6);

        let gateway = h.gateway.clone();
        h.session.shutdown().await;
        let saved = gateway.stored().unwrap();
        assert_eq!(saved.current_streak, Some(0));
        assert_eq!(saved.past_streaks.len(), 1);
    }

    #[tokio::test]
    async fn study_is_persisted_in_order() {
        let h = harness(MemoryGateway::new(), true);
        h.session.load().await;
        for _ in 0..4 {
            h.session.record_study_event();
            h.clock.advance(ChronoDuration::hours(20));
            tokio::task::yield_now().await;
        }
        assert_eq!(h.session.snapshot().current_streak, 4);

        let gateway = h.gateway.clone();
        h.session.shutdown().await;
        let saves = gateway.saves();
        assert!(!saves.is_empty());
        let streaks: Vec<_> = saves.iter().map(|s| s.current_streak).collect();
        assert!(streaks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(gateway.stored().unwrap().current_streak, Some(4));
    }

    #[tokio::test]
    async fn save_failure_keeps_local_state() {
        let h = harness(MemoryGateway::new(), true);
        h.session.load().await;
        h.gateway.set_fail_save(true);

        h.session.record_study_event();
        tokio::task::yield_now().await;
        assert_eq!(h.session.snapshot().current_streak, 1);
        assert!(h.gateway.stored().is_none());

        // Next successful save reconciles
        h.gateway.set_fail_save(false);
        h.clock.advance(ChronoDuration::hours(20));
        h.session.record_study_event();

        let gateway = h.gateway.clone();
        h.session.shutdown().await;
        assert_eq!(gateway.stored().unwrap().current_streak, Some(2));
    }

    #[tokio::test]
    async fn signed_out_session_is_inert() {
        let h = harness(MemoryGateway::new(), false);
        assert!(h.session.load().await.is_none());
        assert!(h.session.record_study_event().is_none());
        assert!(h.session.reset().is_none());
        assert!(!h.session.snapshot().loaded);

        let gateway = h.gateway.clone();
        h.session.shutdown().await;
        assert!(gateway.saves().is_empty());
    }

    #[tokio::test]
    async fn sign_out_clears_memory_but_not_storage() {
        let h = harness(MemoryGateway::new(), true);
        h.session.load().await;
        h.session.record_study_event();
        let mut rx = h.session.subscribe();

        h.auth.sign_out();
        assert!(h.session.record_study_event().is_none());
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().loaded);
        assert!(!h.session.is_loaded());

        let gateway = h.gateway.clone();
        h.session.shutdown().await;
        // Last persisted state is the real streak, not the cleared one
        assert_eq!(gateway.stored().unwrap().current_streak, Some(1));
    }

    #[tokio::test]
    async fn subscribers_see_each_change() {
        let h = harness(MemoryGateway::new(), true);
        let mut rx = h.session.subscribe();
        h.session.load().await;
        assert!(rx.borrow_and_update().loaded);

        h.session.record_study_event();
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.current_streak, 1);
        assert!(snap.studied_today);
        assert_eq!(snap.status, StreakStatus::Active);
    }

    #[tokio::test]
    async fn reset_is_persisted() {
        let h = harness(MemoryGateway::new(), true);
        h.session.load().await;
        h.session.record_study_event();
        assert!(matches!(h.session.reset(), Some(Event::StreakReset { .. })));

        let gateway = h.gateway.clone();
        h.session.shutdown().await;
        let stored = gateway.stored().unwrap();
        assert_eq!(stored.current_streak, Some(0));
        assert_eq!(stored.last_study_date, None);
    }

    #[tokio::test(start_paused = true)]
    async fn break_checker_closes_lapsed_streak() {
        let mut h = harness(MemoryGateway::new(), true);
        h.session.load().await;
        h.session.record_study_event();
        h.session.spawn_break_checker(Duration::from_secs(60));

        h.clock.advance(ChronoDuration::hours(49));
        tokio::time::sleep(Duration::from_secs(150)).await;

        let snap = h.session.snapshot();
        assert_eq!(snap.current_streak, 0);
        assert_eq!(snap.past_streaks.len(), 1);
        assert_eq!(snap.past_streaks[0].streak, 1);
        h.session.shutdown().await;
    }

    #[tokio::test]
    async fn sign_out_is_visible_without_a_mutation() {
        let h = harness(MemoryGateway::new(), true);
        h.session.load().await;
        h.session.record_study_event();
        let mut rx = h.session.subscribe();
        assert_eq!(rx.borrow_and_update().current_streak, 1);

        h.auth.sign_out();
        let snap = h.session.snapshot();
        assert!(!snap.loaded);
        assert_eq!(snap.current_streak, 0);
        assert!(snap.past_streaks.is_empty());
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().loaded);

        let gateway = h.gateway.clone();
        h.session.shutdown().await;
        assert_eq!(gateway.stored().unwrap().current_streak, Some(1));
    }

    #[tokio::test]
    async fn subscribe_after_sign_out_starts_empty() {
        let h = harness(MemoryGateway::new(), true);
        h.session.load().await;
        h.session.record_study_event();

        h.auth.sign_out();
        let rx = h.session.subscribe();
        assert!(!rx.borrow().loaded);
        assert!(!h.session.is_loaded());
        h.session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_break_checker_runs() {
        let mut h = harness(MemoryGateway::new(), true);
        h.session.load().await;
        h.session.record_study_event();
        h.session.spawn_break_checker(Duration::ZERO);

        h.clock.advance(ChronoDuration::hours(49));
        tokio::time::sleep(MIN_CHECK_PERIOD * 3).await;

        let checker = h.session.checker.as_ref().unwrap();
        assert!(!checker.is_finished());
        assert_eq!(h.session.snapshot().current_streak, 0);
        assert_eq!(h.session.snapshot().past_streaks.len(), 1);
        h.session.shutdown().await;
    }
}
