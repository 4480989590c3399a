//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-user focus timers.

use crate::config::Config;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use study_tracker_core::ports::{Clock, DatabaseService, MagicLinkSender};
use study_tracker_core::timer::PomodoroTimer;
use study_tracker_core::{
    AuthService, BadgeService, Calendar, PomodoroService, StreakEngine, StudyLogService,
};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthService,
    pub study_logs: StudyLogService,
    pub pomodoros: PomodoroService,
    pub badges: BadgeService,
    pub timers: Arc<TimerRegistry>,
}

impl AppState {
    /// Wires the core services over one store, sender and clock.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        sender: Arc<dyn MagicLinkSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let calendar = Calendar::new(config.utc_offset);
        let streak = StreakEngine::new(db.clone(), clock.clone(), calendar);

        Self {
            auth: AuthService::new(db.clone(), sender, clock.clone(), config.auth_settings()),
            study_logs: StudyLogService::new(db.clone(), streak),
            pomodoros: PomodoroService::new(db.clone(), clock.clone(), calendar),
            badges: BadgeService::new(db.clone(), clock.clone()),
            timers: Arc::new(TimerRegistry::default()),
            db,
            config,
            clock,
        }
    }

    /// Re-evaluates badges after a mutation. A failure here never fails the
    /// action that triggered it.
    pub async fn refresh_badges(&self, user_id: Uuid) {
        if let Err(e) = self.badges.evaluate_and_award(user_id).await {
            warn!(%user_id, error = ?e, "Badge evaluation failed");
        }
    }
}

//=========================================================================================
// TimerRegistry (One Focus Timer Per User)
//=========================================================================================

/// One user's timer. Its lock is held for a whole request, including the
/// write that records a finished focus phase.
pub type TimerSlot = Arc<tokio::sync::Mutex<PomodoroTimer>>;

/// Holds each user's timer between requests. The map lock is never held
/// across an `.await`.
#[derive(Default)]
pub struct TimerRegistry {
    timers: Mutex<HashMap<Uuid, TimerSlot>>,
}

impl TimerRegistry {
    /// The user's timer, creating a fresh one on first use.
    pub fn slot(&self, user_id: Uuid) -> TimerSlot {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.entry(user_id).or_default().clone()
    }

    /// Forgets the user's timer once nobody holds it and it is back to a
    /// fresh idle focus phase, which is what [`slot`](Self::slot) recreates.
    pub fn release(&self, user_id: Uuid) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        let unused = timers.get(&user_id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1
                && slot
                    .try_lock()
                    .is_ok_and(|timer| *timer == PomodoroTimer::default())
        });
        if unused {
            timers.remove(&user_id);
        }
    }

    /// Number of users with a timer in memory.
    pub fn tracked(&self) -> usize {
        self.timers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn idle_timers_are_forgotten_on_release() {
        let registry = TimerRegistry::default();
        let user_id = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

        registry.slot(user_id).lock().await.start(now).unwrap();
        registry.release(user_id);
        assert_eq!(registry.tracked(), 1);

        registry.slot(user_id).lock().await.reset();
        registry.release(user_id);
        assert_eq!(registry.tracked(), 0);
    }

    #[tokio::test]
    async fn a_held_timer_is_kept() {
        let registry = TimerRegistry::default();
        let user_id = Uuid::new_v4();

        let held = registry.slot(user_id);
        registry.release(user_id);
        assert_eq!(registry.tracked(), 1);

        drop(held);
        registry.release(user_id);
        assert_eq!(registry.tracked(), 0);
    }
}
