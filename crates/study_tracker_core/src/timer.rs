//! crates/study_tracker_core/src/timer.rs
//!
//! The focus timer as an explicit state machine.
//!
//! The timer never counts ticks. A running timer stores its deadline and
//! every query derives the remaining time from it, so however irregularly
//! it is polled, it never drifts.

use chrono::{DateTime, Duration, Utc};

pub const FOCUS_MINUTES: i64 = 25;
pub const BREAK_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Focus,
    Break,
}

impl TimerPhase {
    pub fn next(self) -> Self {
        match self {
            TimerPhase::Focus => TimerPhase::Break,
            TimerPhase::Break => TimerPhase::Focus,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Focus => "focus",
            TimerPhase::Break => "break",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running { deadline: DateTime<Utc> },
    Paused { remaining: Duration },
    /// The phase ran out at `finished_at` and has not been acknowledged yet.
    Completed { finished_at: DateTime<Utc> },
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running { .. } => "running",
            TimerState::Paused { .. } => "paused",
            TimerState::Completed { .. } => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    #[error("The timer is already running")]
    AlreadyRunning,
    #[error("The timer is not running")]
    NotRunning,
    #[error("The timer has completed; reset it first")]
    AlreadyCompleted,
}

/// Reported by [`PomodoroTimer::tick`] when a phase runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCompleted {
    pub phase: TimerPhase,
    pub length: Duration,
    /// The deadline the phase ran out at, not the moment it was noticed.
    pub finished_at: DateTime<Utc>,
}

impl PhaseCompleted {
    pub fn minutes(&self) -> u32 {
        u32::try_from(self.length.num_minutes()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroTimer {
    focus_length: Duration,
    break_length: Duration,
    phase: TimerPhase,
    state: TimerState,
}

impl Default for PomodoroTimer {
    fn default() -> Self {
        Self::new(Duration::minutes(FOCUS_MINUTES), Duration::minutes(BREAK_MINUTES))
    }
}

impl PomodoroTimer {
    pub fn new(focus_length: Duration, break_length: Duration) -> Self {
        Self {
            focus_length,
            break_length,
            phase: TimerPhase::Focus,
            state: TimerState::Idle,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn phase_length(&self) -> Duration {
        match self.phase {
            TimerPhase::Focus => self.focus_length,
            TimerPhase::Break => self.break_length,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        let remaining = match self.state {
            TimerState::Idle => self.phase_length(),
            TimerState::Paused { remaining } => remaining,
            TimerState::Running { .. } => return Err(TimerError::AlreadyRunning),
            TimerState::Completed { .. } => return Err(TimerError::AlreadyCompleted),
        };
        self.state = TimerState::Running {
            deadline: now + remaining,
        };
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        match self.state {
            TimerState::Running { .. } => {
                self.state = TimerState::Paused {
                    remaining: self.remaining(now),
                };
                Ok(())
            }
            _ => Err(TimerError::NotRunning),
        }
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
    }

    pub fn switch_phase(&mut self, phase: TimerPhase) {
        self.phase = phase;
        self.state = TimerState::Idle;
    }

    /// Moves a running timer whose deadline has passed to `Completed`.
    ///
    /// A completed phase keeps being reported on every tick until
    /// [`reset`](Self::reset) or [`switch_phase`](Self::switch_phase)
    /// acknowledges it, so a caller that fails to act on it can retry.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<PhaseCompleted> {
        let finished_at = match self.state {
            TimerState::Running { deadline } if now >= deadline => {
                self.state = TimerState::Completed {
                    finished_at: deadline,
                };
                deadline
            }
            TimerState::Completed { finished_at } => finished_at,
            _ => return None,
        };
        Some(PhaseCompleted {
            phase: self.phase,
            length: self.phase_length(),
            finished_at,
        })
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.state {
            TimerState::Idle => self.phase_length(),
            TimerState::Running { deadline } => (deadline - now).max(Duration::zero()),
            TimerState::Paused { remaining } => remaining,
            TimerState::Completed { .. } => Duration::zero(),
        }
    }

    /// Remaining time as `MM:SS`, rounded up to the next whole second.
    pub fn display(&self, now: DateTime<Utc>) -> String {
        let remaining = self.remaining(now);
        let mut seconds = remaining.num_seconds();
        if remaining > Duration::seconds(seconds) {
            seconds += 1;
        }
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn idle_timer_shows_the_full_phase() {
        let timer = PomodoroTimer::default();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.display(t0()), "25:00");
    }

    #[test]
    fn runs_to_completion() {
        let mut timer = PomodoroTimer::default();
        timer.start(t0()).unwrap();
        assert_eq!(timer.display(t0() + Duration::seconds(61)), "23:59");
        assert_eq!(timer.tick(t0() + Duration::minutes(24)), None);

        let done = timer.tick(t0() + Duration::minutes(25)).unwrap();
        assert_eq!(done.phase, TimerPhase::Focus);
        assert_eq!(done.minutes(), 25);
        assert_eq!(done.finished_at, t0() + Duration::minutes(25));
        assert_eq!(
            timer.state(),
            TimerState::Completed {
                finished_at: t0() + Duration::minutes(25)
            }
        );
        assert_eq!(timer.start(t0()), Err(TimerError::AlreadyCompleted));
    }

    #[test]
    fn late_tick_reports_the_deadline() {
        let mut timer = PomodoroTimer::default();
        timer.start(t0()).unwrap();

        let done = timer.tick(t0() + Duration::days(1)).unwrap();
        assert_eq!(done.finished_at, t0() + Duration::minutes(25));
    }

    #[test]
    fn completion_is_reported_until_acknowledged() {
        let mut timer = PomodoroTimer::default();
        timer.start(t0()).unwrap();
        let first = timer.tick(t0() + Duration::minutes(30)).unwrap();

        // Nothing acted on it yet, so a later tick sees the same completion.
        let again = timer.tick(t0() + Duration::minutes(40)).unwrap();
        assert_eq!(again, first);

        timer.switch_phase(first.phase.next());
        assert_eq!(timer.tick(t0() + Duration::minutes(41)), None);
        assert_eq!(timer.phase(), TimerPhase::Break);
    }

    #[test]
    fn pause_keeps_the_remaining_time() {
        let mut timer = PomodoroTimer::default();
        timer.start(t0()).unwrap();
        timer.pause(t0() + Duration::minutes(10)).unwrap();
        assert_eq!(timer.display(t0() + Duration::hours(3)), "15:00");
        assert_eq!(timer.tick(t0() + Duration::hours(3)), None);

        let resumed_at = t0() + Duration::hours(3);
        timer.start(resumed_at).unwrap();
        assert_eq!(timer.tick(resumed_at + Duration::minutes(14)), None);
        assert!(timer.tick(resumed_at + Duration::minutes(15)).is_some());
    }

    #[test]
    fn sparse_polling_does_not_drift() {
        let mut timer = PomodoroTimer::default();
        timer.start(t0()).unwrap();
        // Irregular polls only read the deadline; they never shorten or stretch it.
        for offset in [1, 7, 300, 301, 1200] {
            assert_eq!(timer.tick(t0() + Duration::seconds(offset)), None);
        }
        assert_eq!(timer.remaining(t0() + Duration::seconds(1200)), Duration::seconds(300));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut timer = PomodoroTimer::default();
        assert_eq!(timer.pause(t0()), Err(TimerError::NotRunning));
        timer.start(t0()).unwrap();
        assert_eq!(timer.start(t0()), Err(TimerError::AlreadyRunning));
    }

    #[test]
    fn reset_and_phase_switch_return_to_idle() {
        let mut timer = PomodoroTimer::default();
        timer.start(t0()).unwrap();
        timer.reset();
        assert_eq!(timer.state(), TimerState::Idle);

        timer.switch_phase(TimerPhase::Break);
        assert_eq!(timer.phase(), TimerPhase::Break);
        assert_eq!(timer.display(t0()), "05:00");
        assert_eq!(timer.phase().next(), TimerPhase::Focus);
    }
}
