pub mod auth;
pub mod badges;
pub mod domain;
pub mod error;
pub mod memory;
pub mod pomodoro;
pub mod ports;
pub mod streak;
pub mod study_log;
pub mod time;
pub mod timer;
pub mod validation;

pub use auth::{AuthService, AuthSettings, MagicLinkIssued};
pub use badges::{BadgeService, BadgeStatus, BADGES};
pub use domain::{
    AuthSession, AwardedBadge, DateRange, Page, PomodoroSession, StreakSummary, StudyLog,
    StudyLogDetail, StudyLogFields, StudyLogSummary, TodaySummary, User, UserStats,
};
pub use error::{ServiceError, ServiceResult};
pub use memory::InMemoryDatabase;
pub use pomodoro::PomodoroService;
pub use ports::{Clock, DatabaseService, MagicLinkSender, PortError, PortResult};
pub use streak::StreakEngine;
pub use study_log::StudyLogService;
pub use time::{Calendar, FixedClock, SystemClock};
pub use timer::{PomodoroTimer, TimerError, TimerPhase, TimerState};
pub use validation::{EmailAddress, FieldErrors, ListQuery, PomodoroDuration, StudyLogForm, StudyLogInput};
