//! crates/study_tracker_core/src/badges.rs
//!
//! The badge catalog and the rules that award badges from a user's totals.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::UserStats;
use crate::error::ServiceResult;
use crate::ports::{Clock, DatabaseService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCategory {
    Achievement,
    Streak,
}

impl BadgeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeCategory::Achievement => "achievement",
            BadgeCategory::Streak => "streak",
        }
    }
}

/// What a user has to reach to earn a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeRule {
    StudyLogs(u64),
    MaxStreak(u32),
    Pomodoros(u64),
    StudyMinutes(u64),
}

impl BadgeRule {
    pub fn is_met(&self, stats: &UserStats) -> bool {
        match *self {
            BadgeRule::StudyLogs(n) => stats.study_log_count >= n,
            BadgeRule::MaxStreak(n) => stats.max_streak >= n,
            BadgeRule::Pomodoros(n) => stats.pomodoro_count >= n,
            BadgeRule::StudyMinutes(n) => stats.total_study_minutes >= n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: BadgeCategory,
    pub sort_order: u32,
    pub rule: BadgeRule,
}

/// Every badge a user can earn, in display order.
pub const BADGES: &[BadgeDefinition] = &[
    BadgeDefinition {
        id: "first-log",
        name: "First study log",
        description: "Create your first study log",
        category: BadgeCategory::Achievement,
        sort_order: 1,
        rule: BadgeRule::StudyLogs(1),
    },
    BadgeDefinition {
        id: "streak-3",
        name: "3-day streak",
        description: "Log study on 3 consecutive days",
        category: BadgeCategory::Streak,
        sort_order: 2,
        rule: BadgeRule::MaxStreak(3),
    },
    BadgeDefinition {
        id: "streak-7",
        name: "7-day streak",
        description: "Log study on 7 consecutive days",
        category: BadgeCategory::Streak,
        sort_order: 3,
        rule: BadgeRule::MaxStreak(7),
    },
    BadgeDefinition {
        id: "streak-30",
        name: "30-day streak",
        description: "Log study on 30 consecutive days",
        category: BadgeCategory::Streak,
        sort_order: 4,
        rule: BadgeRule::MaxStreak(30),
    },
    BadgeDefinition {
        id: "pomodoro-master",
        name: "Pomodoro master",
        description: "Complete 100 pomodoros",
        category: BadgeCategory::Achievement,
        sort_order: 5,
        rule: BadgeRule::Pomodoros(100),
    },
    BadgeDefinition {
        id: "study-expert",
        name: "Study expert",
        description: "Log 100 hours of study",
        category: BadgeCategory::Achievement,
        sort_order: 6,
        rule: BadgeRule::StudyMinutes(100 * 60),
    },
];

pub fn find_badge(id: &str) -> Option<&'static BadgeDefinition> {
    BADGES.iter().find(|badge| badge.id == id)
}

/// A catalog entry and, if earned, when.
#[derive(Debug, Clone)]
pub struct BadgeStatus {
    pub badge: &'static BadgeDefinition,
    pub awarded_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct BadgeService {
    db: Arc<dyn DatabaseService>,
    clock: Arc<dyn Clock>,
}

impl BadgeService {
    pub fn new(db: Arc<dyn DatabaseService>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Awards every badge whose rule the user now meets. Returns only the
    /// badges that were not held before. Badges are never taken away.
    pub async fn evaluate_and_award(&self, user_id: Uuid) -> ServiceResult<Vec<&'static BadgeDefinition>> {
        let stats = self.db.get_user_stats(user_id).await?;
        let now = self.clock.now();

        let mut awarded = Vec::new();
        for badge in BADGES.iter().filter(|badge| badge.rule.is_met(&stats)) {
            if self.db.award_badge(user_id, badge.id, now).await? {
                info!(%user_id, badge = badge.id, "Badge awarded");
                awarded.push(badge);
            }
        }
        Ok(awarded)
    }

    pub async fn list(&self, user_id: Uuid) -> ServiceResult<Vec<BadgeStatus>> {
        let held = self.db.list_awarded_badges(user_id).await?;
        Ok(BADGES
            .iter()
            .map(|badge| BadgeStatus {
                badge,
                awarded_at: held
                    .iter()
                    .find(|h| h.badge_id == badge.id)
                    .map(|h| h.awarded_at),
            })
            .collect())
    }
}
