//! Tasks and the daily goal.
//!
//! A task moves through these states, any number of times between the
//! first two:
//!
//! ```text
//!   PENDING ──start──> ACTIVE <──resume/pause──> PAUSED
//!                        │                          │
//!                        └────────complete──────────┴──> COMPLETED
//!
//!   reset_daily_progress: any state ──> PENDING (identity and reward kept)
//! ```

mod store;

pub use store::TaskStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::timer::WORK_MINUTES;

/// Minutes credited per finished work interval.
pub const POMODORO_MINUTES: u32 = WORK_MINUTES;

pub const MIN_GOAL_HOURS: f64 = 0.5;
pub const MAX_GOAL_HOURS: f64 = 24.0;
pub const DEFAULT_GOAL_HOURS: f64 = 4.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    #[default]
    Daily,
}

/// Display-level summary of the progress flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub xp_reward: u32,
    #[serde(default)]
    pub category: TaskCategory,
    /// Planned duration, `target_pomodoros * 25`.
    pub duration_minutes: u32,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_spent_minutes: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub pomodoro_count: u32,
    pub target_pomodoros: u32,
}

impl Task {
    fn from_new(id: String, new: NewTask) -> Self {
        Self {
            id,
            title: new.title.trim().to_string(),
            description: new.description,
            xp_reward: new.xp_reward,
            category: TaskCategory::Daily,
            duration_minutes: new.target_pomodoros.saturating_mul(POMODORO_MINUTES),
            start_time: None,
            end_time: None,
            time_spent_minutes: 0,
            is_active: false,
            is_completed: false,
            is_paused: false,
            pomodoro_count: 0,
            target_pomodoros: new.target_pomodoros,
        }
    }

    pub fn status(&self) -> TaskStatus {
        if self.is_completed {
            TaskStatus::Completed
        } else if self.is_active && self.is_paused {
            TaskStatus::Paused
        } else if self.is_active {
            TaskStatus::Active
        } else {
            TaskStatus::Pending
        }
    }

    /// XP granted per finished work interval.
    pub fn pomodoro_share(&self) -> u32 {
        (self.xp_reward / self.target_pomodoros.max(1)).max(1)
    }

    fn clear_progress(&mut self) {
        self.is_active = false;
        self.is_completed = false;
        self.is_paused = false;
        self.time_spent_minutes = 0;
        self.pomodoro_count = 0;
        self.start_time = None;
        self.end_time = None;
    }
}

/// Input to [`TaskStore::add_task`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub xp_reward: u32,
    pub target_pomodoros: u32,
}

impl NewTask {
    pub fn new(title: impl Into<String>, target_pomodoros: u32, xp_reward: u32) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            xp_reward,
            target_pomodoros,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }
        if self.target_pomodoros == 0 {
            return Err(ValidationError::NotPositive {
                field: "target_pomodoros",
            });
        }
        if self.xp_reward == 0 {
            return Err(ValidationError::NotPositive { field: "xp_reward" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyGoal {
    pub target_hours: f64,
    pub completed_hours: f64,
}

impl DailyGoal {
    pub fn new(target_hours: f64) -> Self {
        Self {
            target_hours,
            completed_hours: 0.0,
        }
    }

    /// Completed share of the target, capped at 100.
    pub fn progress_pct(&self) -> f64 {
        if self.target_hours <= 0.0 {
            return 0.0;
        }
        (self.completed_hours / self.target_hours * 100.0).min(100.0)
    }

    pub fn is_met(&self) -> bool {
        self.completed_hours >= self.target_hours
    }
}

impl Default for DailyGoal {
    fn default() -> Self {
        Self::new(DEFAULT_GOAL_HOURS)
    }
}

pub fn validate_goal_hours(hours: f64) -> Result<(), ValidationError> {
    if !hours.is_finite() || !(MIN_GOAL_HOURS..=MAX_GOAL_HOURS).contains(&hours) {
        return Err(ValidationError::OutOfRange {
            field: "target_hours",
            min: MIN_GOAL_HOURS,
            max: MAX_GOAL_HOURS,
            value: hours,
        });
    }
    Ok(())
}

/// `completed_hours` recomputed from scratch.
pub fn completed_hours(tasks: &[Task]) -> f64 {
    let minutes: u64 = tasks.iter().map(|t| u64::from(t.time_spent_minutes)).sum();
    minutes as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task::from_new("t-1".into(), NewTask::new("Read chapter 3", 3, 90))
    }

    #[test]
    fn new_task_starts_zeroed() {
        let t = sample();
        assert_eq!(t.duration_minutes, 75);
        assert_eq!(t.status(), TaskStatus::Pending);
        assert_eq!(t.pomodoro_count, 0);
        assert_eq!(t.time_spent_minutes, 0);
        assert!(t.start_time.is_none());
    }

    #[test]
    fn validation_rejects_bad_input() {
        assert_eq!(
            NewTask::new("  ", 1, 10).validate(),
            Err(ValidationError::Empty { field: "title" })
        );
        assert!(NewTask::new("x", 0, 10).validate().is_err());
        assert!(NewTask::new("x", 1, 0).validate().is_err());
        assert!(NewTask::new("x", 1, 10).validate().is_ok());
    }

    #[test]
    fn pomodoro_share_never_zero() {
        let mut t = sample();
        assert_eq!(t.pomodoro_share(), 30);
        t.xp_reward = 2;
        assert_eq!(t.pomodoro_share(), 1);
    }

    #[test]
    fn goal_hours_range() {
        assert!(validate_goal_hours(0.5).is_ok());
        assert!(validate_goal_hours(24.0).is_ok());
        assert!(validate_goal_hours(0.25).is_err());
        assert!(validate_goal_hours(f64::NAN).is_err());
        assert!(validate_goal_hours(25.0).is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["targetPomodoros"], 3);
        assert_eq!(json["timeSpentMinutes"], 0);
        assert_eq!(json["category"], "daily");
    }

    #[test]
    fn goal_progress_caps_at_hundred() {
        let goal = DailyGoal {
            target_hours: 2.0,
            completed_hours: 3.0,
        };
        assert_eq!(goal.progress_pct(), 100.0);
        assert!(goal.is_met());
    }
}
