use serde::{Deserialize, Serialize};

/// Length of a work interval (one pomodoro).
pub const WORK_MINUTES: u32 = 25;
/// Length of a break interval.
pub const BREAK_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    #[default]
    Work,
    Break,
}

impl IntervalType {
    pub fn minutes(self) -> u32 {
        match self {
            IntervalType::Work => WORK_MINUTES,
            IntervalType::Break => BREAK_MINUTES,
        }
    }

    /// The interval that follows this one.
    pub fn next(self) -> Self {
        match self {
            IntervalType::Work => IntervalType::Break,
            IntervalType::Break => IntervalType::Work,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IntervalType::Work => "Focus Time",
            IntervalType::Break => "Break Time",
        }
    }
}

/// Countdown snapshot.
///
/// Replaced whole on every change. `is_running` and `is_paused` are never
/// both set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub minutes_remaining: u32,
    pub seconds_remaining: u32,
    pub is_running: bool,
    pub is_paused: bool,
    pub interval_type: IntervalType,
    /// Remaining time captured by the last pause.
    pub saved_minutes: u32,
    pub saved_seconds: u32,
}

impl TimerState {
    /// Idle at the full length of `interval`.
    pub fn idle(interval: IntervalType) -> Self {
        let minutes = interval.minutes();
        Self {
            minutes_remaining: minutes,
            seconds_remaining: 0,
            is_running: false,
            is_paused: false,
            interval_type: interval,
            saved_minutes: minutes,
            saved_seconds: 0,
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.minutes_remaining * 60 + self.seconds_remaining
    }

    pub fn is_elapsed(&self) -> bool {
        self.minutes_remaining == 0 && self.seconds_remaining == 0
    }

    /// 0.0 .. 1.0 progress within the current interval.
    pub fn progress(&self) -> f64 {
        let total = self.interval_type.minutes() * 60;
        if total == 0 {
            return 0.0;
        }
        1.0 - (f64::from(self.remaining_secs()) / f64::from(total)).min(1.0)
    }

    /// `MM:SS`.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.minutes_remaining, self.seconds_remaining)
    }

    /// The same snapshot one second later, borrowing a minute at `:00`.
    pub(crate) fn decremented(self) -> Self {
        let (minutes, seconds) = if self.seconds_remaining == 0 {
            (self.minutes_remaining.saturating_sub(1), 59)
        } else {
            (self.minutes_remaining, self.seconds_remaining - 1)
        };
        Self {
            minutes_remaining: minutes,
            seconds_remaining: seconds,
            ..self
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle(IntervalType::Work)
    }
}
