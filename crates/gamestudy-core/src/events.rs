use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::IntervalType;

/// Every timer command that changes state produces an Event.
/// Per-second countdown updates are delivered as state snapshots instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        task_id: String,
        interval_type: IntervalType,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// An interval ran down to `00:00`. Emitted for every completion.
    IntervalCompleted {
        completed: IntervalType,
        next: IntervalType,
        at: DateTime<Utc>,
    },
    /// A work interval finished while `task_id` was bound. This is the
    /// notification that turns focus time into task progress and XP.
    WorkIntervalCompleted {
        task_id: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TimerStarted { at, .. }
            | Event::TimerPaused { at, .. }
            | Event::TimerResumed { at, .. }
            | Event::TimerReset { at }
            | Event::IntervalCompleted { at, .. }
            | Event::WorkIntervalCompleted { at, .. } => *at,
        }
    }

    /// Task credited by this event, if any.
    pub fn completed_work_task(&self) -> Option<&str> {
        match self {
            Event::WorkIntervalCompleted { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::WorkIntervalCompleted {
            task_id: "t-1".into(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "work_interval_completed");
        assert_eq!(json["task_id"], "t-1");
        assert_eq!(event.completed_work_task(), Some("t-1"));
    }

    #[test]
    fn every_event_carries_its_timestamp() {
        let at = Utc::now();
        let events = [
            Event::TimerPaused {
                remaining_secs: 90,
                at,
            },
            Event::TimerReset { at },
            Event::IntervalCompleted {
                completed: IntervalType::Work,
                next: IntervalType::Break,
                at,
            },
        ];
        for event in &events {
            assert_eq!(event.at(), at);
            assert_eq!(event.completed_work_task(), None);
        }
    }
}
