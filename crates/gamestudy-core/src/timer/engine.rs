//! Timer engine implementation.
//!
//! The engine is a pure state machine. It owns no thread or tick source:
//! the caller invokes `tick()` once per second while running, passing the
//! generation it was started for. Every command that starts or stops a
//! tick source bumps the generation, so a tick from a superseded source is
//! ignored instead of double-decrementing the countdown.
//!
//! ## State Transitions
//!
//! ```text
//! Idle ──start──> Running ──pause──> Paused ──resume──> Running
//!                    │                  │
//!                    │               start (same or other task)
//!                    │
//!                 00:00 ──> Idle (next interval type, task unbound)
//!
//! reset: any ──> Idle (Work, 25:00, task unbound)
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::interval::{IntervalType, TimerState};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

/// Result of one `tick()`.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not running, or the tick came from a stale generation.
    Ignored,
    /// One second was counted down.
    Counted,
    /// The interval finished; carries the completion events.
    Completed(Vec<Event>),
}

/// Core timer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerEngine {
    state: TimerState,
    #[serde(default)]
    active_task_id: Option<String>,
    /// Identifies the tick source allowed to drive the countdown.
    #[serde(skip)]
    generation: u64,
}

impl TimerEngine {
    /// Idle, Work interval at full length, no task bound.
    pub fn new() -> Self {
        Self {
            state: TimerState::default(),
            active_task_id: None,
            generation: 0,
        }
    }

    /// Rebuild an engine from a persisted one.
    ///
    /// A run that was in progress when it was saved comes back paused at
    /// its remaining time, since no tick source survives the process.
    pub fn restore(saved: TimerEngine) -> Self {
        let mut state = saved.state;
        state.seconds_remaining = state.seconds_remaining.min(59);
        state.saved_seconds = state.saved_seconds.min(59);
        if state.is_running {
            state.is_running = false;
            state.is_paused = true;
            state.saved_minutes = state.minutes_remaining;
            state.saved_seconds = state.seconds_remaining;
        }
        Self {
            state,
            active_task_id: saved.active_task_id,
            generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn phase(&self) -> TimerPhase {
        if self.state.is_running {
            TimerPhase::Running
        } else if self.state.is_paused {
            TimerPhase::Paused
        } else {
            TimerPhase::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.active_task_id.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start counting down for `task_id`.
    ///
    /// No-op while already running or with an empty task id. From paused,
    /// the countdown continues from the paused time.
    pub fn start(&mut self, task_id: &str) -> Option<Event> {
        if self.state.is_running {
            tracing::debug!("start ignored: already running");
            return None;
        }
        if task_id.trim().is_empty() {
            tracing::debug!("start ignored: no task id");
            return None;
        }
        if self.state.is_paused {
            self.state.minutes_remaining = self.state.saved_minutes;
            self.state.seconds_remaining = self.state.saved_seconds;
        }
        self.active_task_id = Some(task_id.to_string());
        self.state = TimerState {
            is_running: true,
            is_paused: false,
            ..self.state
        };
        self.generation += 1;
        Some(Event::TimerStarted {
            task_id: task_id.to_string(),
            interval_type: self.state.interval_type,
            remaining_secs: self.state.remaining_secs(),
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_running {
            tracing::debug!("pause ignored: not running");
            return None;
        }
        self.state = TimerState {
            is_running: false,
            is_paused: true,
            saved_minutes: self.state.minutes_remaining,
            saved_seconds: self.state.seconds_remaining,
            ..self.state
        };
        self.generation += 1;
        Some(Event::TimerPaused {
            remaining_secs: self.state.remaining_secs(),
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if !self.state.is_paused {
            tracing::debug!("resume ignored: not paused");
            return None;
        }
        self.state = TimerState {
            minutes_remaining: self.state.saved_minutes,
            seconds_remaining: self.state.saved_seconds,
            is_running: true,
            is_paused: false,
            ..self.state
        };
        self.generation += 1;
        Some(Event::TimerResumed {
            remaining_secs: self.state.remaining_secs(),
            at: Utc::now(),
        })
    }

    /// Back to idle Work at full length with no task bound. Always succeeds.
    pub fn reset(&mut self) -> Event {
        self.state = TimerState::idle(IntervalType::Work);
        self.active_task_id = None;
        self.generation += 1;
        Event::TimerReset { at: Utc::now() }
    }

    /// Count one second for the tick source identified by `generation`.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if !self.state.is_running || generation != self.generation {
            return TickOutcome::Ignored;
        }
        if self.state.is_elapsed() {
            return TickOutcome::Completed(self.complete_interval());
        }
        self.state = self.state.decremented();
        TickOutcome::Counted
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_interval(&mut self) -> Vec<Event> {
        let completed = self.state.interval_type;
        let next = completed.next();
        let task_id = self.active_task_id.take();
        self.state = TimerState::idle(next);
        self.generation += 1;

        let at = Utc::now();
        let mut events = vec![Event::IntervalCompleted {
            completed,
            next,
            at,
        }];
        if completed == IntervalType::Work {
            if let Some(task_id) = task_id {
                events.push(Event::WorkIntervalCompleted { task_id, at });
            }
        }
        events
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_seconds(engine: &mut TimerEngine, n: u32) {
        let gen = engine.generation();
        for _ in 0..n {
            assert_eq!(engine.tick(gen), TickOutcome::Counted);
        }
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.phase(), TimerPhase::Idle);

        assert!(engine.start("task-1").is_some());
        assert_eq!(engine.phase(), TimerPhase::Running);
        assert_eq!(engine.active_task_id(), Some("task-1"));

        assert!(engine.pause().is_some());
        assert_eq!(engine.phase(), TimerPhase::Paused);

        assert!(engine.resume().is_some());
        assert_eq!(engine.phase(), TimerPhase::Running);
    }

    #[test]
    fn preconditions_are_inert() {
        let mut engine = TimerEngine::new();
        assert!(engine.pause().is_none());
        assert!(engine.resume().is_none());
        assert!(engine.start("").is_none());
        assert!(engine.start("   ").is_none());
        assert_eq!(engine.phase(), TimerPhase::Idle);

        engine.start("a");
        let gen = engine.generation();
        assert!(engine.start("b").is_none());
        assert_eq!(engine.generation(), gen);
        assert_eq!(engine.active_task_id(), Some("a"));
    }

    #[test]
    fn pause_right_after_start_keeps_full_duration() {
        let mut engine = TimerEngine::new();
        engine.start("t");
        engine.pause();
        let s = engine.state();
        assert_eq!((s.saved_minutes, s.saved_seconds), (25, 0));
        assert!(!s.is_running && s.is_paused);
    }

    #[test]
    fn pause_resume_loses_no_time() {
        let mut engine = TimerEngine::new();
        engine.start("t");
        run_seconds(&mut engine, 61);
        engine.pause();
        assert_eq!(engine.state().display(), "23:59");
        engine.resume();
        assert_eq!(engine.state().display(), "23:59");
        run_seconds(&mut engine, 1);
        assert_eq!(engine.state().display(), "23:58");
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut engine = TimerEngine::new();
        engine.start("t");
        let old = engine.generation();
        engine.pause();
        engine.resume();
        let before = engine.state();
        assert_eq!(engine.tick(old), TickOutcome::Ignored);
        assert_eq!(engine.state(), before);
    }

    #[test]
    fn full_work_interval_counts_1500_seconds() {
        let mut engine = TimerEngine::new();
        engine.start("task-9");
        let gen = engine.generation();
        let mut prev = engine.state().remaining_secs();
        for _ in 0..1500 {
            assert_eq!(engine.tick(gen), TickOutcome::Counted);
            let now = engine.state().remaining_secs();
            assert_eq!(now + 1, prev);
            prev = now;
        }
        assert!(engine.state().is_elapsed());

        let events = match engine.tick(gen) {
            TickOutcome::Completed(events) => events,
            other => panic!("expected completion, got {other:?}"),
        };
        let s = engine.state();
        assert_eq!(s.interval_type, IntervalType::Break);
        assert_eq!(s.display(), "05:00");
        assert!(!s.is_running && !s.is_paused);
        assert_eq!(engine.active_task_id(), None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].completed_work_task(), Some("task-9"));

        // The finished tick source cannot drive the next interval.
        assert_eq!(engine.tick(gen), TickOutcome::Ignored);
    }

    #[test]
    fn break_completion_returns_to_work() {
        let mut engine = TimerEngine::new();
        engine.start("t");
        run_seconds(&mut engine, 1500);
        engine.tick(engine.generation());

        engine.start("t");
        run_seconds(&mut engine, 300);
        let events = match engine.tick(engine.generation()) {
            TickOutcome::Completed(events) => events,
            other => panic!("expected completion, got {other:?}"),
        };
        assert_eq!(engine.state(), TimerState::idle(IntervalType::Work));
        assert_eq!(events.len(), 1);
        assert!(events[0].completed_work_task().is_none());
    }

    #[test]
    fn reset_unbinds_task() {
        let mut engine = TimerEngine::new();
        engine.start("t");
        run_seconds(&mut engine, 10);
        engine.reset();
        assert_eq!(engine.state(), TimerState::default());
        assert_eq!(engine.active_task_id(), None);
        assert_eq!(engine.phase(), TimerPhase::Idle);
    }

    #[test]
    fn start_from_paused_continues_countdown() {
        let mut engine = TimerEngine::new();
        engine.start("a");
        run_seconds(&mut engine, 5);
        engine.pause();
        assert!(engine.start("b").is_some());
        assert_eq!(engine.state().display(), "24:55");
        assert_eq!(engine.active_task_id(), Some("b"));
        assert!(!engine.state().is_paused);
    }

    #[test]
    fn restore_turns_running_into_paused() {
        let mut engine = TimerEngine::new();
        engine.start("t");
        run_seconds(&mut engine, 90);
        let json = serde_json::to_string(&engine).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["activeTaskId"], "t");
        assert!(value.get("generation").is_none());

        let restored = TimerEngine::restore(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.phase(), TimerPhase::Paused);
        assert_eq!(restored.active_task_id(), Some("t"));
        let s = restored.state();
        assert_eq!((s.saved_minutes, s.saved_seconds), (23, 30));
    }
}
