//! # GameStudy Core Library
//!
//! Core logic for a gamified Pomodoro study tracker. Every operation is
//! available through the `gamestudy` CLI, which is a thin layer over this
//! crate.
//!
//! ## Architecture
//!
//! - **Timer**: a pure countdown engine plus a tokio tick source that ticks
//!   it once per second
//! - **Tasks**: study tasks with pomodoro progress and the daily goal
//! - **XP**: experience points and geometric leveling
//! - **Quests**: one-shot XP bounties
//! - **Storage**: a namespaced JSON gateway over SQLite, memory or nothing,
//!   and TOML configuration
//!
//! ## Key Components
//!
//! - [`StudySession`]: owns every component and credits finished work
//!   intervals
//! - [`TimerEngine`] / [`Timer`]: countdown state machine and its driver
//! - [`TaskStore`], [`XpLedger`], [`QuestBoard`]
//! - [`Storage`] and [`Config`]

pub mod error;
pub mod events;
pub mod observe;
pub mod quest;
pub mod session;
pub mod storage;
pub mod task;
pub mod timer;
pub mod xp;

pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use observe::{Listeners, Observable, SubscriptionId};
pub use quest::{NewQuest, Quest, QuestBoard, QuestCategory};
pub use session::StudySession;
pub use storage::{
    BackendKind, Config, KeyValueStore, MemoryStore, SqliteStore, Storage, UnavailableStore,
};
pub use task::{DailyGoal, NewTask, Task, TaskCategory, TaskStatus, TaskStore};
pub use timer::{IntervalType, TickOutcome, Timer, TimerEngine, TimerPhase, TimerState};
pub use xp::{XpLedger, XpState};
