pub mod config;
pub mod data;
pub mod goal;
pub mod quest;
pub mod task;
pub mod timer;
pub mod xp;

use std::time::Duration;

use gamestudy_core::{Config, StudySession};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Loaded config and output mode shared by every command.
pub struct Context {
    pub config: Config,
    json: bool,
}

impl Context {
    pub fn new(config: Config, json: bool) -> Self {
        Self { config, json }
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn session(&self) -> StudySession {
        StudySession::open(&self.config)
    }

    pub fn session_with_tick_period(&self, period: Duration) -> StudySession {
        StudySession::open_with_tick_period(&self.config, period)
    }

    /// Print `value` as pretty JSON in `--json` mode, `text()` otherwise.
    pub fn emit<T, F>(&self, value: &T, text: F) -> CmdResult
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> String,
    {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}
