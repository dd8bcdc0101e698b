//! Wiring between the timer, the task store and the XP ledger.
//!
//! The components never reference each other. A [`StudySession`] owns one
//! of each over a shared [`Storage`] and listens for
//! `WorkIntervalCompleted`: the bound task gets one pomodoro and 25 minutes,
//! and the ledger gets the task's per-pomodoro share of its reward.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::quest::QuestBoard;
use crate::storage::{
    BackendKind, Config, KeyValueStore, MemoryStore, SqliteStore, Storage, UnavailableStore,
};
use crate::task::{Task, TaskStore};
use crate::timer::{Timer, DEFAULT_TICK_PERIOD};
use crate::xp::{XpLedger, XpState};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Backend named by the config. A SQLite file that cannot be opened
/// degrades to no persistence.
fn backend_for(config: &Config) -> Arc<dyn KeyValueStore> {
    match config.storage.backend {
        BackendKind::Sqlite => match SqliteStore::open() {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "sqlite unavailable, continuing without persistence");
                Arc::new(UnavailableStore)
            }
        },
        BackendKind::Memory => Arc::new(MemoryStore::new()),
        BackendKind::None => Arc::new(UnavailableStore),
    }
}

fn credit_work_interval(
    tasks: &Mutex<TaskStore>,
    xp: &Mutex<XpLedger>,
    task_id: &str,
) -> Option<Task> {
    let Some(task) = lock(tasks).increment_pomodoro(task_id) else {
        tracing::debug!(task_id, "work interval for unknown or completed task, nothing granted");
        return None;
    };
    let share = task.pomodoro_share();
    lock(xp).add_xp(u64::from(share));
    tracing::info!(task_id, pomodoros = task.pomodoro_count, xp = share, "pomodoro credited");
    Some(task)
}

pub struct StudySession {
    timer: Timer,
    storage: Storage,
    tasks: Arc<Mutex<TaskStore>>,
    xp: Arc<Mutex<XpLedger>>,
    quests: Mutex<QuestBoard>,
}

impl StudySession {
    /// Open a session over the backend named by `config`.
    pub fn open(config: &Config) -> Self {
        Self::open_with_tick_period(config, DEFAULT_TICK_PERIOD)
    }

    pub fn open_with_tick_period(config: &Config, tick_period: Duration) -> Self {
        Self::build(backend_for(config), config, tick_period)
    }

    /// Open a session over an explicit backend.
    pub fn with_store(backend: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self::build(backend, config, DEFAULT_TICK_PERIOD)
    }

    pub fn with_store_and_tick_period(
        backend: Arc<dyn KeyValueStore>,
        config: &Config,
        tick_period: Duration,
    ) -> Self {
        Self::build(backend, config, tick_period)
    }

    fn build(backend: Arc<dyn KeyValueStore>, config: &Config, tick_period: Duration) -> Self {
        let storage = Storage::new(backend, config.storage.namespace.clone());
        if !storage.is_durable() {
            tracing::info!("storage is not durable, progress lasts for this session only");
        }

        let tasks = Arc::new(Mutex::new(TaskStore::load(
            storage.clone(),
            config.goal.default_hours,
        )));
        let xp = Arc::new(Mutex::new(XpLedger::load(storage.clone())));
        let quests = Mutex::new(QuestBoard::load(storage.clone()));
        let timer = Timer::load_with_period(storage.clone(), tick_period);

        let listener_tasks = Arc::clone(&tasks);
        let listener_xp = Arc::clone(&xp);
        timer.listen(move |event: &Event| {
            if let Some(task_id) = event.completed_work_task() {
                credit_work_interval(&listener_tasks, &listener_xp, task_id);
            }
        });

        Self {
            timer,
            storage,
            tasks,
            xp,
            quests,
        }
    }

    // ── Components ───────────────────────────────────────────────────

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Locked task store. Do not hold the guard across timer calls.
    pub fn tasks(&self) -> MutexGuard<'_, TaskStore> {
        lock(&self.tasks)
    }

    pub fn xp(&self) -> MutexGuard<'_, XpLedger> {
        lock(&self.xp)
    }

    pub fn quests(&self) -> MutexGuard<'_, QuestBoard> {
        lock(&self.quests)
    }

    // ── Flows ────────────────────────────────────────────────────────

    /// Make `task_id` the active task and start the countdown for it.
    ///
    /// Returns the timer event, or `None` when the timer was already
    /// running.
    ///
    /// # Errors
    /// Returns [`CoreError::TaskNotFound`] for an unknown id.
    pub fn start_focus(&self, task_id: &str) -> Result<Option<Event>> {
        if !self.tasks().start_task(task_id) {
            return Err(CoreError::TaskNotFound(task_id.to_string()));
        }
        Ok(self.timer.start(task_id))
    }

    /// Credit one finished work interval to `task_id`, as the timer does on
    /// completion.
    pub fn record_work_interval(&self, task_id: &str) -> Option<Task> {
        credit_work_interval(&self.tasks, &self.xp, task_id)
    }

    /// Complete `task_id` and pay the part of its reward that pomodoros
    /// have not already paid.
    ///
    /// A countdown bound to the task is reset, so the interval in progress
    /// credits nothing.
    pub fn complete_task(&self, task_id: &str) -> Option<Task> {
        let task = self.tasks().complete_task(task_id)?;
        if self.timer.active_task_id().as_deref() == Some(task_id) {
            self.timer.reset();
            tracing::debug!(task_id, "timer reset for completed task");
        }
        let paid = u64::from(task.pomodoro_share()) * u64::from(task.pomodoro_count);
        let remainder = u64::from(task.xp_reward).saturating_sub(paid);
        self.xp().add_xp(remainder);
        tracing::debug!(task_id, remainder, "completion bonus");
        Some(task)
    }

    /// Complete a quest and grant its reward. `None` when nothing was paid.
    pub fn complete_quest(&self, quest_id: &str) -> Option<XpState> {
        let reward = self.quests().complete_quest(quest_id)?;
        self.xp().add_xp(u64::from(reward))
    }

    /// Stop the tick source, pausing a running countdown.
    pub fn shutdown(&self) {
        self.timer.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::{NewQuest, QuestCategory};
    use crate::task::NewTask;
    use crate::timer::{IntervalType, TimerPhase};

    fn session() -> StudySession {
        StudySession::with_store(Arc::new(MemoryStore::new()), &Config::default())
    }

    #[test]
    fn start_focus_requires_known_task() {
        let s = session();
        assert!(matches!(
            s.start_focus("missing"),
            Err(CoreError::TaskNotFound(_))
        ));
        assert_eq!(s.timer().phase(), TimerPhase::Idle);
    }

    #[test]
    fn manual_interval_grants_share() {
        let s = session();
        let id = s.tasks().add_task(NewTask::new("Chem", 4, 100)).unwrap();
        let t = s.record_work_interval(&id).unwrap();
        assert_eq!(t.pomodoro_count, 1);
        assert_eq!(s.xp().total_xp(), 25);
        assert!(s.record_work_interval("missing").is_none());
        assert_eq!(s.xp().total_xp(), 25);
    }

    #[test]
    fn completion_pays_the_remainder() {
        let s = session();
        let id = s.tasks().add_task(NewTask::new("Bio", 3, 100)).unwrap();
        s.record_work_interval(&id);
        s.record_work_interval(&id);
        assert_eq!(s.xp().total_xp(), 66);

        s.complete_task(&id).unwrap();
        assert_eq!(s.xp().total_xp(), 100);
        assert!(s.complete_task(&id).is_none());
        assert_eq!(s.xp().total_xp(), 100);
    }

    #[test]
    fn overrun_pomodoros_pay_no_remainder() {
        let s = session();
        let id = s.tasks().add_task(NewTask::new("Math", 1, 40)).unwrap();
        s.record_work_interval(&id);
        s.record_work_interval(&id);
        s.complete_task(&id);
        assert_eq!(s.xp().total_xp(), 80);
    }

    #[test]
    fn quest_reward_reaches_ledger() {
        let s = session();
        let id = s
            .quests()
            .add_quest(NewQuest::new("Read a paper", 120, QuestCategory::Weekly))
            .unwrap();
        let state = s.complete_quest(&id).unwrap();
        assert_eq!(state.total_xp, 120);
        assert_eq!(state.level, 2);
        assert!(s.complete_quest(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_work_interval_credits_task() {
        let s = StudySession::with_store_and_tick_period(
            Arc::new(MemoryStore::new()),
            &Config::default(),
            Duration::from_millis(1),
        );
        let id = s.tasks().add_task(NewTask::new("Latin", 2, 50)).unwrap();
        s.start_focus(&id).unwrap();

        tokio::time::sleep(Duration::from_millis(1_600)).await;

        let t = s.tasks().task(&id).unwrap();
        assert_eq!(t.pomodoro_count, 1);
        assert_eq!(t.time_spent_minutes, 25);
        assert_eq!(s.xp().total_xp(), 25);
        assert!((s.tasks().daily_goal().completed_hours - 25.0 / 60.0).abs() < 1e-9);

        let timer = s.timer().state();
        assert_eq!(timer.interval_type, IntervalType::Break);
        assert!(!timer.is_running);
        assert_eq!(s.timer().active_task_id(), None);
    }
}
