use chrono::{DateTime, Utc};

use super::{completed_hours, validate_goal_hours, DailyGoal, NewTask, Task, POMODORO_MINUTES};
use crate::error::Result;
use crate::observe::{Observable, SubscriptionId};
use crate::storage::Storage;

const TASKS_KEY: &str = "tasks";
const GOAL_KEY: &str = "dailyGoal";

/// Owns the task collection and the daily goal.
///
/// Every mutation builds a new collection, persists it and then publishes
/// it; observers never see a partially updated list.
pub struct TaskStore {
    storage: Storage,
    tasks: Observable<Vec<Task>>,
    goal: Observable<DailyGoal>,
}

impl TaskStore {
    /// Load persisted tasks and goal. `default_goal_hours` is used when no
    /// goal has been stored yet.
    pub fn load(storage: Storage, default_goal_hours: f64) -> Self {
        let tasks: Vec<Task> = storage.get(TASKS_KEY).unwrap_or_default();
        let mut goal = storage
            .get::<DailyGoal>(GOAL_KEY)
            .unwrap_or_else(|| DailyGoal::new(default_goal_hours));
        // Stored completed hours are never trusted over the tasks themselves.
        goal.completed_hours = completed_hours(&tasks);

        tracing::debug!(tasks = tasks.len(), "task store loaded");
        Self {
            storage,
            tasks: Observable::new(tasks),
            goal: Observable::new(goal),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.get()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.tasks.get().into_iter().find(|t| t.id == id)
    }

    pub fn daily_tasks(&self) -> Vec<Task> {
        self.tasks
            .get()
            .into_iter()
            .filter(|t| t.category == super::TaskCategory::Daily)
            .collect()
    }

    pub fn active_task(&self) -> Option<Task> {
        self.tasks.get().into_iter().find(|t| t.is_active)
    }

    pub fn daily_goal(&self) -> DailyGoal {
        self.goal.get()
    }

    pub fn goal_progress_pct(&self) -> f64 {
        self.goal.get().progress_pct()
    }

    pub fn subscribe_tasks<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Vec<Task>) + Send + Sync + 'static,
    {
        self.tasks.subscribe(callback)
    }

    pub fn subscribe_goal<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DailyGoal) + Send + Sync + 'static,
    {
        self.goal.subscribe(callback)
    }

    pub fn unsubscribe_tasks(&self, id: SubscriptionId) -> bool {
        self.tasks.unsubscribe(id)
    }

    pub fn unsubscribe_goal(&self, id: SubscriptionId) -> bool {
        self.goal.unsubscribe(id)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a task with zeroed progress and return its id.
    ///
    /// # Errors
    /// Returns a validation error for an empty title, a zero pomodoro
    /// target or a zero reward. Nothing is stored in that case.
    pub fn add_task(&mut self, new: NewTask) -> Result<String> {
        new.validate()?;
        let id = uuid::Uuid::new_v4().to_string();
        let task = Task::from_new(id.clone(), new);

        let mut tasks = self.tasks.get();
        tasks.push(task);
        self.commit_tasks(tasks);

        tracing::info!(task_id = %id, "task added");
        Ok(id)
    }

    pub fn start_task(&mut self, id: &str) -> bool {
        self.start_task_at(id, Utc::now())
    }

    /// Make `id` the single active task.
    ///
    /// Any other active task is deactivated and unpaused.
    pub fn start_task_at(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        if !self.contains(id) {
            tracing::debug!(task_id = id, "start_task: unknown task");
            return false;
        }
        let tasks = self
            .tasks
            .get()
            .into_iter()
            .map(|mut t| {
                if t.id == id {
                    t.is_active = true;
                    t.is_paused = false;
                    t.start_time = Some(now);
                } else if t.is_active {
                    t.is_active = false;
                    t.is_paused = false;
                }
                t
            })
            .collect();
        self.commit_tasks(tasks);
        true
    }

    pub fn pause_task(&mut self, id: &str) -> bool {
        self.set_paused(id, true)
    }

    pub fn resume_task(&mut self, id: &str) -> bool {
        self.set_paused(id, false)
    }

    pub fn complete_task(&mut self, id: &str) -> Option<Task> {
        self.complete_task_at(id, Utc::now())
    }

    /// Mark `id` completed at `now` and return the finished task.
    ///
    /// Time spent becomes the whole minutes since `start_time` when the task
    /// was started; otherwise the accumulated value is kept. Completing an
    /// already completed task does nothing.
    pub fn complete_task_at(&mut self, id: &str, now: DateTime<Utc>) -> Option<Task> {
        let current = self.task(id)?;
        if current.is_completed {
            tracing::debug!(task_id = id, "complete_task: already completed");
            return None;
        }

        let mut finished = None;
        let tasks = self
            .tasks
            .get()
            .into_iter()
            .map(|mut t| {
                if t.id == id {
                    t.is_completed = true;
                    t.is_active = false;
                    t.is_paused = false;
                    t.end_time = Some(now);
                    if let Some(start) = t.start_time {
                        let minutes = (now - start).num_minutes().max(0);
                        t.time_spent_minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
                    }
                    finished = Some(t.clone());
                }
                t
            })
            .collect();
        self.commit_tasks(tasks);
        self.recompute_goal();

        if let Some(ref t) = finished {
            tracing::info!(task_id = id, minutes = t.time_spent_minutes, "task completed");
        }
        finished
    }

    /// Credit one finished work interval to `id`.
    ///
    /// Adds one pomodoro and 25 minutes; there is no cap at the target.
    /// Completed tasks are final and are not credited.
    pub fn increment_pomodoro(&mut self, id: &str) -> Option<Task> {
        let Some(current) = self.task(id) else {
            tracing::debug!(task_id = id, "increment_pomodoro: unknown task");
            return None;
        };
        if current.is_completed {
            tracing::debug!(task_id = id, "increment_pomodoro: task already completed");
            return None;
        }
        let mut updated = None;
        let tasks = self
            .tasks
            .get()
            .into_iter()
            .map(|mut t| {
                if t.id == id {
                    t.pomodoro_count = t.pomodoro_count.saturating_add(1);
                    t.time_spent_minutes = t.time_spent_minutes.saturating_add(POMODORO_MINUTES);
                    updated = Some(t.clone());
                }
                t
            })
            .collect();
        self.commit_tasks(tasks);
        self.recompute_goal();
        updated
    }

    /// Overwrite the target hours. Completed hours are left to recomputation.
    ///
    /// # Errors
    /// Returns a validation error unless `0.5 <= hours <= 24`.
    pub fn set_daily_goal(&mut self, hours: f64) -> Result<DailyGoal> {
        validate_goal_hours(hours)?;
        let goal = DailyGoal {
            target_hours: hours,
            ..self.goal.get()
        };
        self.commit_goal(goal);
        Ok(goal)
    }

    /// Clear every task's progress, keeping identity and reward settings.
    pub fn reset_daily_progress(&mut self) {
        let tasks = self
            .tasks
            .get()
            .into_iter()
            .map(|mut t| {
                t.clear_progress();
                t
            })
            .collect();
        self.commit_tasks(tasks);
        let goal = DailyGoal::new(self.goal.get().target_hours);
        self.commit_goal(goal);
        tracing::info!("daily progress reset");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn contains(&self, id: &str) -> bool {
        self.tasks.get().iter().any(|t| t.id == id)
    }

    fn set_paused(&mut self, id: &str, paused: bool) -> bool {
        if !self.contains(id) {
            tracing::debug!(task_id = id, paused, "set_paused: unknown task");
            return false;
        }
        let tasks = self
            .tasks
            .get()
            .into_iter()
            .map(|mut t| {
                if t.id == id {
                    t.is_paused = paused;
                }
                t
            })
            .collect();
        self.commit_tasks(tasks);
        true
    }

    fn recompute_goal(&mut self) {
        let goal = DailyGoal {
            completed_hours: completed_hours(&self.tasks.get()),
            ..self.goal.get()
        };
        self.commit_goal(goal);
    }

    fn commit_tasks(&mut self, tasks: Vec<Task>) {
        self.storage.set(TASKS_KEY, &tasks);
        self.tasks.publish(tasks);
    }

    fn commit_goal(&mut self, goal: DailyGoal) {
        self.storage.set(GOAL_KEY, &goal);
        self.goal.publish(goal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::Duration;

    fn store() -> TaskStore {
        TaskStore::load(Storage::memory(), 4.0)
    }

    #[test]
    fn add_and_start() {
        let mut s = store();
        let id = s.add_task(NewTask::new("Algebra", 2, 40)).unwrap();
        assert!(s.start_task(&id));
        let t = s.task(&id).unwrap();
        assert_eq!(t.status(), TaskStatus::Active);
        assert!(t.start_time.is_some());
    }

    #[test]
    fn start_enforces_single_active() {
        let mut s = store();
        let a = s.add_task(NewTask::new("A", 1, 10)).unwrap();
        let b = s.add_task(NewTask::new("B", 1, 10)).unwrap();
        s.start_task(&a);
        s.pause_task(&a);
        s.start_task(&b);

        let active: Vec<_> = s.tasks().into_iter().filter(|t| t.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b);
        assert!(!s.task(&a).unwrap().is_paused);
    }

    #[test]
    fn unknown_ids_are_inert() {
        let mut s = store();
        assert!(!s.start_task("nope"));
        assert!(!s.pause_task("nope"));
        assert!(s.complete_task("nope").is_none());
        assert!(s.increment_pomodoro("nope").is_none());
        assert!(s.tasks().is_empty());
    }

    #[test]
    fn complete_uses_elapsed_minutes() {
        let mut s = store();
        let id = s.add_task(NewTask::new("Essay", 2, 50)).unwrap();
        let now = Utc::now();
        s.start_task_at(&id, now - Duration::minutes(30));
        let done = s.complete_task_at(&id, now).unwrap();

        assert_eq!(done.time_spent_minutes, 30);
        assert!(done.is_completed);
        assert!(!done.is_active);
        assert_eq!(s.daily_goal().completed_hours, 0.5);
        assert!(s.complete_task_at(&id, now).is_none());
    }

    #[test]
    fn complete_without_start_keeps_accumulated_time() {
        let mut s = store();
        let id = s.add_task(NewTask::new("Flashcards", 2, 20)).unwrap();
        s.increment_pomodoro(&id);
        let done = s.complete_task(&id).unwrap();
        assert_eq!(done.time_spent_minutes, 25);
    }

    #[test]
    fn increment_is_uncapped() {
        let mut s = store();
        let id = s.add_task(NewTask::new("Drill", 1, 10)).unwrap();
        s.increment_pomodoro(&id);
        let t = s.increment_pomodoro(&id).unwrap();
        assert_eq!(t.pomodoro_count, 2);
        assert_eq!(t.time_spent_minutes, 50);
        assert!((s.daily_goal().completed_hours - 50.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn completed_task_is_not_credited() {
        let mut s = store();
        let id = s.add_task(NewTask::new("Quiz", 1, 40)).unwrap();
        let done = s.complete_task(&id).unwrap();

        assert!(s.increment_pomodoro(&id).is_none());
        let t = s.task(&id).unwrap();
        assert_eq!(t.time_spent_minutes, done.time_spent_minutes);
        assert_eq!(t.pomodoro_count, 0);
        assert_eq!(s.daily_goal().completed_hours, 0.0);
    }

    #[test]
    fn queries_follow_progress() {
        let mut s = store();
        let a = s.add_task(NewTask::new("Vocab", 2, 20)).unwrap();
        s.add_task(NewTask::new("Grammar", 1, 10)).unwrap();
        assert!(s.active_task().is_none());
        assert_eq!(s.daily_tasks().len(), 2);

        s.start_task(&a);
        assert_eq!(s.active_task().map(|t| t.id), Some(a.clone()));

        // Two pomodoros are 50 of the 240 goal minutes.
        s.increment_pomodoro(&a);
        s.increment_pomodoro(&a);
        assert!((s.goal_progress_pct() - 50.0 / 240.0 * 100.0).abs() < 1e-9);

        s.complete_task(&a);
        assert!(s.active_task().is_none());
    }

    #[test]
    fn late_goal_subscriber_sees_current_goal() {
        let mut s = store();
        s.set_daily_goal(2.0).unwrap();

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let id = s.subscribe_goal(move |goal| sink.lock().unwrap().push(*goal));
        s.set_daily_goal(3.0).unwrap();
        assert!(s.unsubscribe_goal(id));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], DailyGoal::new(2.0));
        assert_eq!(seen[1].target_hours, 3.0);
    }

    #[test]
    fn invalid_task_is_not_stored() {
        let storage = Storage::memory();
        let mut s = TaskStore::load(storage.clone(), 4.0);
        assert!(s.add_task(NewTask::new("", 1, 10)).is_err());
        assert!(s.tasks().is_empty());
        assert!(storage.get::<Vec<Task>>("tasks").is_none());
    }

    #[test]
    fn set_goal_keeps_completed_hours() {
        let mut s = store();
        let id = s.add_task(NewTask::new("Lab", 4, 100)).unwrap();
        s.increment_pomodoro(&id);
        let before = s.daily_goal().completed_hours;
        let goal = s.set_daily_goal(6.0).unwrap();
        assert_eq!(goal.target_hours, 6.0);
        assert_eq!(goal.completed_hours, before);
        assert!(s.set_daily_goal(0.0).is_err());
        assert_eq!(s.daily_goal().target_hours, 6.0);
    }

    #[test]
    fn reset_clears_progress_but_keeps_identity() {
        let mut s = store();
        let id = s.add_task(NewTask::new("Physics", 3, 60)).unwrap();
        s.start_task(&id);
        s.increment_pomodoro(&id);
        s.complete_task(&id);
        s.set_daily_goal(2.0).unwrap();

        s.reset_daily_progress();

        let t = s.task(&id).unwrap();
        assert_eq!(t.title, "Physics");
        assert_eq!(t.xp_reward, 60);
        assert_eq!(t.target_pomodoros, 3);
        assert_eq!(t.status(), TaskStatus::Pending);
        assert_eq!(t.pomodoro_count, 0);
        assert_eq!(t.time_spent_minutes, 0);
        assert!(t.start_time.is_none() && t.end_time.is_none());
        assert_eq!(s.daily_goal(), DailyGoal::new(2.0));
    }

    #[test]
    fn reload_recomputes_completed_hours() {
        let storage = Storage::memory();
        let mut s = TaskStore::load(storage.clone(), 4.0);
        let id = s.add_task(NewTask::new("History", 2, 30)).unwrap();
        s.increment_pomodoro(&id);
        storage.set(
            "dailyGoal",
            &DailyGoal {
                target_hours: 3.0,
                completed_hours: 99.0,
            },
        );

        let reloaded = TaskStore::load(storage, 4.0);
        assert_eq!(reloaded.tasks().len(), 1);
        assert_eq!(reloaded.daily_goal().target_hours, 3.0);
        assert!((reloaded.daily_goal().completed_hours - 25.0 / 60.0).abs() < 1e-9);
    }
}
