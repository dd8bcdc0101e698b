//! Tick source for the [`TimerEngine`].
//!
//! [`Timer`] owns the engine behind a mutex and a single tokio task that
//! ticks it once per period while running. Starting or resuming aborts the
//! previous task before spawning the next one, and each task carries the
//! engine generation it was spawned for, so at most one source can ever
//! move the countdown.
//!
//! State snapshots are published while the engine lock is held, which keeps
//! them in order. Events are emitted after the lock is released, so an event
//! listener may call back into the timer. State subscribers must not.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::engine::{TickOutcome, TimerEngine, TimerPhase};
use super::interval::TimerState;
use crate::events::Event;
use crate::observe::{Listeners, Observable, SubscriptionId};
use crate::storage::Storage;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

const TIMER_KEY: &str = "timer";

struct Shared {
    engine: Mutex<TimerEngine>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    state: Observable<TimerState>,
    events: Listeners<Event>,
    storage: Storage,
    tick_period: Duration,
}

impl Shared {
    fn engine(&self) -> MutexGuard<'_, TimerEngine> {
        self.engine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ticker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, engine: &TimerEngine) {
        self.storage.set(TIMER_KEY, engine);
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self.ticker().take() {
            handle.abort();
        }
    }
}

/// Countdown timer with a live tick source.
pub struct Timer {
    shared: Arc<Shared>,
}

impl Timer {
    /// Load the persisted timer, ticking once per second.
    pub fn load(storage: Storage) -> Self {
        Self::load_with_period(storage, DEFAULT_TICK_PERIOD)
    }

    /// Load the persisted timer with a custom tick period.
    ///
    /// The countdown still counts one second per tick; a shorter period
    /// only makes it run faster in wall-clock terms.
    pub fn load_with_period(storage: Storage, tick_period: Duration) -> Self {
        let engine = storage
            .get::<TimerEngine>(TIMER_KEY)
            .map(TimerEngine::restore)
            .unwrap_or_default();
        let state = engine.state();
        Self {
            shared: Arc::new(Shared {
                engine: Mutex::new(engine),
                ticker: Mutex::new(None),
                state: Observable::new(state),
                events: Listeners::new(),
                storage,
                tick_period: tick_period.max(Duration::from_millis(1)),
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.shared.engine().state()
    }

    pub fn phase(&self) -> TimerPhase {
        self.shared.engine().phase()
    }

    pub fn active_task_id(&self) -> Option<String> {
        self.shared.engine().active_task_id().map(str::to_string)
    }

    /// Whether a tick task is currently alive.
    pub fn has_tick_source(&self) -> bool {
        self.shared
            .ticker()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Replay-latest subscription to timer snapshots.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&TimerState) + Send + Sync + 'static,
    {
        self.shared.state.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.state.unsubscribe(id)
    }

    /// Register for timer events, including `WorkIntervalCompleted`.
    pub fn listen<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared.events.listen(callback)
    }

    pub fn unlisten(&self, id: SubscriptionId) -> bool {
        self.shared.events.unlisten(id)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the countdown for `task_id`.
    ///
    /// Requires a tokio runtime; without one the call is inert.
    pub fn start(&self, task_id: &str) -> Option<Event> {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("timer start ignored: no async runtime");
            return None;
        };
        self.run_command(|engine| engine.start(task_id), Some(runtime))
    }

    pub fn pause(&self) -> Option<Event> {
        self.run_command(TimerEngine::pause, None)
    }

    pub fn resume(&self) -> Option<Event> {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("timer resume ignored: no async runtime");
            return None;
        };
        self.run_command(TimerEngine::resume, Some(runtime))
    }

    pub fn reset(&self) -> Event {
        let event = self.run_command(|engine| Some(engine.reset()), None);
        event.unwrap_or(Event::TimerReset {
            at: chrono::Utc::now(),
        })
    }

    /// Stop the tick source. A running countdown is paused first so the
    /// persisted snapshot can be resumed by a later session.
    pub fn shutdown(&self) -> Option<Event> {
        let event = self.pause();
        self.shared.stop_ticker();
        tracing::debug!("timer shut down");
        event
    }

    fn run_command<F>(&self, command: F, spawn_on: Option<Handle>) -> Option<Event>
    where
        F: FnOnce(&mut TimerEngine) -> Option<Event>,
    {
        let event = {
            let mut engine = self.shared.engine();
            let event = command(&mut *engine)?;

            self.shared.stop_ticker();
            if let Some(runtime) = spawn_on.filter(|_| engine.is_running()) {
                let ticker = run_ticker(Arc::clone(&self.shared), engine.generation());
                *self.shared.ticker() = Some(runtime.spawn(ticker));
            }

            self.shared.persist(&engine);
            self.shared.state.publish(engine.state());
            event
        };

        tracing::debug!(?event, "timer command");
        self.shared.events.emit(&event);
        Some(event)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_ticker(shared: Arc<Shared>, generation: u64) {
    let period = shared.tick_period;
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let outcome = {
            let mut engine = shared.engine();
            let outcome = engine.tick(generation);
            match &outcome {
                TickOutcome::Ignored => {}
                TickOutcome::Counted => shared.state.publish(engine.state()),
                TickOutcome::Completed(_) => {
                    shared.persist(&engine);
                    shared.state.publish(engine.state());
                }
            }
            outcome
        };

        match outcome {
            TickOutcome::Ignored => return,
            TickOutcome::Counted => {}
            TickOutcome::Completed(events) => {
                for event in &events {
                    tracing::info!(?event, "interval completed");
                    shared.events.emit(event);
                }
                return;
            }
        }
    }
}
