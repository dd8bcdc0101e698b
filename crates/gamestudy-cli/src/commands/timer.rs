use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use gamestudy_core::{Event, IntervalType, StudySession, TimerState};
use tokio::sync::mpsc;

use super::{CmdResult, Context};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the countdown for a task in the foreground until the interval ends
    Run {
        /// Task to focus on
        #[arg(long)]
        task: String,
        /// Milliseconds per countdown second (default: 1000)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Print the current timer state
    Status,
    /// Reset to an idle work interval
    Reset,
}

fn status_json(session: &StudySession) -> serde_json::Value {
    let timer = session.timer();
    serde_json::json!({
        "phase": timer.phase(),
        "display": timer.state().display(),
        "activeTaskId": timer.active_task_id(),
        "state": timer.state(),
    })
}

fn describe(state: &TimerState) -> String {
    let phase = if state.is_running {
        "running"
    } else if state.is_paused {
        "paused"
    } else {
        "idle"
    };
    format!("{} {} ({phase})", state.interval_type.label(), state.display())
}

pub async fn run(action: TimerAction, ctx: &Context) -> CmdResult {
    match action {
        TimerAction::Run { task, interval_ms } => {
            let period = Duration::from_millis(interval_ms.unwrap_or(1000));
            let session = ctx.session_with_tick_period(period);
            run_focus(&session, &task, ctx).await
        }
        TimerAction::Status => {
            let session = ctx.session();
            let state = session.timer().state();
            ctx.emit(&status_json(&session), || {
                let task = session
                    .timer()
                    .active_task_id()
                    .map(|id| format!("  task {id}"))
                    .unwrap_or_default();
                format!("{}{task}", describe(&state))
            })
        }
        TimerAction::Reset => {
            let session = ctx.session();
            let event = session.timer().reset();
            ctx.emit(&event, || describe(&session.timer().state()))
        }
    }
}

async fn run_focus(session: &StudySession, task_id: &str, ctx: &Context) -> CmdResult {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let listener = session.timer().listen(move |event| {
        let finished = matches!(
            event,
            Event::WorkIntervalCompleted { .. }
                | Event::IntervalCompleted {
                    completed: IntervalType::Break,
                    ..
                }
        );
        if finished {
            let _ = done_tx.send(event.clone());
        }
    });

    let live = if ctx.json() {
        None
    } else {
        Some(session.timer().subscribe(|state| {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "\r{}   ", describe(state));
            let _ = stderr.flush();
        }))
    };

    if session.start_focus(task_id)?.is_none() {
        return Err("timer is already running".into());
    }
    tracing::info!(task_id, "focus started");

    let finished = done_rx.recv().await;

    session.timer().unlisten(listener);
    if let Some(id) = live {
        session.timer().unsubscribe(id);
        eprintln!();
    }

    let Some(event) = finished else {
        return Err("timer stopped before the interval finished".into());
    };
    let task = session.tasks().task(task_id);
    let xp = session.xp().state();

    ctx.emit(
        &serde_json::json!({ "event": event, "task": task, "xp": xp }),
        || {
            let headline = match &event {
                Event::WorkIntervalCompleted { .. } => "Work interval complete. Time for a break.",
                _ => "Break over. Back to work.",
            };
            let mut lines = vec![headline.to_string()];
            if let Some(task) = &task {
                lines.push(super::task::describe(task));
            }
            lines.push(super::xp::describe(&xp));
            lines.join("\n")
        },
    )
}
