//! Task management commands for CLI.

use clap::Subcommand;
use gamestudy_core::{CoreError, NewTask, Task, TaskStatus};

use super::{CmdResult, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Planned pomodoros (default: 1)
        #[arg(long, default_value = "1")]
        pomodoros: u32,
        /// XP paid out over the task (default: 50)
        #[arg(long, default_value = "50")]
        xp: u32,
    },
    /// List tasks
    List {
        /// Only the active task
        #[arg(long, conflicts_with = "daily")]
        active: bool,
        /// Only daily tasks
        #[arg(long)]
        daily: bool,
    },
    /// Make a task the active one
    Start {
        /// Task ID
        id: String,
    },
    /// Pause a task
    Pause {
        /// Task ID
        id: String,
    },
    /// Resume a paused task
    Resume {
        /// Task ID
        id: String,
    },
    /// Complete a task and collect its remaining XP
    Complete {
        /// Task ID
        id: String,
    },
    /// Credit one finished pomodoro to a task
    Pomodoro {
        /// Task ID
        id: String,
    },
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Active => "active",
        TaskStatus::Paused => "paused",
        TaskStatus::Completed => "done",
    }
}

pub(crate) fn describe(task: &Task) -> String {
    format!(
        "{}  [{}] {}  {}/{} pomodoros, {} min, {} xp",
        task.id,
        status_label(task.status()),
        task.title,
        task.pomodoro_count,
        task.target_pomodoros,
        task.time_spent_minutes,
        task.xp_reward,
    )
}

fn not_found(id: String) -> Box<dyn std::error::Error> {
    CoreError::TaskNotFound(id).into()
}

pub fn run(action: TaskAction, ctx: &Context) -> CmdResult {
    let session = ctx.session();

    match action {
        TaskAction::Add {
            title,
            description,
            pomodoros,
            xp,
        } => {
            let mut new = NewTask::new(title, pomodoros, xp);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            let id = session.tasks().add_task(new)?;
            ctx.emit(&serde_json::json!({ "id": id }), || format!("Task created: {id}"))?;
        }
        TaskAction::List { active, daily } => {
            let tasks: Vec<Task> = if active {
                session.tasks().active_task().into_iter().collect()
            } else if daily {
                session.tasks().daily_tasks()
            } else {
                session.tasks().tasks()
            };
            ctx.emit(&tasks, || {
                if tasks.is_empty() {
                    "No tasks.".to_string()
                } else {
                    tasks.iter().map(describe).collect::<Vec<_>>().join("\n")
                }
            })?;
        }
        TaskAction::Start { id } => {
            if !session.tasks().start_task(&id) {
                return Err(not_found(id));
            }
            print_task(ctx, &session.tasks().task(&id))?;
        }
        TaskAction::Pause { id } => {
            if !session.tasks().pause_task(&id) {
                return Err(not_found(id));
            }
            print_task(ctx, &session.tasks().task(&id))?;
        }
        TaskAction::Resume { id } => {
            if !session.tasks().resume_task(&id) {
                return Err(not_found(id));
            }
            print_task(ctx, &session.tasks().task(&id))?;
        }
        TaskAction::Complete { id } => {
            let before = session.xp().total_xp();
            let Some(task) = session.complete_task(&id) else {
                return match session.tasks().task(&id) {
                    Some(_) => Err(format!("task already completed: {id}").into()),
                    None => Err(not_found(id)),
                };
            };
            let gained = session.xp().total_xp() - before;
            ctx.emit(&task, || format!("{}\n+{gained} xp", describe(&task)))?;
        }
        TaskAction::Pomodoro { id } => {
            let Some(task) = session.record_work_interval(&id) else {
                return match session.tasks().task(&id) {
                    Some(_) => Err(format!("task already completed: {id}").into()),
                    None => Err(not_found(id)),
                };
            };
            ctx.emit(&task, || describe(&task))?;
        }
    }
    Ok(())
}

fn print_task(ctx: &Context, task: &Option<Task>) -> CmdResult {
    match task {
        Some(task) => ctx.emit(task, || describe(task)),
        None => Ok(()),
    }
}
