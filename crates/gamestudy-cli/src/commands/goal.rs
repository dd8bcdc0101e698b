use clap::Subcommand;
use gamestudy_core::DailyGoal;

use super::{CmdResult, Context};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Show today's goal and progress
    Show,
    /// Set the target study hours (0.5 to 24)
    Set {
        /// Target hours
        hours: f64,
    },
    /// Clear every task's progress for a new day
    Reset,
}

fn describe(goal: &DailyGoal, progress: f64) -> String {
    format!(
        "{:.2} / {:.1} hours ({:.0}%){}",
        goal.completed_hours,
        goal.target_hours,
        progress,
        if goal.is_met() { "  goal met" } else { "" }
    )
}

fn report(goal: &DailyGoal, progress: f64) -> serde_json::Value {
    serde_json::json!({
        "targetHours": goal.target_hours,
        "completedHours": goal.completed_hours,
        "progressPct": progress,
        "met": goal.is_met(),
    })
}

pub fn run(action: GoalAction, ctx: &Context) -> CmdResult {
    let session = ctx.session();

    let goal = match action {
        GoalAction::Show => session.tasks().daily_goal(),
        GoalAction::Set { hours } => session.tasks().set_daily_goal(hours)?,
        GoalAction::Reset => {
            session.tasks().reset_daily_progress();
            session.tasks().daily_goal()
        }
    };
    let progress = session.tasks().goal_progress_pct();
    ctx.emit(&report(&goal, progress), || describe(&goal, progress))
}
