use clap::Subcommand;
use gamestudy_core::XpState;

use super::{CmdResult, Context};

#[derive(Subcommand)]
pub enum XpAction {
    /// Show level and progress
    Show,
    /// Grant XP directly
    Add {
        /// Amount of XP
        amount: u64,
    },
}

pub(crate) fn describe(state: &XpState) -> String {
    format!(
        "Level {}: {}/{} xp ({:.0}%), total {}",
        state.level,
        state.current_level_xp,
        state.xp_to_next_level,
        state.level_progress(),
        state.total_xp
    )
}

pub fn run(action: XpAction, ctx: &Context) -> CmdResult {
    let session = ctx.session();

    let state = match action {
        XpAction::Show => session.xp().state(),
        XpAction::Add { amount } => {
            let mut xp = session.xp();
            let before = xp.level();
            let state = xp.add_xp(amount).unwrap_or_else(|| xp.state());
            if state.level > before && !ctx.json() {
                println!("Level up!");
            }
            state
        }
    };
    ctx.emit(&state, || describe(&state))
}
