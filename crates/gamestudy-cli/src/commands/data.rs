use clap::Subcommand;

use super::{CmdResult, Context};

#[derive(Subcommand)]
pub enum DataAction {
    /// Delete every stored task, goal, XP total, quest and timer snapshot
    Clear,
}

pub fn run(action: DataAction, ctx: &Context) -> CmdResult {
    match action {
        DataAction::Clear => {
            let session = ctx.session();
            session.storage().clear();
            tracing::info!(namespace = session.storage().namespace(), "stored data cleared");
            ctx.emit(
                &serde_json::json!({ "cleared": session.storage().namespace() }),
                || "All study data cleared.".to_string(),
            )?;
        }
    }
    Ok(())
}
