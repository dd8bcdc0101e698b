use clap::Subcommand;
use gamestudy_core::{NewQuest, Quest, QuestCategory};

use super::{CmdResult, Context};

#[derive(Subcommand)]
pub enum QuestAction {
    /// Create a quest
    Add {
        /// Quest title
        title: String,
        /// Quest description
        #[arg(long)]
        description: Option<String>,
        /// XP reward (default: 50)
        #[arg(long, default_value = "50")]
        xp: u32,
        /// daily, weekly or achievement (default: daily)
        #[arg(long, default_value = "daily")]
        category: QuestCategory,
    },
    /// List quests
    List {
        /// Only daily quests
        #[arg(long)]
        daily: bool,
    },
    /// Complete a quest and collect its reward
    Complete {
        /// Quest ID
        id: String,
    },
    /// Delete a quest
    Remove {
        /// Quest ID
        id: String,
    },
}

fn describe(quest: &Quest) -> String {
    let category = match quest.category {
        QuestCategory::Daily => "daily",
        QuestCategory::Weekly => "weekly",
        QuestCategory::Achievement => "achievement",
    };
    format!(
        "{}  [{}] {} ({}, {} xp)",
        quest.id,
        if quest.done { "x" } else { " " },
        quest.title,
        category,
        quest.xp_reward
    )
}

pub fn run(action: QuestAction, ctx: &Context) -> CmdResult {
    let session = ctx.session();

    match action {
        QuestAction::Add {
            title,
            description,
            xp,
            category,
        } => {
            let mut new = NewQuest::new(title, xp, category);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            let id = session.quests().add_quest(new)?;
            ctx.emit(&serde_json::json!({ "id": id }), || format!("Quest created: {id}"))?;
        }
        QuestAction::List { daily } => {
            let quests = if daily {
                session.quests().daily_quests()
            } else {
                session.quests().quests()
            };
            ctx.emit(&quests, || {
                if quests.is_empty() {
                    "No quests.".to_string()
                } else {
                    quests.iter().map(describe).collect::<Vec<_>>().join("\n")
                }
            })?;
        }
        QuestAction::Complete { id } => {
            let Some(state) = session.complete_quest(&id) else {
                return match session.quests().quest(&id) {
                    Some(_) => Err(format!("quest already completed: {id}").into()),
                    None => Err(format!("quest not found: {id}").into()),
                };
            };
            ctx.emit(&state, || super::xp::describe(&state))?;
        }
        QuestAction::Remove { id } => {
            if !session.quests().remove_quest(&id) {
                return Err(format!("quest not found: {id}").into());
            }
            ctx.emit(&serde_json::json!({ "removed": id }), || format!("Quest removed: {id}"))?;
        }
    }
    Ok(())
}
