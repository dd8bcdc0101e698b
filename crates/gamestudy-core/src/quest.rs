//! One-shot XP bounties that are independent of the timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::observe::{Observable, SubscriptionId};
use crate::storage::Storage;

const QUESTS_KEY: &str = "quests";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestCategory {
    #[default]
    Daily,
    Weekly,
    Achievement,
}

impl std::str::FromStr for QuestCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "achievement" => Ok(Self::Achievement),
            other => Err(format!("unknown quest category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub xp_reward: u32,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub category: QuestCategory,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input to [`QuestBoard::add_quest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewQuest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub xp_reward: u32,
    #[serde(default)]
    pub category: QuestCategory,
}

impl NewQuest {
    pub fn new(title: impl Into<String>, xp_reward: u32, category: QuestCategory) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            xp_reward,
            category,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }
        if self.xp_reward == 0 {
            return Err(ValidationError::NotPositive { field: "xp_reward" });
        }
        Ok(())
    }
}

pub struct QuestBoard {
    storage: Storage,
    quests: Observable<Vec<Quest>>,
}

impl QuestBoard {
    pub fn load(storage: Storage) -> Self {
        let quests: Vec<Quest> = storage.get(QUESTS_KEY).unwrap_or_default();
        tracing::debug!(quests = quests.len(), "quest board loaded");
        Self {
            storage,
            quests: Observable::new(quests),
        }
    }

    pub fn quests(&self) -> Vec<Quest> {
        self.quests.get()
    }

    pub fn quest(&self, id: &str) -> Option<Quest> {
        self.quests.get().into_iter().find(|q| q.id == id)
    }

    pub fn daily_quests(&self) -> Vec<Quest> {
        self.quests
            .get()
            .into_iter()
            .filter(|q| q.category == QuestCategory::Daily)
            .collect()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Vec<Quest>) + Send + Sync + 'static,
    {
        self.quests.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.quests.unsubscribe(id)
    }

    /// # Errors
    /// Returns a validation error for an empty title or a zero reward.
    pub fn add_quest(&mut self, new: NewQuest) -> Result<String> {
        new.validate()?;
        let id = uuid::Uuid::new_v4().to_string();
        let quest = Quest {
            id: id.clone(),
            title: new.title.trim().to_string(),
            description: new.description,
            xp_reward: new.xp_reward,
            done: false,
            category: new.category,
            created_at: Utc::now(),
            completed_at: None,
        };

        let mut quests = self.quests.get();
        quests.push(quest);
        self.commit(quests);

        tracing::info!(quest_id = %id, "quest added");
        Ok(id)
    }

    /// Mark `id` done and return its reward.
    ///
    /// The reward is paid once: unknown or already finished quests return
    /// `None`.
    pub fn complete_quest(&mut self, id: &str) -> Option<u32> {
        let quest = self.quest(id)?;
        if quest.done {
            tracing::debug!(quest_id = id, "complete_quest: already done");
            return None;
        }
        let now = Utc::now();
        let quests = self
            .quests
            .get()
            .into_iter()
            .map(|mut q| {
                if q.id == id {
                    q.done = true;
                    q.completed_at = Some(now);
                }
                q
            })
            .collect();
        self.commit(quests);

        tracing::info!(quest_id = id, xp = quest.xp_reward, "quest completed");
        Some(quest.xp_reward)
    }

    pub fn remove_quest(&mut self, id: &str) -> bool {
        let mut quests = self.quests.get();
        let before = quests.len();
        quests.retain(|q| q.id != id);
        if quests.len() == before {
            tracing::debug!(quest_id = id, "remove_quest: unknown quest");
            return false;
        }
        self.commit(quests);
        true
    }

    fn commit(&mut self, quests: Vec<Quest>) {
        self.storage.set(QUESTS_KEY, &quests);
        self.quests.publish(quests);
    }
}
