//! Conversation History
//!
//! Information Hiding:
//! - Persistence backend hidden behind `HistoryStorage`
//! - Pruning policy and timestamps internalized
//! - Callers replay plain role/content pairs, never storage entries

use crate::core::llm::ChatMessage;
use crate::storage::HistoryStorage;
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

const PREVIEW_CHARS: usize = 50;

/// Conversation id to its turns, oldest first.
pub type HistoryMap = BTreeMap<String, Vec<HistoryEntry>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

impl HistoryEntry {
    /// New entry stamped with the local wall-clock time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(Local::now().naive_local()),
        }
    }
}

impl From<&HistoryEntry> for ChatMessage {
    fn from(entry: &HistoryEntry) -> Self {
        ChatMessage {
            role: entry.role.as_str().to_string(),
            content: entry.content.clone(),
        }
    }
}

/// One row of the `/history` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub last_message: String,
    pub message_count: usize,
    #[serde(skip)]
    last_timestamp: Option<NaiveDateTime>,
}

/// Per-conversation history, persisted as one document after every change.
pub struct HistoryManager {
    storage: Arc<dyn HistoryStorage>,
    max_history: usize,
    conversations: HistoryMap,
}

impl HistoryManager {
    pub fn new(storage: Arc<dyn HistoryStorage>, max_history: usize) -> Self {
        Self {
            storage,
            max_history: max_history.max(1),
            conversations: HistoryMap::new(),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn storage_description(&self) -> String {
        self.storage.describe()
    }

    /// Replace the in-memory state with what the storage holds.
    ///
    /// An unreadable document is logged and treated as empty so a damaged
    /// file never prevents the chat from starting.
    pub async fn load(&mut self) {
        match self.storage.load().await {
            Ok(conversations) => {
                tracing::info!(
                    "Loaded {} conversations from {}",
                    conversations.len(),
                    self.storage.describe()
                );
                self.conversations = conversations;
            }
            Err(e) => {
                tracing::warn!("Could not load history: {:#}. Starting fresh.", e);
                self.conversations = HistoryMap::new();
            }
        }
    }

    pub async fn save(&self) -> Result<()> {
        self.storage.save(&self.conversations).await
    }

    /// Append a turn, keep only the newest `max_history` entries, then persist.
    pub async fn add_message(
        &mut self,
        conversation_id: &str,
        role: Role,
        content: impl Into<String>,
    ) -> Result<()> {
        let entries = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        entries.push(HistoryEntry::new(role, content));

        if entries.len() > self.max_history {
            let excess = entries.len() - self.max_history;
            entries.drain(..excess);
            tracing::debug!(
                "Pruned {} old messages from conversation '{}'",
                excess,
                conversation_id
            );
        }

        self.save().await
    }

    /// Ordered role/content pairs for replay to the model.
    pub fn get_messages(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.conversations
            .get(conversation_id)
            .map(|entries| entries.iter().map(ChatMessage::from).collect())
            .unwrap_or_default()
    }

    pub fn entries(&self, conversation_id: &str) -> &[HistoryEntry] {
        self.conversations
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn message_count(&self, conversation_id: &str) -> usize {
        self.entries(conversation_id).len()
    }

    /// Non-empty conversations, most recently active first.
    pub fn get_conversations(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .iter()
            .filter_map(|(id, entries)| {
                let last = entries.last()?;
                Some(ConversationSummary {
                    id: id.clone(),
                    last_message: preview(&last.content),
                    message_count: entries.len(),
                    last_timestamp: last.timestamp,
                })
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.last_timestamp
                .cmp(&a.last_timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }

    /// Drop one conversation, or every conversation when `conversation_id` is `None`.
    pub async fn clear(&mut self, conversation_id: Option<&str>) -> Result<()> {
        match conversation_id {
            Some(id) => {
                if self.conversations.remove(id).is_some() {
                    tracing::info!("Cleared conversation '{}'", id);
                }
            }
            None => {
                tracing::info!("Cleared all {} conversations", self.conversations.len());
                self.conversations.clear();
            }
        }
        self.save().await
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
