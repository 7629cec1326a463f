//! In-Memory History Storage
//!
//! Information Hiding:
//! - Stored copy guarded by an async RwLock
//! - Suitable for testing and ephemeral sessions

use super::HistoryStorage;
use crate::history::HistoryMap;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Data is lost when process terminates
#[derive(Default)]
pub struct InMemoryStorage {
    document: RwLock<HistoryMap>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing mapping, as if it had been saved earlier.
    pub fn with_history(history: HistoryMap) -> Self {
        Self {
            document: RwLock::new(history),
        }
    }

    /// Copy of what was last saved
    pub async fn snapshot(&self) -> HistoryMap {
        self.document.read().await.clone()
    }
}

#[async_trait]
impl HistoryStorage for InMemoryStorage {
    async fn load(&self) -> Result<HistoryMap> {
        let document = self.document.read().await;
        tracing::debug!("[InMemoryStorage] Loaded {} conversations", document.len());
        Ok(document.clone())
    }

    async fn save(&self, history: &HistoryMap) -> Result<()> {
        let mut document = self.document.write().await;
        *document = history.clone();
        tracing::debug!("[InMemoryStorage] Saved {} conversations", history.len());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
