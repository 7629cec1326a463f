//! JSON File History Storage
//!
//! Information Hiding:
//! - File path and JSON layout hidden from users
//! - Parent directory creation and atomic replacement hidden behind interface

use super::HistoryStorage;
use crate::history::HistoryMap;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// All conversations in one pretty-printed JSON object keyed by conversation id.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl HistoryStorage for JsonFileStorage {
    async fn load(&self) -> Result<HistoryMap> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            tracing::debug!("[JsonFileStorage] {:?} does not exist yet", self.path);
            return Ok(HistoryMap::new());
        }

        let json = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read history file: {:?}", self.path))?;

        if json.trim().is_empty() {
            return Ok(HistoryMap::new());
        }

        let history: HistoryMap =
            serde_json::from_str(&json).context("Failed to deserialize conversation history")?;

        tracing::debug!(
            "[JsonFileStorage] Loaded {} conversations from {:?}",
            history.len(),
            self.path
        );
        Ok(history)
    }

    async fn save(&self, history: &HistoryMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create history directory")?;
        }

        let json = serde_json::to_string_pretty(history)
            .context("Failed to serialize conversation history")?;

        let temp = self.temp_path();
        fs::write(&temp, json)
            .await
            .with_context(|| format!("Failed to write history file: {:?}", temp))?;
        fs::rename(&temp, &self.path)
            .await
            .with_context(|| format!("Failed to replace history file: {:?}", self.path))?;

        tracing::debug!(
            "[JsonFileStorage] Saved {} conversations to {:?}",
            history.len(),
            self.path
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
