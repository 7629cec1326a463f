//! Conversation History Storage
//!
//! Information Hiding:
//! - Where the history document lives hidden behind trait
//! - The whole mapping is read and written at once; there is no per-entry access
//! - Each backend owns its own serialization or in-memory structure

use crate::history::HistoryMap;
use anyhow::Result;
use async_trait::async_trait;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStorage;
pub use memory::InMemoryStorage;

/// Persistence for the complete conversation mapping.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Load every conversation. A store that was never written is empty.
    async fn load(&self) -> Result<HistoryMap>;

    /// Replace the stored document with `history`.
    async fn save(&self, history: &HistoryMap) -> Result<()>;

    /// Short human description used in logs and the CLI
    fn describe(&self) -> String;
}
