//! Context7 AI - a terminal research assistant that answers developer
//! questions from the Context7 documentation MCP server.
//!
//! The pieces are usable on their own: an OpenAI-compatible chat client,
//! a stdio MCP client, a JSON-backed conversation history and a small
//! theme registry, tied together by [`agent::Context7Agent`].

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod history;
pub mod storage;
pub mod themes;
pub mod tools;
pub mod utils;

pub use agent::{AgentReply, Context7Agent, FALLBACK_ANSWER};
pub use config::{Settings, SettingsError};
pub use history::{ConversationSummary, HistoryEntry, HistoryManager, Role};
pub use themes::{Theme, ThemeManager};
