mod settings;

pub use settings::{
    AgentConfig, HistoryConfig, LLMConfig, LoggingConfig, McpConfig, Settings, SettingsError,
    ToolsConfig, UiConfig, API_KEY_VAR,
};
