use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Variable holding the provider key. Also accepted as `CONTEXT7_LLM__API_KEY`.
pub const API_KEY_VAR: &str = "CONTEXT7_OPENAI_API_KEY";

const ENV_PREFIX: &str = "CONTEXT7";

/// Flat variables from the original `.env` layout, mapped onto nested keys.
const LEGACY_OVERRIDES: &[(&str, &str)] = &[
    (API_KEY_VAR, "llm.api_key"),
    ("CONTEXT7_OPENAI_BASE_URL", "llm.base_url"),
    ("CONTEXT7_OPENAI_MODEL", "llm.model"),
    ("CONTEXT7_HISTORY_PATH", "history.path"),
    ("CONTEXT7_MAX_HISTORY", "history.max_history"),
];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{0} environment variable not set")]
    MissingApiKey(&'static str),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub mcp: McpConfig,
    pub history: HistoryConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub max_history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub max_observation_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub theme: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// Load settings from `config/{CONFIG_ENV}.toml` (optional) and the process environment.
    pub fn new() -> Result<Self, SettingsError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());
        let vars: HashMap<String, String> = env::vars().collect();

        Self::from_sources(Some(PathBuf::from(format!("config/{}", config_env))), vars)
    }

    /// Layer defaults, an optional config file and the given variables.
    ///
    /// `vars` stands in for the process environment so callers (and tests)
    /// can control exactly which overrides apply.
    pub fn from_sources(
        config_file: Option<PathBuf>,
        vars: HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("llm.base_url", "https://api.openai.com/v1")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.max_tokens", 2000)?
            .set_default("llm.temperature", 0.3)?
            .set_default("mcp.command", "npx")?
            .set_default("mcp.args", vec!["-y", "@upstash/context7-mcp@latest"])?
            .set_default("history.path", "data/history.json")?
            .set_default("history.max_history", 50)?
            .set_default("agent.max_iterations", 5)?
            .set_default("agent.max_observation_chars", 12_000)?
            .set_default("tools.timeout_secs", 60)?
            .set_default("tools.max_retries", 2)?
            .set_default("ui.theme", "cyberpunk")?
            .set_default("logging.level", "warn")?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(Some(vars.clone())),
        );

        for (var, key) in LEGACY_OVERRIDES {
            builder = builder.set_override_option(*key, vars.get(*var).cloned())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn api_key(&self) -> Result<String, SettingsError> {
        self.llm
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or(SettingsError::MissingApiKey(API_KEY_VAR))
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.history.max_history == 0 {
            return Err(SettingsError::Invalid {
                key: "history.max_history",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.agent.max_iterations == 0 {
            return Err(SettingsError::Invalid {
                key: "agent.max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.mcp.command.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "mcp.command",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
