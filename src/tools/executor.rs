//! Tool Executor with Timeout and Retry Logic
//!
//! Information Hiding:
//! - Retry strategy implementation hidden
//! - Backoff algorithm hidden
//! - Error classification logic hidden

use super::{Tool, ToolConfig, ToolResult};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};

/// Tool executor with retry and timeout support
pub struct ToolExecutor {
    config: ToolConfig,
    base_backoff_ms: u64,
}

impl ToolExecutor {
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            base_backoff_ms: 250,
        }
    }

    /// Shorten the backoff between attempts.
    pub fn with_base_backoff(mut self, base_backoff_ms: u64) -> Self {
        self.base_backoff_ms = base_backoff_ms;
        self
    }

    /// Validate once, then run the tool until it succeeds, fails with a
    /// non-retryable error, or the attempts are used up.
    ///
    /// Failures are reported as a failed `ToolResult`, never as `Err`.
    pub async fn execute(&self, tool: Arc<dyn Tool>, args: Value) -> Result<ToolResult> {
        let tool_name = tool.metadata().name;

        if let Err(e) = tool.validate(&args) {
            tracing::warn!("Rejected arguments for tool '{}': {}", tool_name, e);
            return Ok(ToolResult::failure(e.to_string()));
        }

        let attempts = self.config.max_retries.max(1);
        let limit = Duration::from_secs(self.config.timeout_secs);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tracing::warn!(
                    "Retrying tool '{}' (attempt {}/{})",
                    tool_name,
                    attempt + 1,
                    attempts
                );
                sleep(Duration::from_millis(self.calculate_backoff(attempt))).await;
            }

            match timeout(limit, tool.execute(args.clone())).await {
                Ok(Ok(result)) => {
                    if result.success || !self.should_retry(&result) {
                        return Ok(result);
                    }
                    last_error = result.error;
                }
                Ok(Err(e)) => {
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    last_error = Some(format!(
                        "timeout after {} seconds",
                        self.config.timeout_secs
                    ));
                }
            }
        }

        Ok(ToolResult::failure(format!(
            "Tool '{}' failed after {} attempts. Last error: {}",
            tool_name,
            attempts,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    fn calculate_backoff(&self, attempt: u32) -> u64 {
        let max_delay = 5000;
        2_u64
            .checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.base_backoff_ms.checked_mul(factor))
            .map_or(max_delay, |delay| delay.min(max_delay))
    }

    fn should_retry(&self, result: &ToolResult) -> bool {
        if let Some(ref error) = result.error {
            let error_lower = error.to_lowercase();

            // The server answered; asking again will not change its mind.
            if error_lower.contains("validation")
                || error_lower.contains("not found")
                || error_lower.contains("invalid")
                || error_lower.contains("reported an error")
            {
                return false;
            }
        }

        true
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(ToolConfig::default())
    }
}
