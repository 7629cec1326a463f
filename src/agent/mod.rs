//! Context7 Agent - retrieval-grounded answers over the MCP documentation tools
//!
//! Information Hiding:
//! - Decision loop and prompt layout hidden behind `chat`
//! - Model and tools reached only through `ChatModel` and `Tool`
//! - History replay and persistence handled internally

mod decision;
mod prompt;

pub use decision::{parse_decision, AgentAction, AgentDecision};
pub use prompt::{build_system_prompt, observation_prompt, FALLBACK_ANSWER};

use crate::config::Settings;
use crate::core::llm::{ChatMessage, ChatModel, LLMClient};
use crate::core::mcp::discover_mcp_tools;
use crate::history::{ConversationSummary, HistoryManager, Role};
use crate::storage::{HistoryStorage, JsonFileStorage};
use crate::tools::{executor::ToolExecutor, registry::ToolRegistry, ToolConfig};
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of one chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentReply {
    Complete {
        data: String,
        timestamp: NaiveDateTime,
    },
    Error {
        data: String,
        timestamp: NaiveDateTime,
    },
}

impl AgentReply {
    fn complete(data: String) -> Self {
        AgentReply::Complete {
            data,
            timestamp: Local::now().naive_local(),
        }
    }

    fn error(data: String) -> Self {
        AgentReply::Error {
            data,
            timestamp: Local::now().naive_local(),
        }
    }

    pub fn data(&self) -> &str {
        match self {
            AgentReply::Complete { data, .. } | AgentReply::Error { data, .. } => data,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentReply::Error { .. })
    }
}

/// How a turn ended, kept for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grounding {
    Direct,
    Retrieved,
    Fallback,
}

pub struct Context7Agent {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    executor: ToolExecutor,
    history: HistoryManager,
    max_iterations: usize,
    max_observation_chars: usize,
}

impl Context7Agent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        executor: ToolExecutor,
        history: HistoryManager,
    ) -> Self {
        Self {
            model,
            tools,
            executor,
            history,
            max_iterations: 5,
            max_observation_chars: 12_000,
        }
    }

    pub fn with_limits(mut self, max_iterations: usize, max_observation_chars: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self.max_observation_chars = max_observation_chars.max(1);
        self
    }

    /// Wire the agent to the configured provider, MCP server and history file.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let api_key = settings.api_key()?;
        let model = Arc::new(LLMClient::new(api_key, settings));

        let tools = discover_mcp_tools(&settings.mcp.command, &settings.mcp.args).await?;
        if tools.is_empty() {
            tracing::warn!("MCP server advertised no tools; every question will fall back");
        }

        let storage: Arc<dyn HistoryStorage> =
            Arc::new(JsonFileStorage::new(settings.history.path.clone()));

        Ok(Self::new(
            model,
            ToolRegistry::from_tools(tools),
            ToolExecutor::new(ToolConfig::from(&settings.tools)),
            HistoryManager::new(storage, settings.history.max_history),
        )
        .with_limits(
            settings.agent.max_iterations,
            settings.agent.max_observation_chars,
        ))
    }

    /// Load persisted history. Call once before the first `chat`.
    pub async fn initialize(&mut self) {
        self.history.load().await;
        tracing::info!(
            "Context7Agent initialized with tools: {}",
            self.tools.tool_names().join(", ")
        );
    }

    /// Answer one user message in the given conversation.
    ///
    /// Successful turns are appended to the history; failed turns leave it untouched.
    pub async fn chat(&mut self, message: &str, conversation_id: &str) -> AgentReply {
        match self.answer(message, conversation_id).await {
            Ok((answer, grounding)) => {
                tracing::info!(
                    "[Agent] Conversation '{}' answered ({:?})",
                    conversation_id,
                    grounding
                );
                self.record_turn(conversation_id, message, &answer).await;
                AgentReply::complete(answer)
            }
            Err(e) => {
                tracing::error!("Agent RAG pipeline error: {:#}", e);
                AgentReply::error(format!("{:#}", e))
            }
        }
    }

    async fn record_turn(&mut self, conversation_id: &str, message: &str, answer: &str) {
        for (role, content) in [(Role::User, message), (Role::Assistant, answer)] {
            if let Err(e) = self.history.add_message(conversation_id, role, content).await {
                tracing::warn!("Could not save history: {:#}", e);
            }
        }
    }

    async fn answer(&self, message: &str, conversation_id: &str) -> Result<(String, Grounding)> {
        let mut transcript = Vec::with_capacity(self.history.max_history() + 2);
        transcript.push(ChatMessage::system(build_system_prompt(
            &self.tools.tools_description(),
        )));
        transcript.extend(self.history.get_messages(conversation_id));
        transcript.push(ChatMessage::user(message));

        let mut retrieved = false;

        for round in 0..self.max_iterations {
            tracing::debug!(
                "[Agent] Round {}/{} for '{}'",
                round + 1,
                self.max_iterations,
                conversation_id
            );

            let reply = self.model.chat(transcript.clone()).await?;
            let decision = parse_decision(&reply);

            if !decision.thought.is_empty() {
                tracing::debug!("[Agent] Thought: {}", decision.thought);
            }

            let action = match decision.action.clone() {
                Some(action) if !decision.is_final => action,
                _ => {
                    let answer = decision
                        .final_answer
                        .filter(|a| !a.trim().is_empty())
                        .or_else(|| {
                            (!decision.is_final && !decision.thought.trim().is_empty())
                                .then(|| decision.thought.clone())
                        });
                    let grounding = if retrieved {
                        Grounding::Retrieved
                    } else {
                        Grounding::Direct
                    };
                    return Ok(match answer {
                        Some(answer) => (answer, grounding),
                        None => (FALLBACK_ANSWER.to_string(), Grounding::Fallback),
                    });
                }
            };

            let Some(tool) = self.tools.get(&action.tool) else {
                tracing::warn!("[Agent] Model asked for unknown tool '{}'", action.tool);
                return Ok((FALLBACK_ANSWER.to_string(), Grounding::Fallback));
            };

            tracing::info!("[Agent] Calling tool: {}", action.tool);
            let result = self.executor.execute(tool, action.input.clone()).await?;

            if !result.success {
                tracing::warn!(
                    "[Agent] Tool '{}' failed: {}",
                    action.tool,
                    result.error.as_deref().unwrap_or("unknown error")
                );
                return Ok((FALLBACK_ANSWER.to_string(), Grounding::Fallback));
            }
            if result.is_empty() {
                tracing::info!("[Agent] Tool '{}' returned nothing", action.tool);
                return Ok((FALLBACK_ANSWER.to_string(), Grounding::Fallback));
            }

            retrieved = true;
            let observation = truncate_chars(&result.output, self.max_observation_chars);

            transcript.push(ChatMessage::assistant(
                serde_json::to_string(&AgentDecision {
                    thought: decision.thought,
                    action: Some(action.clone()),
                    is_final: false,
                    final_answer: None,
                })
                .unwrap_or_else(|_| format!("Action: {}", action.tool)),
            ));
            transcript.push(ChatMessage::user(observation_prompt(
                &action.tool,
                observation,
            )));
        }

        tracing::warn!(
            "[Agent] No answer after {} rounds for '{}'",
            self.max_iterations,
            conversation_id
        );
        Ok((FALLBACK_ANSWER.to_string(), Grounding::Fallback))
    }

    pub fn get_conversations(&self) -> Vec<ConversationSummary> {
        self.history.get_conversations()
    }

    /// Clear one conversation, or all of them with `None`.
    pub async fn clear_history(&mut self, conversation_id: Option<&str>) -> Result<()> {
        self.history.clear(conversation_id).await
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.tool_names()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::tools::{Tool, ToolMetadata, ToolResult};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn transcripts(&self) -> Vec<Vec<ChatMessage>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
            self.seen.lock().unwrap().push(messages);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
        }
    }

    struct DocsTool {
        output: &'static str,
    }

    #[async_trait]
    impl Tool for DocsTool {
        fn metadata(&self) -> ToolMetadata {
            ToolMetadata {
                name: "get-library-docs".to_string(),
                description: "Fetch documentation".to_string(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _args: Value) -> Result<ToolResult> {
            Ok(ToolResult::success(self.output))
        }
    }

    fn tool_call() -> Result<String> {
        Ok(r#"{"thought": "need docs", "action": {"tool": "get-library-docs", "input": {"topic": "spawn"}}, "is_final": false, "final_answer": null}"#.to_string())
    }

    fn final_answer(text: &str) -> Result<String> {
        Ok(serde_json::json!({
            "thought": "done",
            "action": null,
            "is_final": true,
            "final_answer": text
        })
        .to_string())
    }

    /// Documentation backend that is down.
    struct BrokenDocsTool;

    #[async_trait]
    impl Tool for BrokenDocsTool {
        fn metadata(&self) -> ToolMetadata {
            ToolMetadata {
                name: "get-library-docs".to_string(),
                description: "Fetch documentation".to_string(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _args: Value) -> Result<ToolResult> {
            Ok(ToolResult::failure("upstream returned 502"))
        }
    }

    fn agent(model: Arc<ScriptedModel>, docs: &'static str) -> (Context7Agent, Arc<InMemoryStorage>) {
        agent_with_tool(model, Arc::new(DocsTool { output: docs }))
    }

    fn agent_with_tool(
        model: Arc<ScriptedModel>,
        tool: Arc<dyn Tool>,
    ) -> (Context7Agent, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        let tools = ToolRegistry::from_tools(vec![tool]);
        let agent = Context7Agent::new(
            model,
            tools,
            ToolExecutor::new(ToolConfig {
                timeout_secs: 5,
                max_retries: 1,
            }),
            HistoryManager::new(storage.clone(), 20),
        )
        .with_limits(3, 12_000);
        (agent, storage)
    }

    #[tokio::test]
    async fn test_greeting_answers_without_tool() {
        let model = ScriptedModel::new(vec![final_answer("Hello! Ask me about a library.")]);
        let (mut agent, storage) = agent(model.clone(), "unused");
        agent.initialize().await;

        let reply = agent.chat("hi", "default").await;
        assert_eq!(reply.data(), "Hello! Ask me about a library.");
        assert!(!reply.is_error());

        let saved = storage.snapshot().await;
        assert_eq!(saved["default"].len(), 2);
        assert_eq!(saved["default"][0].role, Role::User);
        assert_eq!(saved["default"][1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_tool_observation_is_fed_back() {
        let model = ScriptedModel::new(vec![tool_call(), final_answer("Use `tokio::spawn`.")]);
        let (mut agent, _) = agent(model.clone(), "tokio::spawn runs a future on the runtime");

        let reply = agent.chat("How do I spawn a task?", "default").await;
        assert_eq!(reply.data(), "Use `tokio::spawn`.");

        let transcripts = model.transcripts();
        assert_eq!(transcripts.len(), 2);
        let second = &transcripts[1];
        assert_eq!(second[0].role, "system");
        assert_eq!(second[1], ChatMessage::user("How do I spawn a task?"));
        assert!(second[3]
            .content
            .contains("tokio::spawn runs a future on the runtime"));
    }

    #[tokio::test]
    async fn test_empty_retrieval_falls_back() {
        let model = ScriptedModel::new(vec![tool_call(), final_answer("made up")]);
        let (mut agent, _) = agent(model.clone(), "   \n");

        let reply = agent.chat("What is foo?", "default").await;
        assert_eq!(reply.data(), FALLBACK_ANSWER);
        // the model is not asked to synthesize from nothing
        assert_eq!(model.transcripts().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_falls_back() {
        let model = ScriptedModel::new(vec![Ok(
            r#"{"thought": "x", "action": {"tool": "web-search", "input": {}}, "is_final": false}"#
                .to_string(),
        )]);
        let (mut agent, _) = agent(model, "docs");

        let reply = agent.chat("What is foo?", "default").await;
        assert_eq!(reply.data(), FALLBACK_ANSWER);
        assert!(!reply.is_error());
    }

    #[tokio::test]
    async fn test_round_budget_falls_back() {
        let model = ScriptedModel::new(vec![tool_call(), tool_call(), tool_call()]);
        let (mut agent, _) = agent(model.clone(), "docs");

        let reply = agent.chat("loop forever", "default").await;
        assert_eq!(reply.data(), FALLBACK_ANSWER);
        assert_eq!(model.transcripts().len(), 3);
    }

    #[tokio::test]
    async fn test_model_failure_is_error_and_not_recorded() {
        let model = ScriptedModel::new(vec![Err(anyhow::anyhow!("API error 500"))]);
        let (mut agent, storage) = agent(model, "docs");

        let reply = agent.chat("hello", "default").await;
        assert!(reply.is_error());
        assert!(reply.data().contains("API error 500"));
        assert!(storage.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_replayed_next_turn() {
        let model = ScriptedModel::new(vec![final_answer("first"), final_answer("second")]);
        let (mut agent, _) = agent(model.clone(), "docs");

        agent.chat("one", "c1").await;
        agent.chat("two", "c1").await;

        let transcripts = model.transcripts();
        let replayed: Vec<&str> = transcripts[1][1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(replayed, vec!["one", "first", "two"]);
        assert_eq!(agent.get_conversations()[0].message_count, 4);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let model = ScriptedModel::new(vec![final_answer("a"), final_answer("b")]);
        let (mut agent, _) = agent(model, "docs");
        agent.chat("one", "c1").await;
        agent.chat("two", "c2").await;

        agent.clear_history(Some("c1")).await.unwrap();
        let ids: Vec<String> = agent.get_conversations().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["c2".to_string()]);

        agent.clear_history(None).await.unwrap();
        assert!(agent.get_conversations().is_empty());
    }

    #[tokio::test]
    async fn test_json_content_reply_is_kept_as_answer() {
        let content = r#"{"name": "my-crate", "version": "0.1.0"}"#;
        let model = ScriptedModel::new(vec![Ok(content.to_string())]);
        let (mut agent, storage) = agent(model, "docs");

        let reply = agent.chat("Show me a minimal package manifest as JSON", "default").await;
        assert_eq!(reply.data(), content);
        assert_eq!(storage.snapshot().await["default"][1].content, content);
    }

    #[tokio::test]
    async fn test_thought_is_answer_when_no_action() {
        let model = ScriptedModel::new(vec![Ok(
            r#"{"thought": "Tokio is an async runtime for Rust.", "action": null, "is_final": false}"#
                .to_string(),
        )]);
        let (mut agent, _) = agent(model.clone(), "docs");

        let reply = agent.chat("What is tokio?", "default").await;
        assert_eq!(reply.data(), "Tokio is an async runtime for Rust.");
        assert_eq!(model.transcripts().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_tool_falls_back() {
        let model = ScriptedModel::new(vec![tool_call(), final_answer("made up")]);
        let (mut agent, storage) = agent_with_tool(model.clone(), Arc::new(BrokenDocsTool));

        let reply = agent.chat("How do I spawn a task?", "default").await;
        assert_eq!(reply.data(), FALLBACK_ANSWER);
        assert!(!reply.is_error());
        assert_eq!(model.transcripts().len(), 1);
        assert_eq!(storage.snapshot().await["default"][1].content, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_long_observation_is_truncated() {
        let model = ScriptedModel::new(vec![tool_call(), final_answer("done")]);
        let (agent, _) = agent(model.clone(), "0123456789abcdefghij");
        let mut agent = agent.with_limits(3, 10);

        agent.chat("How do I spawn a task?", "default").await;

        let transcripts = model.transcripts();
        let observation = &transcripts[1][3].content;
        assert!(observation.contains("0123456789"));
        assert!(!observation.contains("abc"));
    }

    #[test]
    fn test_reply_serializes_like_a_tagged_record() {
        let reply = AgentReply::complete("ok".to_string());
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["data"], "ok");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
