use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the model wants to do next
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentDecision {
    #[serde(default)]
    pub thought: String,
    #[serde(default)]
    pub action: Option<AgentAction>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub final_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentAction {
    pub tool: String,
    #[serde(default = "empty_input")]
    pub input: Value,
}

fn empty_input() -> Value {
    Value::Object(Default::default())
}

impl AgentDecision {
    fn direct(answer: &str) -> Self {
        Self {
            thought: String::new(),
            action: None,
            is_final: true,
            final_answer: Some(answer.to_string()),
        }
    }
}

const DECISION_KEYS: [&str; 4] = ["thought", "action", "is_final", "final_answer"];

/// Parse a model reply into a decision.
///
/// Accepts bare JSON, JSON wrapped in prose or a code fence, and falls back
/// to treating the whole reply as a direct final answer. JSON that carries
/// none of the decision keys is content, not a decision.
pub fn parse_decision(response: &str) -> AgentDecision {
    let trimmed = response.trim();

    if let Some(decision) = decision_from_json(trimmed) {
        return decision;
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Some(decision) = decision_from_json(&trimmed[start..=end]) {
                return decision;
            }
        }
    }

    tracing::debug!("Model reply is not a decision object; using it as the answer");
    AgentDecision::direct(trimmed)
}

fn decision_from_json(text: &str) -> Option<AgentDecision> {
    let value: Value = serde_json::from_str(text).ok()?;
    let is_decision = value
        .as_object()
        .map_or(false, |object| DECISION_KEYS.iter().any(|key| object.contains_key(*key)));
    if !is_decision {
        return None;
    }
    serde_json::from_value(value).ok()
}
