/// Returned verbatim whenever retrieval produced nothing to ground an answer on.
pub const FALLBACK_ANSWER: &str =
    "I could not find any relevant information in the Context7 knowledge base to answer your question.";

const SYSTEM_PROMPT: &str = "\
You are Context7, a research assistant for software developers.

You answer questions only with information retrieved through the tools below, which \
query an up-to-date documentation knowledge base. Your own pre-trained knowledge is \
considered stale and must not be used for technical facts.

Rules:
1. Unless the user is only greeting you or chatting, call a tool before answering. \
Libraries usually have to be resolved to an id before their documentation can be fetched.
2. Build the final answer only from tool observations. Do not add facts that are not in them.
3. If the tools return nothing relevant, answer with exactly this sentence: \"{fallback}\"

Format final answers as readable markdown and put code in fenced code blocks.";

const DECISION_FORMAT: &str = "\
Respond with a single JSON object and nothing else:
{
  \"thought\": \"what you are going to do and why\",
  \"action\": {\"tool\": \"tool_name\", \"input\": {\"param\": \"value\"}},
  \"is_final\": false,
  \"final_answer\": null
}

When you can answer, set \"action\" to null, \"is_final\" to true and put the markdown answer \
in \"final_answer\".";

/// System message for one turn, listing the tools the model may call.
pub fn build_system_prompt(tools_description: &str) -> String {
    format!(
        "{}\n\nAvailable tools:\n{}\n\n{}",
        SYSTEM_PROMPT.replace("{fallback}", FALLBACK_ANSWER),
        tools_description,
        DECISION_FORMAT
    )
}

/// Feed a tool result back to the model.
pub fn observation_prompt(tool: &str, observation: &str) -> String {
    format!(
        "Observation from `{}`:\n{}\n\n\
         If this observation answers the question, set is_final=true and write final_answer \
         using only this material. Otherwise choose the next tool call.",
        tool, observation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_contains_tools_and_fallback() {
        let prompt = build_system_prompt("Tool: get-library-docs");
        assert!(prompt.contains("Tool: get-library-docs"));
        assert!(prompt.contains(FALLBACK_ANSWER));
        assert!(prompt.contains("\"final_answer\""));
        assert!(!prompt.contains("{fallback}"));
    }
}
