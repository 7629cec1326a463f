use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(\w+)?\n(.*?)\n```").expect("code block pattern is valid")
});

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("filename pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

/// Fenced code blocks in order of appearance. Unlabeled fences are `text`.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    CODE_BLOCK
        .captures_iter(text)
        .map(|caps| CodeBlock {
            language: caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "text".to_string()),
            code: caps[2].trim().to_string(),
        })
        .collect()
}

pub fn sanitize_filename(filename: &str) -> String {
    UNSAFE_FILENAME_CHARS
        .replace_all(filename, "")
        .trim()
        .to_string()
}

/// Stable 8-character id derived from the opening question.
pub fn generate_conversation_id(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    hex::encode(digest)[..8].to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub title: Option<String>,
    pub source: Option<String>,
    pub score: f64,
    pub snippet: String,
}

pub fn format_search_result(result: &SearchResult) -> String {
    let snippet: String = result.snippet.chars().take(200).collect();
    format!(
        "📄 **{}**\nSource: {} | Relevance: {:.2}\n{}...",
        result.title.as_deref().unwrap_or("Untitled"),
        result.source.as_deref().unwrap_or("Unknown"),
        result.score,
        snippet
    )
}

/// Fraction of query words found inside some word of `text`, case-insensitive.
pub fn fuzzy_match(query: &str, text: &str) -> f64 {
    let query_words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let text_words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();

    let matches = query_words
        .iter()
        .filter(|qw| text_words.iter().any(|tw| tw.contains(qw.as_str())))
        .count();
    matches as f64 / query_words.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_code_blocks() {
        let text = "Intro\n```rust\nfn main() {}\n```\nthen\n```\nplain\n```";
        let blocks = extract_code_blocks(text);
        assert_eq!(
            blocks,
            vec![
                CodeBlock {
                    language: "rust".to_string(),
                    code: "fn main() {}".to_string()
                },
                CodeBlock {
                    language: "text".to_string(),
                    code: "plain".to_string()
                },
            ]
        );
        assert!(extract_code_blocks("no code here").is_empty());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("  my/file: v2?.json "), "myfile v2json");
        assert_eq!(sanitize_filename("report-2024_final"), "report-2024_final");
    }

    #[test]
    fn test_conversation_id_is_stable() {
        let a = generate_conversation_id("How do I use tokio?");
        let b = generate_conversation_id("How do I use tokio?");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, generate_conversation_id("something else"));
    }

    #[test]
    fn test_format_search_result_defaults() {
        let result: SearchResult =
            serde_json::from_str(r#"{"snippet": "Spawns a task", "score": 0.876}"#).unwrap();
        let formatted = format_search_result(&result);
        assert!(formatted.starts_with("📄 **Untitled**"));
        assert!(formatted.contains("Source: Unknown | Relevance: 0.88"));
        assert!(formatted.ends_with("Spawns a task..."));
    }

    #[test]
    fn test_fuzzy_match() {
        assert_eq!(fuzzy_match("tokio spawn", "How to Spawn tasks in Tokio"), 1.0);
        assert_eq!(fuzzy_match("tokio axum", "tokio runtime"), 0.5);
        assert_eq!(fuzzy_match("", "anything"), 0.0);
    }
}
