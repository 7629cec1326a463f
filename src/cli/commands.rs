use clap::{Parser, Subcommand};

use crate::utils::generate_conversation_id;

pub const DEFAULT_CONVERSATION: &str = "default";

#[derive(Parser)]
#[command(name = "context7")]
#[command(author, version, about = "Documentation-grounded AI assistant for the terminal", long_about = None)]
pub struct Cli {
    /// Color theme (cyberpunk, ocean, forest, sunset)
    #[arg(short, long, global = true)]
    pub theme: Option<String>,

    /// Conversation to continue. One-shot chats without it get an id
    /// derived from the question.
    #[arg(short, long, global = true)]
    pub conversation: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive chat session (default)
    Interactive,

    /// Ask a single question and print the answer
    Chat { prompt: String },

    /// List saved conversations
    History,

    /// List available themes
    Themes,
}

impl Cli {
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Interactive)
    }

    pub fn conversation_id(&self) -> String {
        match (&self.conversation, self.command()) {
            (Some(id), _) => id.clone(),
            (None, Commands::Chat { prompt }) => generate_conversation_id(prompt),
            (None, _) => DEFAULT_CONVERSATION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_interactive() {
        let cli = Cli::try_parse_from(["context7"]).unwrap();
        assert_eq!(cli.command(), &Commands::Interactive);
        assert_eq!(cli.conversation_id(), DEFAULT_CONVERSATION);
        assert!(cli.theme.is_none());
    }

    #[test]
    fn test_chat_with_global_options() {
        let cli = Cli::try_parse_from([
            "context7",
            "chat",
            "how do I use axum?",
            "--theme",
            "forest",
            "-c",
            "web",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            &Commands::Chat {
                prompt: "how do I use axum?".to_string()
            }
        );
        assert_eq!(cli.theme.as_deref(), Some("forest"));
        assert_eq!(cli.conversation_id(), "web");
    }

    #[test]
    fn test_chat_requires_prompt() {
        assert!(Cli::try_parse_from(["context7", "chat"]).is_err());
    }

    #[test]
    fn test_one_shot_chat_derives_conversation_from_prompt() {
        let cli = Cli::try_parse_from(["context7", "chat", "how do I use axum?"]).unwrap();
        let id = cli.conversation_id();
        assert_eq!(id, generate_conversation_id("how do I use axum?"));
        assert_eq!(id.len(), 8);

        let again = Cli::try_parse_from(["context7", "chat", "how do I use axum?"]).unwrap();
        assert_eq!(again.conversation_id(), id);
    }
}
