use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use super::slash::{SlashCommand, HELP};
use crate::agent::{AgentReply, Context7Agent};
use crate::themes::{Slot, ThemeManager};
use crate::utils;

const HISTORY_ROWS: usize = 10;

/// "Thinking" indicator drawn on the current line until dropped.
struct Spinner {
    handle: JoinHandle<()>,
}

impl Spinner {
    fn start(label: String) -> Self {
        let handle = tokio::spawn(async move {
            let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
            let mut ticker = interval(Duration::from_millis(80));
            let mut stdout = std::io::stdout();
            for frame in frames.iter().cycle() {
                ticker.tick().await;
                print!("\r{} {}", frame, label);
                let _ = stdout.flush();
            }
        });
        Self { handle }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.handle.abort();
        print!("\r\x1B[2K");
        let _ = std::io::stdout().flush();
    }
}

/// Interactive chat session: reads lines, dispatches slash commands,
/// and prints the agent's answers in the current theme.
pub struct Context7Cli {
    agent: Context7Agent,
    themes: ThemeManager,
    conversation_id: String,
    running: bool,
}

impl Context7Cli {
    pub fn new(agent: Context7Agent, themes: ThemeManager, conversation_id: String) -> Self {
        Self {
            agent,
            themes,
            conversation_id,
            running: true,
        }
    }

    pub fn agent(&self) -> &Context7Agent {
        &self.agent
    }

    pub fn themes(&self) -> &ThemeManager {
        &self.themes
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Load history and show the banner.
    pub async fn initialize(&mut self) {
        self.agent.initialize().await;
        self.themes.current().print_banner();
    }

    pub async fn run_stdin(&mut self) -> Result<()> {
        let reader = tokio::io::BufReader::new(tokio::io::stdin());
        self.run(reader).await
    }

    /// Chat until `/exit` or end of input.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> Result<()> {
        self.themes
            .current()
            .print_typing_effect("Context7 AI is ready! Type your questions below.", 400)
            .await;
        utils::print_dim("Commands: /theme, /history, /clear, /help, /exit\n");

        let mut lines = reader.lines();

        while self.running {
            utils::print_prompt(self.themes.current(), "You: ");

            let Some(line) = lines.next_line().await? else {
                println!();
                utils::print_warning("Shutting down gracefully...");
                self.running = false;
                break;
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match SlashCommand::parse(input) {
                Some(command) => self.handle_command(command).await,
                None => self.process_message(input).await,
            }
        }

        Ok(())
    }

    pub async fn handle_command(&mut self, command: SlashCommand) {
        let theme = self.themes.current();

        match command {
            SlashCommand::Exit => {
                self.running = false;
                utils::print_warning("Goodbye! 👋");
            }
            SlashCommand::Clear => match self.agent.clear_history(Some(&self.conversation_id)).await {
                Ok(()) => utils::print_success(&format!(
                    "History for conversation '{}' cleared.",
                    self.conversation_id
                )),
                Err(e) => utils::print_error(&format!("Could not clear history: {:#}", e)),
            },
            SlashCommand::History => self.print_history(),
            SlashCommand::Theme(None) => {
                let names = self.themes.list_themes().join(", ");
                utils::print_info(theme, &format!("Available themes: {}", names));
                utils::print_dim(&format!("Current: {}", theme.name));
            }
            SlashCommand::Theme(Some(name)) => {
                if self.themes.set_theme(&name) {
                    self.themes.current().print_banner();
                } else if let Some(close) = self.themes.suggest(&name) {
                    utils::print_error(&format!("Unknown theme '{}'. Did you mean '{}'?", name, close));
                } else {
                    utils::print_error(&format!(
                        "Unknown theme '{}'. Try one of: {}",
                        name,
                        self.themes.list_themes().join(", ")
                    ));
                }
            }
            SlashCommand::Help => {
                for (usage, description) in HELP {
                    println!(
                        "  {} {}",
                        theme.paint(Slot::Accent, &format!("{:<14}", usage)),
                        description
                    );
                }
            }
            SlashCommand::Unknown(name) => {
                utils::print_error(&format!("Unknown command: {}", name));
            }
        }
    }

    fn print_history(&self) {
        let conversations = self.agent.get_conversations();
        if conversations.is_empty() {
            utils::print_warning("No conversation history");
            return;
        }

        let rows: Vec<Vec<String>> = conversations
            .into_iter()
            .take(HISTORY_ROWS)
            .map(|c| vec![c.id, c.last_message, c.message_count.to_string()])
            .collect();

        utils::print_header(self.themes.current(), "Conversation History");
        println!(
            "{}",
            utils::render_table(&["ID", "Last Message", "Count"], &rows)
        );
    }

    pub async fn process_message(&mut self, message: &str) {
        let theme = self.themes.current();
        println!();

        let reply = {
            let _spinner = Spinner::start("Assistant is thinking...".to_string());
            self.agent.chat(message, &self.conversation_id).await
        };

        println!("{}", theme.paint(Slot::Accent, "Assistant:"));
        print_reply(&reply, self.themes.current());
        println!();
    }
}

/// Render a reply: markdown for answers, a red panel for errors.
pub fn print_reply(reply: &AgentReply, theme: &crate::themes::Theme) {
    match reply {
        AgentReply::Complete { data, .. } => {
            println!("{}", utils::render_markdown(data, theme));
        }
        AgentReply::Error { data, .. } => {
            utils::print_error_panel("Error", &format!("Agent Error:\n\n{}", data));
        }
    }
}
