/// A `/command` typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// `/theme` alone lists themes, `/theme NAME` switches
    Theme(Option<String>),
    History,
    Clear,
    Help,
    Exit,
    Unknown(String),
}

pub const HELP: &[(&str, &str)] = &[
    ("/theme [name]", "List themes or switch to one"),
    ("/history", "Show saved conversations"),
    ("/clear", "Clear the current conversation"),
    ("/help", "Show this help"),
    ("/exit", "Leave the chat"),
];

impl SlashCommand {
    /// `None` when the input is a chat message rather than a command.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if !input.starts_with('/') {
            return None;
        }

        let mut parts = input.split_whitespace();
        let name = parts.next().unwrap_or("/").to_lowercase();
        let arg = parts.next().map(str::to_string);

        Some(match name.as_str() {
            "/theme" => SlashCommand::Theme(arg),
            "/history" => SlashCommand::History,
            "/clear" => SlashCommand::Clear,
            "/help" => SlashCommand::Help,
            "/exit" | "/quit" => SlashCommand::Exit,
            _ => SlashCommand::Unknown(name),
        })
    }
}
