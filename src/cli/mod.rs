mod commands;
mod repl;
mod slash;

pub use commands::{Cli, Commands};
pub use repl::{print_reply, Context7Cli};
pub use slash::{SlashCommand, HELP};
