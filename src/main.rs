use anyhow::Result;
use clap::Parser;
use context7::cli::{print_reply, Cli, Commands, Context7Cli};
use context7::storage::JsonFileStorage;
use context7::{utils, Context7Agent, HistoryManager, Settings, ThemeManager};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::new()?;
    init_tracing(&settings.logging.level);

    let themes = ThemeManager::new(cli.theme.as_deref().unwrap_or(&settings.ui.theme));

    let conversation_id = cli.conversation_id();

    let result = match cli.command() {
        Commands::Interactive => handle_interactive(&settings, themes, conversation_id).await,
        Commands::Chat { prompt } => handle_chat(&settings, &themes, prompt, &conversation_id).await,
        Commands::History => handle_history(&settings, &themes).await,
        Commands::Themes => {
            handle_themes(&themes);
            Ok(())
        }
    };

    if let Err(e) = result {
        utils::print_error(&format!("A fatal application error occurred: {:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr so they never interleave with the chat on stdout.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect(settings: &Settings, themes: &ThemeManager) -> Result<Context7Agent> {
    utils::print_info(themes.current(), "Starting the Context7 MCP server...");
    Context7Agent::connect(settings).await
}

async fn handle_interactive(
    settings: &Settings,
    themes: ThemeManager,
    conversation_id: String,
) -> Result<()> {
    let agent = connect(settings, &themes).await?;
    let mut cli = Context7Cli::new(agent, themes, conversation_id);
    cli.initialize().await;
    cli.run_stdin().await
}

async fn handle_chat(
    settings: &Settings,
    themes: &ThemeManager,
    prompt: &str,
    conversation_id: &str,
) -> Result<()> {
    let mut agent = connect(settings, themes).await?;
    agent.initialize().await;

    let reply = agent.chat(prompt, conversation_id).await;
    print_reply(&reply, themes.current());

    if reply.is_error() {
        anyhow::bail!("the question could not be answered");
    }
    Ok(())
}

async fn handle_history(settings: &Settings, themes: &ThemeManager) -> Result<()> {
    let storage = Arc::new(JsonFileStorage::new(settings.history.path.clone()));
    let mut history = HistoryManager::new(storage, settings.history.max_history);
    history.load().await;

    let conversations = history.get_conversations();
    if conversations.is_empty() {
        utils::print_warning("No conversation history");
        return Ok(());
    }

    utils::print_header(
        themes.current(),
        &format!("Conversations in {}", history.storage_description()),
    );
    let rows: Vec<Vec<String>> = conversations
        .into_iter()
        .map(|c| vec![c.id, c.last_message, c.message_count.to_string()])
        .collect();
    println!("{}", utils::render_table(&["ID", "Last Message", "Count"], &rows));
    Ok(())
}

fn handle_themes(themes: &ThemeManager) {
    let current = themes.current().name;
    for name in themes.list_themes() {
        let theme = context7::Theme::named(name);
        let marker = if name == current { "*" } else { " " };
        println!(
            "{} {}",
            marker,
            theme.paint(context7::themes::Slot::Primary, name)
        );
    }
}
