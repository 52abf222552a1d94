use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use support_brain_core::{
    ChatClient, Config, ConversationHandle, Rejection, RequestCoordinator, Resolution,
};

mod app;
mod handler;
mod logging;
mod markdown;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "support-brain")]
#[command(about = "Ask the Support Brain about errors and technical manuals")]
#[command(version)]
struct Cli {
    /// Answer service base address (overrides config and SUPPORT_BRAIN_ENDPOINT)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,
    /// Request timeout in seconds; by default a request waits indefinitely
    #[arg(short, long, global = true)]
    timeout: Option<u64>,
    /// Log file location
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer with its sources
    Ask {
        /// Your question
        question: String,
    },
    /// Check whether the answer service is up
    Health,
    /// Show the resolved configuration
    Config {
        /// Write the resolved settings to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file.clone() {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    logging::init(&log_path)?;

    let config = resolve_config(&cli)?;
    tracing::info!(endpoint = %config.endpoint, timeout_secs = ?config.timeout_secs, "starting");
    let client = ChatClient::from_config(&config);

    match cli.command {
        None => run_tui(client).await,
        Some(Commands::Ask { question }) => ask_once(client, &question).await,
        Some(Commands::Health) => check_health(&client).await,
        Some(Commands::Config { save }) => show_config(&config, save),
    }
}

/// CLI flag > environment > config file > defaults
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?.with_env();
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = Some(timeout);
    }
    Ok(config)
}

async fn run_tui(client: ChatClient) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(client);
    app.start_health_check();
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        app.sync_with_conversation();
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

/// Print the answer (or the fallback) with its sources. A failed request is an
/// error once the fallback is printed, so the process exits non-zero.
async fn ask_once(client: ChatClient, question: &str) -> Result<()> {
    let endpoint = client.base_url().to_string();
    let coordinator = RequestCoordinator::new(Arc::new(client), ConversationHandle::default());

    let resolution = match coordinator.submit(question).await {
        Ok(resolution) => resolution,
        Err(Rejection::EmptyInput) => bail!("question must not be empty"),
        Err(Rejection::AlreadyPending) => bail!("a request is already pending"),
    };

    let Some(answer) = coordinator.conversation().read(|conv| conv.last().cloned()) else {
        bail!("conversation is empty");
    };
    println!("{}", answer.content());

    if answer.has_sources() {
        println!("\nSources Used:");
        for source in answer.sources() {
            println!("  • {}", source.label());
        }
    }

    if resolution == Resolution::Failed {
        bail!("request to {endpoint} failed; details are in the log");
    }
    Ok(())
}

async fn check_health(client: &ChatClient) -> Result<()> {
    match client.health().await {
        Ok(status) if status.is_ok() => {
            println!("{} at {} is up", status.service, client.base_url());
            Ok(())
        }
        Ok(status) => bail!("{} reported status {:?}", client.base_url(), status.status),
        Err(err) => bail!("{} is unreachable: {}", client.base_url(), err),
    }
}

fn show_config(config: &Config, save: bool) -> Result<()> {
    let path = Config::get_config_path()?;
    println!("config file: {}", path.display());
    println!("endpoint:    {}", config.endpoint);
    match config.timeout_secs {
        Some(secs) => println!("timeout:     {secs}s"),
        None => println!("timeout:     none"),
    }

    if save {
        config.save_to(&path)?;
        println!("saved");
    }
    Ok(())
}
