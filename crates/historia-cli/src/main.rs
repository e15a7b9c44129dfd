//! historia: chat-historia terminal client
//!
//! Main entry point for the interactive chat client.
//!
//! Usage:
//!   historia                  - Start the chat (asks for a user name)
//!   historia --user <name>    - Log in directly
//!   historia --help           - Show help

mod cli;

use historia_core::{Config, HttpChatService, Llm, SessionController};
use tracing_subscriber::EnvFilter;

use crate::cli::CliOptions;

/// Run mode
#[derive(Debug, PartialEq)]
enum RunMode {
    /// Interactive chat
    Chat(Args),
    /// Show help
    Help,
    /// Show version
    Version,
}

/// Command line overrides
#[derive(Debug, Default, PartialEq)]
struct Args {
    user: Option<String>,
    llm: Option<Llm>,
    config_path: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    let args = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("historia {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Chat(args) => args,
    };

    // Logs go to stderr and stay quiet by default so they do not
    // interleave with the conversation
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let mut config = match &args.config_path {
        Some(path) => Config::from_toml_file(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    if let Some(llm) = args.llm {
        config.chat.llm = llm;
    }
    if let Some(user) = args.user {
        config.chat.user = Some(user);
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Chat service: {}", config.api.url);
    tracing::info!("Model: {}", config.chat.llm);

    let service = HttpChatService::new(&config.api)
        .map_err(|e| anyhow::anyhow!("Failed to create chat client: {}", e))?;
    let controller = SessionController::new(service);

    cli::run_cli(
        controller,
        CliOptions {
            llm: config.chat.llm,
            user: config.chat.user,
        },
    )
    .await
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<RunMode> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--user" | "-u" => {
                parsed.user = Some(next_value(&mut args, &arg)?);
            }
            "--llm" | "-m" => {
                let value = next_value(&mut args, &arg)?;
                parsed.llm = Some(value.parse().map_err(|e| anyhow::anyhow!("{}", e))?);
            }
            "--config" | "-c" => {
                parsed.config_path = Some(next_value(&mut args, &arg)?);
            }
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(RunMode::Chat(parsed))
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .ok_or_else(|| anyhow::anyhow!("Missing value for {}", flag))
}

/// Print help message
fn print_help() {
    println!("historia - chat-historia terminal client");
    println!();
    println!("Usage:");
    println!("  historia                      Start the chat (asks for a user name)");
    println!("  historia --user <name>        Log in as <name> right away");
    println!("  historia --llm <model>        Model for the session: OpenAI or DeepSeek");
    println!("  historia --config <path>      Read configuration from <path>");
    println!("  historia --help               Show this help message");
    println!("  historia --version            Show version");
    println!();
    println!("Environment Variables:");
    println!("  HISTORIA_API_URL          Chat service base URL (required)");
    println!("  HISTORIA_API_KEY          API key sent as x-api-key (required)");
    println!("  HISTORIA_LLM              Default model (default: OpenAI)");
    println!("  HISTORIA_TIMEOUT_SECS     Request timeout in seconds (default: 30)");
    println!("  HISTORIA_USER             User name to log in with");
    println!("  HISTORIA_CONFIG           Path to a historia.toml file");
    println!("  RUST_LOG                  Log filter (default: warn)");
}
