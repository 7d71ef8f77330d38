//! Console CLI - Interactive permission console
//!
//! Usage:
//!   console --api-url http://localhost:7601/api
//!   console --fixture core/tests/fixtures/console.json

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use console_core::api::StaticApi;
use console_core::{Client, ClientConfig};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

mod account;
mod commands;
mod password;
mod ui;

use account::AccountManager;
use commands::CommandHandler;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server API base URL
    #[arg(short = 'u', long, default_value = "http://localhost:7601/api")]
    api_url: String,

    /// Serve a JSON fixture instead of talking to a server
    #[arg(short, long, conflicts_with = "api_url")]
    fixture: Option<PathBuf>,

    /// Account file remembering the last username (history is kept beside it)
    #[arg(short, long, default_value = "console-account.json")]
    account: PathBuf,

    /// Page size for list requests
    #[arg(long, default_value_t = 100)]
    per_page: u32,

    /// Maximum pages fetched for a single list
    #[arg(long, default_value_t = 100)]
    max_pages: u32,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    // Print banner with version
    println!("{}", "=".repeat(60).bright_blue());
    println!("{}", format!("  {}", console_core::version_string()).bright_cyan().bold());
    println!("{}", "  Permission console for federated analysis".bright_white());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    let account = AccountManager::open(args.account.clone())?;

    let offline = args.fixture.is_some();
    let client = match &args.fixture {
        Some(path) => {
            let api = StaticApi::load(path)
                .with_context(|| format!("Failed to load fixture: {}", path.display()))?;
            println!("{} {}", "Fixture:".bright_green(), path.display());
            Client::with_api(Box::new(api))
        }
        None => {
            let config = ClientConfig {
                api_url: args.api_url.clone(),
                per_page: args.per_page,
                max_pages: args.max_pages,
                request_timeout: Duration::from_secs(args.timeout),
            };
            info!("Creating client with config: {:?}", config);
            println!("{} {}", "Server:".bright_green(), config.api_url);
            Client::new(config)?
        }
    };
    if let Some(name) = account.username() {
        println!("{} {}", "Last user:".bright_green(), name);
    }
    println!();

    let history_file = args.account.with_extension("history");
    let mut handler = CommandHandler::new(client, account, offline);

    // Interactive REPL
    let mut rl = DefaultEditor::new()?;
    let _ = rl.load_history(&history_file);

    println!("{}", "Type 'help' for available commands, 'quit' to exit".bright_yellow());
    println!();

    loop {
        let prompt = format!("{}> ", handler.prompt_name().bright_cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                match line {
                    "quit" | "exit" => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    _ => {
                        if let Err(e) = handler.handle_command(line).await {
                            ui::print_error(&format!("{:#}", e));
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            Err(err) => {
                ui::print_error(&format!("Error: {}", err));
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_file);

    Ok(())
}
