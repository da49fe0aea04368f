// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Wardrobe Assistant CLI
//!
//! The `wardrobe` binary runs the assistant's HTTP API and doubles as a
//! client for it.
//!
//! ## Commands
//!
//! - `wardrobe serve` - Run the HTTP API
//! - `wardrobe config show|validate|generate` - Configuration management
//! - `wardrobe account register|login|whoami` - Accounts and tokens
//! - `wardrobe chat <MESSAGE>` - Talk to the assistant
//! - `wardrobe sessions list|show|delete` - Conversation history

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use wardrobe_assistant::commands::{self, AccountCommand, ChatArgs, ConfigCommand, SessionsCommand};
use wardrobe_assistant::server::{self, ServeArgs};

/// Wardrobe Assistant - an AI stylist that knows your closet
#[derive(Parser)]
#[command(name = "wardrobe")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "WARDROBE_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL of a running server, for client commands
    #[arg(long, global = true, env = "WARDROBE_URL", default_value = "http://127.0.0.1:5000")]
    url: String,

    /// Access token from `wardrobe account login`
    #[arg(long, global = true, env = "WARDROBE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error); defaults to the config's
    #[arg(long, global = true, env = "WARDROBE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    #[command(name = "serve")]
    Serve(ServeArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Account registration and login
    #[command(name = "account")]
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },

    /// Send a message to the assistant
    #[command(name = "chat")]
    Chat(ChatArgs),

    /// Manage chat sessions
    #[command(name = "sessions")]
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the real environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(args)) => {
            let config = server::load_config(cli.config)?;
            let logging = config.spec.observability.as_ref().and_then(|o| o.logging.clone());
            let (level, format) = match logging {
                Some(l) => (cli.log_level.unwrap_or(l.level), l.format),
                None => (cli.log_level.unwrap_or_else(|| "info".to_string()), "text".to_string()),
            };
            init_logging(&level, &format)?;
            server::run(config, args).await
        }
        Some(Commands::Config { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "text")?;
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Account { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "text")?;
            let client = commands::api_client(&cli.url, cli.token.as_deref())?;
            commands::account::handle_command(command, client).await
        }
        Some(Commands::Chat(args)) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "text")?;
            let client = commands::api_client(&cli.url, cli.token.as_deref())?;
            commands::chat::handle_command(args, client).await
        }
        Some(Commands::Sessions { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "text")?;
            let client = commands::api_client(&cli.url, cli.token.as_deref())?;
            commands::sessions::handle_command(command, client).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format.eq_ignore_ascii_case("json") {
        builder.json().with_current_span(false).init();
    } else {
        builder.with_target(false).compact().init();
    }

    Ok(())
}
