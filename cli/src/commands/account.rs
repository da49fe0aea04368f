// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Account commands: register, login, whoami

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use wardrobe_assistant_sdk::WardrobeClient;

#[derive(Subcommand)]
pub enum AccountCommand {
    /// Create a new account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Read from WARDROBE_PASSWORD when not given
        #[arg(long, env = "WARDROBE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in and print a token for WARDROBE_TOKEN
    Login {
        #[arg(long)]
        username: String,

        #[arg(long, env = "WARDROBE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Check the configured token
    Whoami,
}

pub async fn handle_command(command: AccountCommand, client: WardrobeClient) -> Result<()> {
    match command {
        AccountCommand::Register {
            username,
            email,
            password,
        } => {
            let message = client
                .register(&username, &password, &email)
                .await
                .context("Registration failed")?;
            println!("{}", format!("✓ {}", message).green());
        }
        AccountCommand::Login { username, password } => {
            let token = client.login(&username, &password).await.context("Login failed")?;
            println!("{}", "✓ Logged in".green());
            println!("export WARDROBE_TOKEN={}", token);
        }
        AccountCommand::Whoami => {
            let validation = client.validate_token().await.context("Token check failed")?;
            println!("{} ({})", validation.username.bold(), validation.message);
        }
    }
    Ok(())
}
