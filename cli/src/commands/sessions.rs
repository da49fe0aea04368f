// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session commands: list, show, delete

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use wardrobe_assistant_sdk::{MessageRole, WardrobeClient};

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// List your chat sessions, newest first
    List,

    /// Print a session transcript
    Show {
        #[arg(value_name = "SESSION_ID")]
        session_id: String,

        /// Print the raw JSON document
        #[arg(long)]
        json: bool,
    },

    /// Delete a session
    Delete {
        #[arg(value_name = "SESSION_ID")]
        session_id: String,
    },
}

pub async fn handle_command(command: SessionsCommand, client: WardrobeClient) -> Result<()> {
    match command {
        SessionsCommand::List => {
            let sessions = client.list_sessions().await.context("Failed to list sessions")?;
            if sessions.is_empty() {
                println!("{}", "No sessions found".yellow());
                return Ok(());
            }
            println!("{:<38} {}", "ID", "CREATED");
            for session in sessions {
                println!("{:<38} {}", session.id, session.created_at.format("%Y-%m-%d %H:%M:%S"));
            }
        }
        SessionsCommand::Show { session_id, json } => {
            let session = client.get_session(&session_id).await.context("Failed to fetch session")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
                return Ok(());
            }
            for message in &session.messages {
                let who = match message.role {
                    MessageRole::User => "you".cyan().bold(),
                    MessageRole::Assistant => "assistant".magenta().bold(),
                };
                println!("{} {}", who, message.timestamp.format("%H:%M").to_string().dimmed());
                println!("{}", message.content);
                println!();
            }
        }
        SessionsCommand::Delete { session_id } => {
            client
                .delete_session(&session_id)
                .await
                .context("Failed to delete session")?;
            println!("{}", format!("✓ Session {} deleted", session_id).green());
        }
    }
    Ok(())
}
