// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Wardrobe CLI

pub mod account;
pub mod chat;
pub mod config;
pub mod sessions;

pub use self::account::AccountCommand;
pub use self::chat::ChatArgs;
pub use self::config::ConfigCommand;
pub use self::sessions::SessionsCommand;

use anyhow::{Context, Result};
use wardrobe_assistant_sdk::WardrobeClient;

/// API client for `url`, authenticated when a token is available.
pub fn api_client(url: &str, token: Option<&str>) -> Result<WardrobeClient> {
    let client = WardrobeClient::new(url).context("Failed to build API client")?;
    Ok(match token.filter(|t| !t.is_empty()) {
        Some(token) => client.with_token(token),
        None => client,
    })
}
