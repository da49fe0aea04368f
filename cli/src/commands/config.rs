// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use wardrobe_core::domain::service_config::{resolve_secret, ServiceConfigManifest, StorageKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./wardrobe-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate {
            output,
            examples,
            force,
        } => generate(&output, examples, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        for (idx, path) in ServiceConfigManifest::search_paths().iter().enumerate() {
            let marker = if path.exists() { "✓".green() } else { " ".normal() };
            println!("  {}. {} {}", idx + 2, path.display(), marker);
        }
        println!();
    }

    let spec = &config.spec;
    println!("{} {}", "Current configuration:".bold(), config.metadata.name);
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    println!("  CORS origins: {}", spec.server.cors_allowed_origins.join(", "));
    println!();

    println!("{}", "Auth:".bold());
    println!("  Secret key: {}", secret_status(&spec.auth.secret_key));
    println!("  Token TTL: {}h", spec.auth.token_ttl_hours);
    println!();

    println!("{}", "Storage:".bold());
    match spec.storage.backend {
        StorageKind::Memory => println!("  Backend: memory"),
        StorageKind::Postgres => {
            println!("  Backend: postgres");
            println!(
                "  URL: {}",
                spec.storage.url.as_deref().map(secret_status).unwrap_or_else(|| "(not set)".red().to_string())
            );
        }
    }
    println!();

    println!("{}", "LLM Providers:".bold());
    if spec.llm_providers.is_empty() {
        println!("  {}", "(none)".yellow());
    }
    for provider in &spec.llm_providers {
        let state = if provider.enabled { "" } else { " [disabled]" };
        println!("  {} ({}){}", provider.name.bold(), provider.provider_type, state);
        println!("    Endpoint: {}", provider.endpoint);
        for model in &provider.models {
            println!("      - {} → {}", model.alias, model.model);
        }
    }
    if let Some(fallback) = &spec.llm_selection.fallback_provider {
        println!("  Fallback provider: {}", fallback);
    }
    println!();

    println!("{}", "Assistant:".bold());
    println!("  Model alias: {}", spec.assistant.model_alias);
    println!("  Temperature: {}", spec.assistant.temperature);
    println!("  Memory window: {} messages", spec.assistant.memory_window);
    println!("  Agent cache: {} sessions", spec.assistant.agent_cache_capacity);
    println!();

    println!("{}", "Weather:".bold());
    println!("  Endpoint: {}", spec.weather.endpoint);
    println!("  API key: {}", secret_status(&spec.weather.api_key));

    Ok(())
}

/// Describe a possibly indirect secret without printing its value.
fn secret_status(value: &str) -> String {
    let resolved = resolve_secret(value).is_some();
    match (value.strip_prefix("env:"), resolved) {
        (Some(var), true) => format!("from ${} {}", var, "✓".green()),
        (Some(var), false) => format!("from ${} {}", var, "(unset)".red()),
        (None, true) => "(set inline)".to_string(),
        (None, false) => "(not set)".red().to_string(),
    }
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    if config.secret_key().is_err() {
        println!("{}", "⚠ auth.secret_key does not resolve; the server will refuse to start".yellow());
    }

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn template(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

fn generate(output: &Path, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    std::fs::write(output, template(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
