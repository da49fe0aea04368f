// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP server bootstrap
//!
//! Builds the storage backend, model registry, tools and services from a
//! validated [`ServiceConfigManifest`] and serves the API until Ctrl+C or
//! SIGTERM.

use anyhow::{Context, Result};
use axum::Router;
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use wardrobe_core::{
    application::{
        wardrobe_tools::register_wardrobe_tools, AgentCache, AgentFactory, AgentSettings, StandardAuthService,
        StandardChatService,
    },
    domain::{
        repository::{FeedbackRepository, OutfitRepository, SessionRepository, StorageBackend, UserRepository},
        service_config::{resolve_secret, ServiceConfigManifest},
    },
    infrastructure::{
        db::Database,
        llm::{AliasedModel, ProviderRegistry},
        password::Argon2PasswordHasher,
        prompt_template_engine::DEFAULT_SYSTEM_MESSAGE,
        repositories::{
            InMemoryFeedbackRepository, InMemoryOutfitRepository, InMemorySessionRepository, InMemoryUserRepository,
            PostgresFeedbackRepository, PostgresOutfitRepository, PostgresSessionRepository, PostgresUserRepository,
        },
        token::JwtTokenIssuer,
        tool_router::ToolRouter,
        weather::OpenWeatherMapClient,
    },
    presentation::{app, AppState},
};

#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Override `spec.server.port`
    #[arg(long)]
    pub port: Option<u16>,

    /// Override `spec.server.bind_address`
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Discover, load and validate the service configuration.
pub fn load_config(config_path: Option<PathBuf>) -> Result<ServiceConfigManifest> {
    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

pub async fn run(mut config: ServiceConfigManifest, args: ServeArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.spec.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.spec.server.bind_address = bind;
    }

    info!("Wardrobe assistant starting: {}", config.metadata.name);

    install_metrics_exporter(&config)?;
    let app = build_app(&config).await?;

    let addr = format!("{}:{}", config.spec.server.bind_address, config.spec.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shut down");

    Ok(())
}

struct Storage {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    outfits: Arc<dyn OutfitRepository>,
    feedback: Arc<dyn FeedbackRepository>,
}

async fn build_storage(config: &ServiceConfigManifest) -> Result<Storage> {
    match config.storage_backend()? {
        StorageBackend::InMemory => {
            warn!("Using in-memory storage; all data is lost on restart");
            Ok(Storage {
                users: Arc::new(InMemoryUserRepository::new()),
                sessions: Arc::new(InMemorySessionRepository::new()),
                outfits: Arc::new(InMemoryOutfitRepository::new()),
                feedback: Arc::new(InMemoryFeedbackRepository::new()),
            })
        }
        StorageBackend::PostgreSQL(pg) => {
            let db = Database::new(&pg).await?;
            db.migrate().await?;
            info!("Connected to PostgreSQL");
            let pool = db.get_pool().clone();
            Ok(Storage {
                users: Arc::new(PostgresUserRepository::new(pool.clone())),
                sessions: Arc::new(PostgresSessionRepository::new(pool.clone())),
                outfits: Arc::new(PostgresOutfitRepository::new(pool.clone())),
                feedback: Arc::new(PostgresFeedbackRepository::new(pool)),
            })
        }
    }
}

/// Wire every service and return the ready-to-serve router.
pub async fn build_app(config: &ServiceConfigManifest) -> Result<Router> {
    let spec = &config.spec;
    let secret = config.secret_key().context("A token signing secret is required")?;
    let storage = build_storage(config).await?;

    let registry = Arc::new(ProviderRegistry::from_config(spec).context("Failed to initialize LLM providers")?);
    if !registry.has_alias(&spec.assistant.model_alias) {
        warn!(
            "Model alias '{}' is not served by any provider (available: {:?})",
            spec.assistant.model_alias,
            registry.available_aliases()
        );
    }
    let model = Arc::new(AliasedModel::new(registry, spec.assistant.model_alias.clone()));

    let weather_key = resolve_secret(&spec.weather.api_key);
    if weather_key.is_none() {
        warn!("No OpenWeatherMap API key configured; get_weather will report errors");
    }
    let weather = Arc::new(OpenWeatherMapClient::new(
        spec.weather.endpoint.clone(),
        weather_key,
        spec.weather.units.clone(),
    ));

    let mut tools = ToolRouter::new();
    register_wardrobe_tools(&mut tools, storage.outfits, storage.feedback, weather);
    info!("Registered {} assistant tools: {:?}", tools.len(), tools.tool_names());

    let system_message = match &spec.assistant.system_message_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system message from {:?}", path))?,
        None => DEFAULT_SYSTEM_MESSAGE.to_string(),
    };

    let factory = AgentFactory::new(
        model,
        Arc::new(tools),
        system_message,
        AgentSettings::from_config(&spec.assistant),
    );
    let cache = Arc::new(AgentCache::new(spec.assistant.agent_cache_capacity));

    let tokens = JwtTokenIssuer::with_ttl(&secret, chrono::Duration::hours(spec.auth.token_ttl_hours));
    let auth_service = Arc::new(StandardAuthService::new(
        storage.users,
        Arc::new(Argon2PasswordHasher::new()),
        Arc::new(tokens),
    ));
    let chat_service = Arc::new(StandardChatService::new(storage.sessions, Arc::new(factory), cache));

    Ok(app(
        AppState::new(auth_service, chat_service),
        &spec.server.cors_allowed_origins,
    ))
}

fn install_metrics_exporter(config: &ServiceConfigManifest) -> Result<()> {
    let Some(metrics_config) = config.spec.observability.as_ref().and_then(|o| o.metrics.as_ref()) else {
        return Ok(());
    };
    if !metrics_config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", config.spec.server.bind_address, metrics_config.port)
        .parse()
        .context("Invalid metrics listen address")?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    metrics::describe_counter!("wardrobe_chat_requests_total", "Chat requests by outcome");
    metrics::describe_histogram!("wardrobe_agent_run_duration_seconds", "Assistant run latency");
    metrics::describe_counter!("wardrobe_tool_invocations_total", "Tool calls by tool name");
    metrics::describe_counter!("wardrobe_tool_errors_total", "Failed tool calls by tool name");
    metrics::describe_histogram!("wardrobe_tool_duration_seconds", "Tool call latency");

    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
