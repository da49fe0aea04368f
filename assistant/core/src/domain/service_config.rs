// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the configuration schema for a Wardrobe Assistant deployment:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP server, auth and storage settings
// - LLM provider configuration and model alias mapping
// - Assistant behaviour (memory window, tool iterations, agent cache)
// - Weather API and observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "wardrobe.ai/v1";
pub const KIND: &str = "ServiceConfig";

/// Top-level Kubernetes-style service configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    /// API version (must be "wardrobe.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ServiceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: ServiceConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// LLM provider configurations
    #[serde(default)]
    pub llm_providers: Vec<LLMProviderConfig>,

    #[serde(default)]
    pub llm_selection: LLMSelection,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Origins allowed by CORS; "*" allows any
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens (supports "env:VAR_NAME")
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_kind")]
    pub backend: StorageKind,

    /// Connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    /// Unique provider name (e.g., "openai", "ollama-local")
    pub name: String,

    /// Provider type
    #[serde(rename = "type")]
    pub provider_type: String, // "openai", "openai-compatible", "ollama"

    /// API endpoint URL
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Whether this provider is active
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Available models on this provider
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Alias referenced by `assistant.model_alias` (e.g., "default", "fast")
    pub alias: String,

    /// Actual model identifier for the provider API
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMSelection {
    /// Fallback provider if primary fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<String>,

    /// Retries after the first failed call (0 means a single attempt)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_model_alias")]
    pub model_alias: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout for model calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// How many stored messages are loaded into a rebuilt agent's memory
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,

    /// Rounds of tool calls allowed per run
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,

    /// Ask the model for a final answer after tool results come back
    #[serde(default = "default_true")]
    pub reflect_on_tool_use: bool,

    /// Live agents kept in memory, least recently used evicted first
    #[serde(default = "default_agent_cache_capacity")]
    pub agent_cache_capacity: usize,

    /// Base system message file; the built-in prompt is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_endpoint")]
    pub endpoint: String,

    /// OpenWeatherMap key (supports "env:VAR_NAME")
    #[serde(default = "default_weather_api_key")]
    pub api_key: String,

    #[serde(default = "default_weather_units")]
    pub units: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus scrape port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_secret_key() -> String {
    "env:SECRET_KEY".to_string()
}

fn default_token_ttl_hours() -> i64 {
    crate::domain::auth::DEFAULT_TOKEN_TTL_HOURS
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Memory
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_model_alias() -> String {
    "default".to_string()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout() -> u64 {
    30
}

fn default_memory_window() -> usize {
    crate::domain::memory::DEFAULT_MEMORY_WINDOW
}

fn default_max_tool_iterations() -> u32 {
    1
}

fn default_agent_cache_capacity() -> usize {
    256
}

fn default_weather_endpoint() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_api_key() -> String {
    "env:OPENWEATHERMAP_API_KEY".to_string()
}

fn default_weather_units() -> String {
    "metric".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
            cors_allowed_origins: default_cors_origins(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_kind(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LLMSelection {
    fn default() -> Self {
        Self {
            fallback_provider: None,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model_alias: default_model_alias(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_seconds: default_request_timeout(),
            memory_window: default_memory_window(),
            max_tool_iterations: default_max_tool_iterations(),
            reflect_on_tool_use: true,
            agent_cache_capacity: default_agent_cache_capacity(),
            system_message_path: None,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_weather_endpoint(),
            api_key: default_weather_api_key(),
            units: default_weather_units(),
        }
    }
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "wardrobe-assistant".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

/// Resolve a config value that may point at the environment ("env:VAR_NAME").
///
/// An unset variable resolves to `None`; a literal value is returned as-is.
pub fn resolve_secret(value: &str) -> Option<String> {
    match value.strip_prefix("env:") {
        Some(var_name) => std::env::var(var_name).ok().filter(|v| !v.is_empty()),
        None if value.is_empty() => None,
        None => Some(value.to_string()),
    }
}

impl ServiceConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Standard locations checked by `discover_config`, in order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var("WARDROBE_CONFIG_PATH") {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("./wardrobe-config.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".wardrobe").join("config.yaml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/wardrobe/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\Wardrobe\\config.yaml"));
        paths
    }

    /// Discover configuration file using precedence order
    /// 1. WARDROBE_CONFIG_PATH environment variable
    /// 2. ./wardrobe-config.yaml (working directory)
    /// 3. ~/.wardrobe/config.yaml (user home)
    /// 4. /etc/wardrobe/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|p| p.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must load
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WARDROBE_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: WARDROBE_PORT={}", port);
                    self.spec.server.port = port;
                }
                Err(_) => tracing::warn!("Invalid value for WARDROBE_PORT: '{}'. Ignoring.", val),
            }
        }

        if let Ok(addr) = std::env::var("WARDROBE_BIND_ADDRESS") {
            tracing::info!("Environment override: WARDROBE_BIND_ADDRESS={}", addr);
            self.spec.server.bind_address = addr;
        }

        if let Ok(val) = std::env::var("WARDROBE_STORAGE_BACKEND") {
            match val.to_lowercase().as_str() {
                "memory" => self.spec.storage.backend = StorageKind::Memory,
                "postgres" | "postgresql" => self.spec.storage.backend = StorageKind::Postgres,
                _ => {
                    tracing::warn!(
                        "Invalid value for WARDROBE_STORAGE_BACKEND: '{}'. Expected memory/postgres. Ignoring.",
                        val
                    );
                }
            }
        }

        if std::env::var("DATABASE_URL").is_ok() && self.spec.storage.url.is_none() {
            self.spec.storage.url = Some("env:DATABASE_URL".to_string());
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        for provider in &self.spec.llm_providers {
            if provider.name.is_empty() {
                anyhow::bail!("LLM provider name cannot be empty");
            }

            if provider.endpoint.is_empty() {
                anyhow::bail!("LLM provider endpoint cannot be empty for: {}", provider.name);
            }

            if provider.models.is_empty() {
                anyhow::bail!("LLM provider must have at least one model: {}", provider.name);
            }

            for model in &provider.models {
                if model.alias.is_empty() {
                    anyhow::bail!("Model alias cannot be empty in provider: {}", provider.name);
                }

                if model.model.is_empty() {
                    anyhow::bail!("Model identifier cannot be empty for alias: {}", model.alias);
                }
            }
        }

        if let Some(fallback_provider) = &self.spec.llm_selection.fallback_provider {
            if !self.spec.llm_providers.iter().any(|p| &p.name == fallback_provider) {
                anyhow::bail!("Fallback provider '{}' not found in llm_providers", fallback_provider);
            }
        }

        if self.spec.storage.backend == StorageKind::Postgres && self.spec.storage.url.is_none() {
            anyhow::bail!("storage.url is required when storage.backend is postgres");
        }

        if self.spec.assistant.memory_window == 0 {
            anyhow::bail!("assistant.memory_window must be at least 1");
        }

        if self.spec.assistant.agent_cache_capacity == 0 {
            anyhow::bail!("assistant.agent_cache_capacity must be at least 1");
        }

        if self.spec.auth.token_ttl_hours <= 0 {
            anyhow::bail!("auth.token_ttl_hours must be positive");
        }

        Ok(())
    }

    /// Resolve the storage section into a concrete backend.
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.storage.backend {
            StorageKind::Memory => Ok(StorageBackend::InMemory),
            StorageKind::Postgres => {
                let raw = self
                    .spec
                    .storage
                    .url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("storage.url is not set"))?;
                let connection_string = resolve_secret(raw)
                    .ok_or_else(|| anyhow::anyhow!("storage.url '{}' did not resolve", raw))?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string,
                    max_connections: self.spec.storage.max_connections,
                }))
            }
        }
    }

    /// Token signing secret, resolved from the environment if indirect
    pub fn secret_key(&self) -> anyhow::Result<String> {
        resolve_secret(&self.spec.auth.secret_key)
            .ok_or_else(|| anyhow::anyhow!("auth.secret_key is not set (configured as '{}')", self.spec.auth.secret_key))
    }
}
