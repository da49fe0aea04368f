// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Registry - Model Alias Resolution and Provider Management
//
// Resolves model aliases to concrete provider adapters and wraps every call
// in retry-with-backoff plus an optional fallback provider.

use crate::domain::llm::{
    GenerationOptions, GenerationResponse, LLMError, LLMProvider, LlmMessage, ToolDefinition,
};
use crate::domain::service_config::{resolve_secret, LLMProviderConfig, ServiceConfigSpec};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::openai::OpenAIAdapter;

/// Registry for managing LLM providers and resolving model aliases
pub struct ProviderRegistry {
    /// alias -> (provider_name, adapter bound to that alias's model)
    alias_map: HashMap<String, (String, Arc<dyn LLMProvider>)>,
    /// provider_name -> adapter for the provider's first model, used as fallback
    primary_models: HashMap<String, Arc<dyn LLMProvider>>,
    fallback_provider: Option<String>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl ProviderRegistry {
    pub fn new(fallback_provider: Option<String>, max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            alias_map: HashMap::new(),
            primary_models: HashMap::new(),
            fallback_provider,
            max_retries,
            retry_delay_ms,
        }
    }

    /// Create provider registry from service configuration
    pub fn from_config(config: &ServiceConfigSpec) -> anyhow::Result<Self> {
        let mut registry = Self::new(
            config.llm_selection.fallback_provider.clone(),
            config.llm_selection.max_retries,
            config.llm_selection.retry_delay_ms,
        );
        let timeout = Duration::from_secs(config.assistant.request_timeout_seconds);

        info!("Initializing LLM provider registry");

        for provider_config in &config.llm_providers {
            if !provider_config.enabled {
                info!("Provider '{}' disabled, skipping", provider_config.name);
                continue;
            }

            info!("Initializing provider: {}", provider_config.name);

            if let Err(e) = registry.add_configured_provider(provider_config, timeout) {
                warn!("Failed to initialize provider '{}': {}", provider_config.name, e);
                // Continue with other providers
            }
        }

        if registry.alias_map.is_empty() {
            warn!("No LLM providers configured - chat requests will fail until one is added");
        }

        Ok(registry)
    }

    fn add_configured_provider(&mut self, config: &LLMProviderConfig, timeout: Duration) -> anyhow::Result<()> {
        let api_key = Self::resolve_api_key(&config.api_key)?;
        let endpoint = match config.provider_type.as_str() {
            "openai" | "openai-compatible" => config.endpoint.clone(),
            // Ollama speaks the OpenAI protocol under /v1
            "ollama" => {
                let base = config.endpoint.trim_end_matches('/');
                if base.ends_with("/v1") {
                    base.to_string()
                } else {
                    format!("{}/v1", base)
                }
            }
            _ => anyhow::bail!("Unsupported provider type: {}", config.provider_type),
        };

        for model_config in &config.models {
            info!(
                "Mapping alias '{}' -> {} ({})",
                model_config.alias, model_config.model, config.name
            );
            let adapter = OpenAIAdapter::with_timeout(
                endpoint.clone(),
                api_key.clone(),
                model_config.model.clone(),
                timeout,
            )
            .named(config.name.clone());
            self.register(&config.name, &model_config.alias, Arc::new(adapter));
        }

        Ok(())
    }

    /// Bind `alias` to `provider`. The first alias registered for a provider
    /// name is the one used when that provider acts as the fallback.
    pub fn register(&mut self, provider_name: &str, alias: &str, provider: Arc<dyn LLMProvider>) {
        self.primary_models
            .entry(provider_name.to_string())
            .or_insert_with(|| provider.clone());
        self.alias_map
            .insert(alias.to_string(), (provider_name.to_string(), provider));
    }

    /// Resolve API key from config (supports "env:VAR_NAME" syntax)
    fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
        match key {
            Some(k) if k.starts_with("env:") => resolve_secret(k)
                .ok_or_else(|| anyhow::anyhow!("Environment variable not set: {}", &k[4..])),
            Some(k) => Ok(k.clone()),
            None => Ok(String::new()), // For local providers without auth
        }
    }

    /// Run a chat completion using a model alias.
    /// A failed call is retried up to `max_retries` times with exponential
    /// backoff; the fallback provider gets one try after the last failure.
    pub async fn chat(
        &self,
        alias: &str,
        messages: &[LlmMessage],
        tools: &[ToolDefinition],
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        let (provider_name, provider) = self
            .alias_map
            .get(alias)
            .ok_or_else(|| LLMError::ModelNotFound(format!("Model alias '{}' not found", alias)))?;

        let attempts = self.max_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match provider.chat(messages, tools, options).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!("Generation successful on attempt {}", attempt + 1);
                    }
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(provider = %provider_name, "Generation failed, not retrying: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        provider = %provider_name,
                        "Generation failed (attempt {}/{}): {:?}",
                        attempt + 1,
                        attempts,
                        e
                    );
                    last_error = Some(e);

                    // Try fallback provider on last attempt
                    if attempt == attempts - 1 {
                        if let Some(fallback) = &self.fallback_provider {
                            if fallback != provider_name {
                                if let Some(fallback_provider) = self.primary_models.get(fallback) {
                                    info!("Trying fallback provider: {}", fallback);
                                    return fallback_provider.chat(messages, tools, options).await;
                                }
                            }
                        }
                        break;
                    }

                    // Exponential backoff
                    tokio::time::sleep(Duration::from_millis(
                        self.retry_delay_ms.saturating_mul(2_u64.saturating_pow(attempt)),
                    ))
                    .await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LLMError::Provider("Unknown error".into())))
    }

    /// Check health of all providers
    pub async fn health_check_all(&self) -> HashMap<String, Result<(), LLMError>> {
        let mut results = HashMap::new();

        for (name, provider) in &self.primary_models {
            info!("Health checking provider: {}", name);
            results.insert(name.clone(), provider.health_check().await);
        }

        results
    }

    /// Get list of available model aliases
    pub fn available_aliases(&self) -> Vec<String> {
        self.alias_map.keys().cloned().collect()
    }

    /// Check if a model alias exists
    pub fn has_alias(&self, alias: &str) -> bool {
        self.alias_map.contains_key(alias)
    }
}

/// A single alias of the registry exposed as an `LLMProvider`, so the agent
/// gets retries and fallback without knowing about aliases.
#[derive(Clone)]
pub struct AliasedModel {
    registry: Arc<ProviderRegistry>,
    alias: String,
}

impl AliasedModel {
    pub fn new(registry: Arc<ProviderRegistry>, alias: impl Into<String>) -> Self {
        Self {
            registry,
            alias: alias.into(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

#[async_trait]
impl LLMProvider for AliasedModel {
    async fn chat(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolDefinition],
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        self.registry.chat(&self.alias, messages, tools, options).await
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        let (_, provider) = self
            .registry
            .alias_map
            .get(&self.alias)
            .ok_or_else(|| LLMError::ModelNotFound(self.alias.clone()))?;
        provider.health_check().await
    }
}
