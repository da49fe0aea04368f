// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Prompt Template Engine
//!
//! Renders the per-session system prompt with Handlebars.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Transform templates with placeholders into final prompts
//! - **Integration:** `AgentFactory` → `AssistantAgent` system prompt
//!
//! # Supported Placeholders
//!
//! - `{{username}}` - Owner of the chat session
//! - `{{location.latitude}}` / `{{location.longitude}}` - Coordinates, 6 decimals
//! - `{{system_message}}` - Base assistant instructions
//! - `{{memory_instructions}}` - Fixed guidance on using conversation memory

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

use crate::domain::weather::Location;

/// Built-in base instructions, used when no `system_message_path` is configured.
pub const DEFAULT_SYSTEM_MESSAGE: &str = include_str!("../../prompts/system_message.txt");

pub const MEMORY_INSTRUCTIONS: &str = "IMPORTANT: Always check the conversation history in your memory before responding. \
Your responses should be contextual and reference previous messages when relevant. \
If a user asks about something that was discussed before, use that context in your response. \
When responding, first check your memory for relevant previous messages and incorporate that context into your response.";

// ============================================================================
// Template Context
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptLocation {
    pub latitude: String,
    pub longitude: String,
}

impl From<Location> for PromptLocation {
    fn from(location: Location) -> Self {
        Self {
            latitude: format!("{:.6}", location.latitude),
            longitude: format!("{:.6}", location.longitude),
        }
    }
}

/// Context data for prompt template rendering
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PromptLocation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_instructions: Option<String>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn location(mut self, location: Option<Location>) -> Self {
        self.location = location.map(PromptLocation::from);
        self
    }

    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn memory_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.memory_instructions = Some(instructions.into());
        self
    }
}

// ============================================================================
// Template Engine
// ============================================================================

pub struct PromptTemplateEngine {
    handlebars: Handlebars<'static>,
}

impl PromptTemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(false); // Don't fail on missing variables
        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        Self { handlebars }
    }

    pub fn render(&self, template: &str, context: &PromptContext) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .context("Failed to render prompt template")
    }

    /// Render the personalized system prompt for one session
    pub fn render_system_prompt(&self, context: &PromptContext) -> Result<String> {
        self.render(Self::system_prompt_template(), context)
    }

    pub fn system_prompt_template() -> &'static str {
        "You are assisting a user with username: '{{username}}'\
{{#if location}} (current location: lat {{location.latitude}}, lon {{location.longitude}}){{/if}}.\n\n\
{{system_message}}\n\n\
{{memory_instructions}}"
    }
}

impl Default for PromptTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_without_location() {
        let engine = PromptTemplateEngine::new();
        let context = PromptContext::new()
            .username("ada")
            .system_message("Be a stylist.")
            .memory_instructions(MEMORY_INSTRUCTIONS);

        let prompt = engine.render_system_prompt(&context).unwrap();
        assert!(prompt.starts_with("You are assisting a user with username: 'ada'.\n\nBe a stylist.\n\n"));
        assert!(prompt.ends_with("incorporate that context into your response."));
        assert!(!prompt.contains("current location"));
    }

    #[test]
    fn test_system_prompt_with_location() {
        let engine = PromptTemplateEngine::new();
        let context = PromptContext::new()
            .username("ada")
            .location(Some(Location { latitude: 9.0079232, longitude: 38.74816 }))
            .system_message("Be a stylist.");

        let prompt = engine.render_system_prompt(&context).unwrap();
        assert!(prompt.starts_with(
            "You are assisting a user with username: 'ada' (current location: lat 9.007923, lon 38.748160)."
        ));
    }

    #[test]
    fn test_no_html_escaping() {
        let engine = PromptTemplateEngine::new();
        let context = PromptContext::new().username("o'brien & co");
        let prompt = engine.render("{{username}}", &context).unwrap();
        assert_eq!(prompt, "o'brien & co");
    }

    #[test]
    fn test_context_exposes_only_prompt_fields() {
        let context = PromptContext::new()
            .username("ada")
            .location(Some(Location { latitude: 1.0, longitude: 2.0 }))
            .system_message("Be a stylist.")
            .memory_instructions(MEMORY_INSTRUCTIONS);
        let value = serde_json::to_value(&context).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["location", "memory_instructions", "system_message", "username"]);
    }

    #[test]
    fn test_unknown_placeholders_render_empty() {
        let engine = PromptTemplateEngine::new();
        let context = PromptContext::new().username("ada");
        assert_eq!(engine.render("{{username}}:{{season}}", &context).unwrap(), "ada:");
    }

    #[test]
    fn test_builtin_system_message_is_present() {
        assert!(DEFAULT_SYSTEM_MESSAGE.contains("store_user_outfit"));
    }
}
