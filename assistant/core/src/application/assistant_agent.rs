// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Assistant Agent
//!
//! One conversational agent per chat session. The agent owns:
//!
//! - a personalized system prompt (username, optional location, base
//!   instructions, memory guidance),
//! - a fixed [`ConversationMemory`] loaded from the stored transcript when the
//!   agent was built,
//! - a model context that grows with every run while the agent stays cached.
//!
//! A run is a plain request / tool / reflect cycle:
//!
//! ```text
//! user task ──► model ──► tool calls? ──no──► final text
//!                            │yes
//!                            ▼
//!                    ToolRouter::dispatch (each call)
//!                            │
//!              iterations left? ──yes──► model (with tools)
//!                            │no
//!              reflect_on_tool_use? ──yes──► model (no tools) ──► final text
//!                            │no
//!                            ▼
//!                 tool outputs joined by "\n"
//! ```

use metrics::histogram;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::domain::llm::{GenerationOptions, LLMError, LLMProvider, LlmMessage};
use crate::domain::memory::ConversationMemory;
use crate::domain::service_config::AssistantConfig;
use crate::domain::session::{ChatSession, SessionId};
use crate::domain::weather::Location;
use crate::infrastructure::prompt_template_engine::{PromptContext, PromptTemplateEngine, MEMORY_INSTRUCTIONS};
use crate::infrastructure::tool_router::ToolRouter;

/// Per-agent behaviour, taken from `spec.assistant`
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub options: GenerationOptions,
    pub memory_window: usize,
    pub max_tool_iterations: u32,
    pub reflect_on_tool_use: bool,
}

impl AgentSettings {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            options: GenerationOptions {
                max_tokens: Some(config.max_tokens),
                temperature: Some(config.temperature),
                stop_sequences: None,
            },
            memory_window: config.memory_window,
            max_tool_iterations: config.max_tool_iterations,
            reflect_on_tool_use: config.reflect_on_tool_use,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

/// Everything one run added to the model context, plus the reply text.
#[derive(Debug, Clone)]
pub struct AgentRunResult {
    pub messages: Vec<LlmMessage>,
    pub final_content: String,
}

pub struct AssistantAgent {
    session_id: SessionId,
    system_prompt: String,
    memory: ConversationMemory,
    context: Vec<LlmMessage>,
    model: Arc<dyn LLMProvider>,
    tools: Arc<ToolRouter>,
    settings: AgentSettings,
}

impl AssistantAgent {
    pub fn new(
        session_id: SessionId,
        system_prompt: String,
        memory: ConversationMemory,
        model: Arc<dyn LLMProvider>,
        tools: Arc<ToolRouter>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            session_id,
            system_prompt,
            memory,
            context: Vec::new(),
            model,
            tools,
            settings,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn name(&self) -> String {
        format!("assistant_{}", self.session_id)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Model context accumulated over this agent's runs
    pub fn context(&self) -> &[LlmMessage] {
        &self.context
    }

    /// Run one task. On error the context is rolled back, so a failed run
    /// leaves no trace in later ones.
    #[instrument(skip(self, task), fields(agent = %self.name()))]
    pub async fn run(&mut self, task: &str) -> Result<AgentRunResult, LLMError> {
        let started = Instant::now();
        let checkpoint = self.context.len();

        let result = self.run_inner(task).await;

        histogram!("wardrobe_agent_run_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(final_content) => Ok(AgentRunResult {
                messages: self.context[checkpoint..].to_vec(),
                final_content,
            }),
            Err(e) => {
                self.context.truncate(checkpoint);
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self, task: &str) -> Result<String, LLMError> {
        self.context.push(LlmMessage::user(task));

        let tool_defs = self.tools.definitions();
        let max_iterations = self.settings.max_tool_iterations.max(1);
        let mut iteration = 0;

        loop {
            let response = self
                .model
                .chat(&self.model_input(), &tool_defs, &self.settings.options)
                .await?;

            if !response.wants_tools() {
                let text = response.text().to_string();
                self.context.push(LlmMessage::assistant(text.clone()));
                return Ok(text);
            }

            iteration += 1;
            debug!(iteration, calls = response.tool_calls.len(), "model requested tools");

            self.context
                .push(LlmMessage::assistant_tool_calls(response.content.clone(), response.tool_calls.clone()));

            let mut outputs = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let invocation = self.tools.dispatch(call).await;
                self.context
                    .push(LlmMessage::tool_result(invocation.call_id, invocation.output.clone()));
                outputs.push(invocation.output);
            }

            if iteration < max_iterations {
                continue;
            }

            if self.settings.reflect_on_tool_use {
                let reflection = self
                    .model
                    .chat(&self.model_input(), &[], &self.settings.options)
                    .await?;
                let text = reflection.text().to_string();
                self.context.push(LlmMessage::assistant(text.clone()));
                return Ok(text);
            }

            info!("tool iterations exhausted without reflection, returning tool output");
            let summary = outputs.join("\n");
            self.context.push(LlmMessage::assistant(summary.clone()));
            return Ok(summary);
        }
    }

    /// System prompt, then memory, then the conversation so far
    fn model_input(&self) -> Vec<LlmMessage> {
        let mut messages = Vec::with_capacity(self.context.len() + 2);
        messages.push(LlmMessage::system(self.system_prompt.clone()));
        if let Some(memory) = self.memory.as_context_message() {
            messages.push(memory);
        }
        messages.extend(self.context.iter().cloned());
        messages
    }
}

/// Builds agents for sessions.
pub struct AgentFactory {
    model: Arc<dyn LLMProvider>,
    tools: Arc<ToolRouter>,
    prompts: PromptTemplateEngine,
    system_message: String,
    settings: AgentSettings,
}

impl AgentFactory {
    pub fn new(
        model: Arc<dyn LLMProvider>,
        tools: Arc<ToolRouter>,
        system_message: impl Into<String>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            model,
            tools,
            prompts: PromptTemplateEngine::new(),
            system_message: system_message.into().trim().to_string(),
            settings,
        }
    }

    /// Build an agent whose memory is the tail of the session's transcript.
    pub fn create(&self, session: &ChatSession, location: Option<Location>) -> anyhow::Result<AssistantAgent> {
        let context = PromptContext::new()
            .username(session.user_id.clone())
            .location(location)
            .system_message(self.system_message.clone())
            .memory_instructions(MEMORY_INSTRUCTIONS);
        let system_prompt = self.prompts.render_system_prompt(&context)?;
        let memory = ConversationMemory::from_history(&session.messages, self.settings.memory_window);

        debug!(
            session_id = %session.id,
            memory_entries = memory.len(),
            has_location = location.is_some(),
            "building assistant agent"
        );

        Ok(AssistantAgent::new(
            session.id,
            system_prompt,
            memory,
            self.model.clone(),
            self.tools.clone(),
            self.settings.clone(),
        ))
    }
}
