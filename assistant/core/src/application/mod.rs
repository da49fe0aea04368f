// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent_cache;
pub mod assistant_agent;
pub mod auth_service;
pub mod chat_service;
pub mod wardrobe_tools;

pub use agent_cache::AgentCache;
pub use assistant_agent::{AgentFactory, AgentRunResult, AgentSettings, AssistantAgent};
pub use auth_service::{AuthService, StandardAuthService};
pub use chat_service::{ChatError, ChatReply, ChatService, StandardChatService};
