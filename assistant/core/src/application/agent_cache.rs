// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::application::assistant_agent::AssistantAgent;
use crate::domain::session::SessionId;

pub type SharedAgent = Arc<tokio::sync::Mutex<AssistantAgent>>;

/// Live agents by session, least recently used evicted first.
///
/// The outer lock only guards the map. Runs hold the per-agent async mutex,
/// which serializes concurrent requests on the same session.
pub struct AgentCache {
    agents: Mutex<LruCache<SessionId, SharedAgent>>,
}

impl AgentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            agents: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SharedAgent> {
        self.agents.lock().get(session_id).cloned()
    }

    /// Cache `agent` unless another request got there first; either way
    /// return the agent now cached for the session.
    pub fn insert_if_absent(&self, session_id: SessionId, agent: AssistantAgent) -> SharedAgent {
        let mut agents = self.agents.lock();
        if let Some(existing) = agents.get(&session_id) {
            return existing.clone();
        }
        let shared = Arc::new(tokio::sync::Mutex::new(agent));
        if let Some((evicted, _)) = agents.push(session_id, shared.clone()) {
            if evicted != session_id {
                tracing::debug!(session_id = %evicted, "evicted idle agent from cache");
            }
        }
        shared
    }

    pub fn evict(&self, session_id: &SessionId) -> bool {
        self.agents.lock().pop(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.agents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::assistant_agent::AgentSettings;
    use crate::domain::llm::{GenerationOptions, GenerationResponse, LLMError, LLMProvider, LlmMessage, ToolDefinition};
    use crate::domain::memory::ConversationMemory;
    use crate::infrastructure::tool_router::ToolRouter;
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl LLMProvider for Silent {
        async fn chat(
            &self,
            _messages: &[LlmMessage],
            _tools: &[ToolDefinition],
            _options: &GenerationOptions,
        ) -> Result<GenerationResponse, LLMError> {
            Err(LLMError::Provider("unused".into()))
        }

        async fn health_check(&self) -> Result<(), LLMError> {
            Ok(())
        }
    }

    fn agent(id: SessionId) -> AssistantAgent {
        AssistantAgent::new(
            id,
            "prompt".into(),
            ConversationMemory::new(),
            Arc::new(Silent),
            Arc::new(ToolRouter::new()),
            AgentSettings::default(),
        )
    }

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let cache = AgentCache::new(4);
        let id = SessionId::new();
        let first = cache.insert_if_absent(id, agent(id));
        let second = cache.insert_if_absent(id, agent(id));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = AgentCache::new(2);
        let (a, b, c) = (SessionId::new(), SessionId::new(), SessionId::new());
        cache.insert_if_absent(a, agent(a));
        cache.insert_if_absent(b, agent(b));
        // touch a so b becomes the oldest
        assert!(cache.get(&a).is_some());
        cache.insert_if_absent(c, agent(c));

        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&c).is_some());
    }

    #[test]
    fn test_evict() {
        let cache = AgentCache::new(2);
        let id = SessionId::new();
        cache.insert_if_absent(id, agent(id));
        assert!(cache.evict(&id));
        assert!(!cache.evict(&id));
        assert!(cache.is_empty());
    }
}
