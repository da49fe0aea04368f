// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chat Service
//!
//! Use cases behind `/chat` and `/sessions`: run a message through the
//! session's agent and record the exchange, plus session listing, lookup
//! and deletion. Every operation is scoped to the authenticated user; a
//! session owned by someone else is indistinguishable from a missing one.

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::application::agent_cache::{AgentCache, SharedAgent};
use crate::application::assistant_agent::AgentFactory;
use crate::domain::llm::LLMError;
use crate::domain::repository::{RepositoryError, SessionRepository};
use crate::domain::session::{ChatSession, SessionId, SessionSummary};
use crate::domain::user::User;
use crate::domain::weather::Location;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Missing message")]
    MissingMessage,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Assistant unavailable: {0}")]
    Agent(#[from] LLMError),

    #[error("Storage error: {0}")]
    Repository(RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ChatError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => ChatError::SessionNotFound,
            other => ChatError::Repository(other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub session_id: SessionId,
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send `message` in `session_id` (or a new session when absent)
    async fn chat(
        &self,
        user: &User,
        message: &str,
        session_id: Option<&str>,
        location: Option<Location>,
    ) -> Result<ChatReply, ChatError>;

    async fn list_sessions(&self, user: &User) -> Result<Vec<SessionSummary>, ChatError>;

    async fn get_session(&self, user: &User, session_id: &str) -> Result<ChatSession, ChatError>;

    async fn delete_session(&self, user: &User, session_id: &str) -> Result<(), ChatError>;
}

pub struct StandardChatService {
    sessions: Arc<dyn SessionRepository>,
    agents: Arc<AgentFactory>,
    cache: Arc<AgentCache>,
}

impl StandardChatService {
    pub fn new(sessions: Arc<dyn SessionRepository>, agents: Arc<AgentFactory>, cache: Arc<AgentCache>) -> Self {
        Self { sessions, agents, cache }
    }

    /// Unparseable ids can't name any session
    fn parse_id(raw: &str) -> Result<SessionId, ChatError> {
        SessionId::from_string(raw.trim()).map_err(|_| ChatError::SessionNotFound)
    }

    async fn open_session(&self, user: &User, session_id: Option<&str>) -> Result<ChatSession, ChatError> {
        match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            None => {
                let session = ChatSession::new(user.username.clone());
                self.sessions.insert(&session).await?;
                info!(session_id = %session.id, username = %user.username, "created chat session");
                Ok(session)
            }
            Some(raw) => {
                let id = Self::parse_id(raw)?;
                self.sessions
                    .find_for_user(id, &user.username)
                    .await?
                    .ok_or(ChatError::SessionNotFound)
            }
        }
    }

    fn agent_for(&self, session: &ChatSession, location: Option<Location>) -> Result<SharedAgent, ChatError> {
        if let Some(agent) = self.cache.get(&session.id) {
            return Ok(agent);
        }
        let agent = self
            .agents
            .create(session, location)
            .map_err(|e| ChatError::Internal(format!("failed to build assistant: {}", e)))?;
        Ok(self.cache.insert_if_absent(session.id, agent))
    }
}

#[async_trait]
impl ChatService for StandardChatService {
    async fn chat(
        &self,
        user: &User,
        message: &str,
        session_id: Option<&str>,
        location: Option<Location>,
    ) -> Result<ChatReply, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::MissingMessage);
        }

        let session = self.open_session(user, session_id).await?;
        let handle = self.agent_for(&session, location)?;

        // Held until the exchange is stored so turns land in run order
        let mut agent = handle.lock().await;
        let result = match agent.run(message).await {
            Ok(result) => result,
            Err(e) => {
                error!(session_id = %session.id, "assistant run failed: {}", e);
                counter!("wardrobe_chat_requests_total", "outcome" => "error").increment(1);
                return Err(e.into());
            }
        };
        debug!(session_id = %session.id, context_messages = result.messages.len(), "assistant run finished");

        let exchange = ChatSession::exchange(message, &result.final_content);
        if let Err(e) = self.sessions.append_messages(session.id, &exchange).await {
            // Session deleted mid-run: drop the agent rebuilt for it
            self.cache.evict(&session.id);
            return Err(e.into());
        }
        drop(agent);

        counter!("wardrobe_chat_requests_total", "outcome" => "ok").increment(1);
        Ok(ChatReply {
            response: result.final_content,
            session_id: session.id,
        })
    }

    async fn list_sessions(&self, user: &User) -> Result<Vec<SessionSummary>, ChatError> {
        Ok(self.sessions.list_for_user(&user.username).await?)
    }

    async fn get_session(&self, user: &User, session_id: &str) -> Result<ChatSession, ChatError> {
        let id = Self::parse_id(session_id)?;
        self.sessions
            .find_for_user(id, &user.username)
            .await?
            .ok_or(ChatError::SessionNotFound)
    }

    async fn delete_session(&self, user: &User, session_id: &str) -> Result<(), ChatError> {
        let id = Self::parse_id(session_id)?;
        if !self.sessions.delete_for_user(id, &user.username).await? {
            return Err(ChatError::SessionNotFound);
        }
        self.cache.evict(&id);
        info!(session_id = %id, username = %user.username, "deleted chat session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::assistant_agent::AgentSettings;
    use crate::domain::llm::{
        FinishReason, GenerationOptions, GenerationResponse, LLMProvider, LlmMessage, TokenUsage, ToolDefinition,
    };
    use crate::domain::session::MessageRole;
    use crate::infrastructure::repositories::InMemorySessionRepository;
    use crate::infrastructure::tool_router::ToolRouter;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Replies with the last user message, upper-cased
    struct Shout {
        fail: AtomicBool,
    }

    #[async_trait]
    impl LLMProvider for Shout {
        async fn chat(
            &self,
            messages: &[LlmMessage],
            _tools: &[ToolDefinition],
            _options: &GenerationOptions,
        ) -> Result<GenerationResponse, LLMError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(LLMError::Network("offline".into()));
            }
            let last = messages.last().map(|m| m.content.to_uppercase()).unwrap_or_default();
            Ok(GenerationResponse {
                content: Some(last),
                tool_calls: vec![],
                usage: TokenUsage::default(),
                provider: "shout".into(),
                model: "shout".into(),
                finish_reason: FinishReason::Stop,
            })
        }

        async fn health_check(&self) -> Result<(), LLMError> {
            Ok(())
        }
    }

    struct Fixture {
        service: StandardChatService,
        cache: Arc<AgentCache>,
        model: Arc<Shout>,
    }

    fn fixture() -> Fixture {
        let model = Arc::new(Shout { fail: AtomicBool::new(false) });
        let factory = AgentFactory::new(model.clone(), Arc::new(ToolRouter::new()), "Be a stylist.", AgentSettings::default());
        let cache = Arc::new(AgentCache::new(8));
        let service = StandardChatService::new(Arc::new(InMemorySessionRepository::new()), Arc::new(factory), cache.clone());
        Fixture { service, cache, model }
    }

    fn user(name: &str) -> User {
        User::new(name, format!("{}@example.com", name), "hash".into())
    }

    #[tokio::test]
    async fn test_chat_creates_session_and_records_exchange() {
        let f = fixture();
        let ada = user("ada");

        let reply = f.service.chat(&ada, "hello there", None, None).await.unwrap();
        assert_eq!(reply.response, "HELLO THERE");

        let session = f.service.get_session(&ada, &reply.session_id.to_string()).await.unwrap();
        assert_eq!(session.user_id, "ada");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, MessageRole::User);
        assert_eq!(session.messages[1].content, "HELLO THERE");
        assert_eq!(f.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_continues_existing_session() {
        let f = fixture();
        let ada = user("ada");
        let first = f.service.chat(&ada, "one", None, None).await.unwrap();
        let id = first.session_id.to_string();
        let second = f.service.chat(&ada, "two", Some(&id), None).await.unwrap();

        assert_eq!(second.session_id, first.session_id);
        let session = f.service.get_session(&ada, &id).await.unwrap();
        assert_eq!(session.messages.len(), 4);
        assert_eq!(f.service.list_sessions(&ada).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_rejects_foreign_or_bogus_session() {
        let f = fixture();
        let reply = f.service.chat(&user("ada"), "mine", None, None).await.unwrap();
        let id = reply.session_id.to_string();

        let err = f.service.chat(&user("mallory"), "hijack", Some(&id), None).await.unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound));

        let err = f.service.chat(&user("ada"), "hi", Some("not-a-uuid"), None).await.unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_chat_requires_message() {
        let f = fixture();
        let err = f.service.chat(&user("ada"), "   ", None, None).await.unwrap_err();
        assert!(matches!(err, ChatError::MissingMessage));
        assert_eq!(err.to_string(), "Missing message");
    }

    #[tokio::test]
    async fn test_failed_run_stores_nothing() {
        let f = fixture();
        let ada = user("ada");
        let reply = f.service.chat(&ada, "one", None, None).await.unwrap();
        let id = reply.session_id.to_string();

        f.model.fail.store(true, Ordering::SeqCst);
        let err = f.service.chat(&ada, "two", Some(&id), None).await.unwrap_err();
        assert!(matches!(err, ChatError::Agent(_)));

        let session = f.service.get_session(&ada, &id).await.unwrap();
        assert_eq!(session.messages.len(), 2);
    }

    /// Answers "re: <task>" after a pause, so overlapping runs would interleave
    struct Slow;

    #[async_trait]
    impl LLMProvider for Slow {
        async fn chat(
            &self,
            messages: &[LlmMessage],
            _tools: &[ToolDefinition],
            _options: &GenerationOptions,
        ) -> Result<GenerationResponse, LLMError> {
            tokio::time::sleep(std::time::Duration::from_millis(15)).await;
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(GenerationResponse {
                content: Some(format!("re: {}", last)),
                tool_calls: vec![],
                usage: TokenUsage::default(),
                provider: "slow".into(),
                model: "slow".into(),
                finish_reason: FinishReason::Stop,
            })
        }

        async fn health_check(&self) -> Result<(), LLMError> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_turns_on_one_session_stay_paired() {
        let factory = AgentFactory::new(Arc::new(Slow), Arc::new(ToolRouter::new()), "Be a stylist.", AgentSettings::default());
        let cache = Arc::new(AgentCache::new(8));
        let service = Arc::new(StandardChatService::new(
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(factory),
            cache.clone(),
        ));
        let ada = user("ada");

        let first = service.chat(&ada, "start", None, None).await.unwrap();
        let id = first.session_id.to_string();

        let turns = 8;
        let mut handles = Vec::new();
        for i in 0..turns {
            let service = service.clone();
            let ada = ada.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let message = format!("turn {}", i);
                let reply = service.chat(&ada, &message, Some(&id), None).await.unwrap();
                assert_eq!(reply.response, format!("re: {}", message));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let session = service.get_session(&ada, &id).await.unwrap();
        assert_eq!(session.messages.len(), 2 * (turns + 1));
        for pair in session.messages.chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].role, MessageRole::Assistant);
            assert_eq!(pair[1].content, format!("re: {}", pair[0].content));
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_session_evicts_agent() {
        let f = fixture();
        let ada = user("ada");
        let reply = f.service.chat(&ada, "hi", None, None).await.unwrap();
        let id = reply.session_id.to_string();

        let err = f.service.delete_session(&user("mallory"), &id).await.unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound));

        f.service.delete_session(&ada, &id).await.unwrap();
        assert!(f.cache.is_empty());
        assert!(matches!(
            f.service.get_session(&ada, &id).await,
            Err(ChatError::SessionNotFound)
        ));
        assert!(matches!(
            f.service.delete_session(&ada, &id).await,
            Err(ChatError::SessionNotFound)
        ));
    }
}
