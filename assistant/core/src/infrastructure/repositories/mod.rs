// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve users, sessions and wardrobe records
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresUserRepository** - `users` table
//! - **PostgresSessionRepository** - `chat_sessions`, transcript as a JSONB array
//! - **PostgresOutfitRepository** - `user_outfits` and `worn_outfits`
//! - **PostgresFeedbackRepository** - `outfit_feedback`
//!
//! ## In-Memory Repositories
//!
//! Lock-protected `HashMap`/`Vec` storage for development and tests. All
//! state is lost on restart.

pub mod postgres_feedback;
pub mod postgres_outfit;
pub mod postgres_session;
pub mod postgres_user;

pub use postgres_feedback::PostgresFeedbackRepository;
pub use postgres_outfit::PostgresOutfitRepository;
pub use postgres_session::PostgresSessionRepository;
pub use postgres_user::PostgresUserRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::repository::{
    FeedbackRepository, OutfitRepository, RepositoryError, SessionRepository, UserRepository,
};
use crate::domain::session::{ChatSession, SessionId, SessionMessage, SessionSummary};
use crate::domain::user::User;
use crate::domain::wardrobe::{OutfitFeedback, OutfitRecord, WornOutfit};

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write();
        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepositoryError::Duplicate(format!("user '{}'", user.username)));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().get(username).cloned())
    }

    async fn exists(&self, username: &str, email: &str) -> Result<bool, RepositoryError> {
        let users = self.users.read();
        Ok(users.contains_key(username) || users.values().any(|u| u.email == email))
    }
}

#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<SessionId, ChatSession>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.id) {
            return Err(RepositoryError::Duplicate(format!("session {}", session.id)));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<ChatSession>, RepositoryError> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    async fn find_for_user(&self, id: SessionId, username: &str) -> Result<Option<ChatSession>, RepositoryError> {
        Ok(self
            .sessions
            .read()
            .get(&id)
            .filter(|s| s.is_owned_by(username))
            .cloned())
    }

    async fn list_for_user(&self, username: &str) -> Result<Vec<SessionSummary>, RepositoryError> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.is_owned_by(username))
            .map(ChatSession::summary)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn append_messages(&self, id: SessionId, messages: &[SessionMessage]) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("session {}", id)))?;
        session.messages.extend_from_slice(messages);
        Ok(())
    }

    async fn delete_for_user(&self, id: SessionId, username: &str) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.write();
        match sessions.get(&id) {
            Some(s) if s.is_owned_by(username) => {
                sessions.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryOutfitRepository {
    outfits: Arc<RwLock<Vec<OutfitRecord>>>,
    worn: Arc<RwLock<Vec<WornOutfit>>>,
}

impl InMemoryOutfitRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutfitRepository for InMemoryOutfitRepository {
    async fn insert_outfit(&self, outfit: &OutfitRecord) -> Result<(), RepositoryError> {
        self.outfits.write().push(outfit.clone());
        Ok(())
    }

    async fn list_outfits(&self, username: &str) -> Result<Vec<OutfitRecord>, RepositoryError> {
        let mut found: Vec<OutfitRecord> = self
            .outfits
            .read()
            .iter()
            .filter(|o| o.username == username)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }

    async fn insert_worn(&self, worn: &WornOutfit) -> Result<(), RepositoryError> {
        self.worn.write().push(worn.clone());
        Ok(())
    }

    async fn list_worn_since(&self, username: &str, since: DateTime<Utc>) -> Result<Vec<WornOutfit>, RepositoryError> {
        let mut found: Vec<WornOutfit> = self
            .worn
            .read()
            .iter()
            .filter(|w| w.username == username && w.worn_at >= since)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.worn_at.cmp(&a.worn_at));
        Ok(found)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryFeedbackRepository {
    feedback: Arc<RwLock<Vec<OutfitFeedback>>>,
}

impl InMemoryFeedbackRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn insert(&self, feedback: &OutfitFeedback) -> Result<(), RepositoryError> {
        self.feedback.write().push(feedback.clone());
        Ok(())
    }

    async fn list_with_min_rating(&self, username: &str, min_rating: u8) -> Result<Vec<OutfitFeedback>, RepositoryError> {
        let mut found: Vec<OutfitFeedback> = self
            .feedback
            .read()
            .iter()
            .filter(|f| f.username == username && f.rating >= min_rating)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.rating.cmp(&a.rating).then(b.timestamp.cmp(&a.timestamp)));
        Ok(found)
    }
}
