// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each record kind, defined in the domain layer
//! and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Records | Implementations |
//! |-------|---------|----------------|
//! | `UserRepository` | `User` | `InMemoryUserRepository`, `PostgresUserRepository` |
//! | `SessionRepository` | `ChatSession` | `InMemorySessionRepository`, `PostgresSessionRepository` |
//! | `OutfitRepository` | `OutfitRecord`, `WornOutfit` | `InMemoryOutfitRepository`, `PostgresOutfitRepository` |
//! | `FeedbackRepository` | `OutfitFeedback` | `InMemoryFeedbackRepository`, `PostgresFeedbackRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! Concrete implementations are selected at startup from `spec.storage` in
//! `wardrobe-config.yaml`. In-memory implementations serve development and
//! tests; PostgreSQL serves production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::session::{ChatSession, SessionId, SessionMessage, SessionSummary};
use crate::domain::user::User;
use crate::domain::wardrobe::{OutfitFeedback, OutfitRecord, WornOutfit};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `Duplicate` if the username or e-mail
    /// is taken.
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// True if any user already has this username or this e-mail
    async fn exists(&self, username: &str, email: &str) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &ChatSession) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: SessionId) -> Result<Option<ChatSession>, RepositoryError>;

    /// Find a session only if `username` owns it
    async fn find_for_user(&self, id: SessionId, username: &str) -> Result<Option<ChatSession>, RepositoryError>;

    /// Summaries of the user's sessions, newest first
    async fn list_for_user(&self, username: &str) -> Result<Vec<SessionSummary>, RepositoryError>;

    /// Append to the transcript. `NotFound` if the session vanished.
    async fn append_messages(&self, id: SessionId, messages: &[SessionMessage]) -> Result<(), RepositoryError>;

    /// Returns whether a session was deleted
    async fn delete_for_user(&self, id: SessionId, username: &str) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait OutfitRepository: Send + Sync {
    async fn insert_outfit(&self, outfit: &OutfitRecord) -> Result<(), RepositoryError>;

    /// Saved outfits, newest first
    async fn list_outfits(&self, username: &str) -> Result<Vec<OutfitRecord>, RepositoryError>;

    async fn insert_worn(&self, worn: &WornOutfit) -> Result<(), RepositoryError>;

    /// Worn outfits at or after `since`, newest first
    async fn list_worn_since(&self, username: &str, since: DateTime<Utc>) -> Result<Vec<WornOutfit>, RepositoryError>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn insert(&self, feedback: &OutfitFeedback) -> Result<(), RepositoryError>;

    /// Feedback rated `min_rating` or higher, best first, ties newest first
    async fn list_with_min_rating(&self, username: &str, min_rating: u8) -> Result<Vec<OutfitFeedback>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Duplicate(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
