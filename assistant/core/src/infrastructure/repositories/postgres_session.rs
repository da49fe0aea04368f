// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Session Repository
//!
//! `SessionRepository` backed by `chat_sessions`. The transcript is one JSONB
//! array per session; appends use `messages || $2` so concurrent writers never
//! overwrite each other's turns.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, SessionRepository};
use crate::domain::session::{ChatSession, SessionId, SessionMessage, SessionSummary};

pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn session_from_row(row: &PgRow) -> Result<ChatSession, RepositoryError> {
        let messages: serde_json::Value = row.get("messages");
        let messages: Vec<SessionMessage> = serde_json::from_value(messages)
            .map_err(|e| RepositoryError::Serialization(format!("Failed to deserialize messages: {}", e)))?;

        Ok(ChatSession {
            id: SessionId(row.get("id")),
            user_id: row.get("user_id"),
            created_at: row.get("created_at"),
            messages,
        })
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn insert(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let messages = serde_json::to_value(&session.messages)?;

        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, user_id, created_at, messages)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session.id.0)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(messages)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query("SELECT id, user_id, created_at, messages FROM chat_sessions WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::session_from_row).transpose()
    }

    async fn find_for_user(&self, id: SessionId, username: &str) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, created_at, messages
            FROM chat_sessions
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.0)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::session_from_row).transpose()
    }

    async fn list_for_user(&self, username: &str) -> Result<Vec<SessionSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, created_at
            FROM chat_sessions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SessionSummary {
                id: SessionId(row.get("id")),
                user_id: row.get("user_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn append_messages(&self, id: SessionId, messages: &[SessionMessage]) -> Result<(), RepositoryError> {
        let batch = serde_json::to_value(messages)?;

        let result = sqlx::query("UPDATE chat_sessions SET messages = messages || $2 WHERE id = $1")
            .bind(id.0)
            .bind(batch)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("session {}", id)));
        }
        Ok(())
    }

    async fn delete_for_user(&self, id: SessionId, username: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1 AND user_id = $2")
            .bind(id.0)
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
