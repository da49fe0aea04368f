// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use super::postgres_outfit::items_from_row;
use crate::domain::repository::{FeedbackRepository, RepositoryError};
use crate::domain::wardrobe::{OutfitFeedback, RecordId};

/// `FeedbackRepository` backed by `outfit_feedback`.
pub struct PostgresFeedbackRepository {
    pool: PgPool,
}

impl PostgresFeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackRepository for PostgresFeedbackRepository {
    async fn insert(&self, feedback: &OutfitFeedback) -> Result<(), RepositoryError> {
        let items = serde_json::to_value(&feedback.outfit)?;

        sqlx::query(
            r#"
            INSERT INTO outfit_feedback (id, username, outfit, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(feedback.id.0)
        .bind(&feedback.username)
        .bind(items)
        .bind(feedback.rating as i16)
        .bind(feedback.comment.as_deref())
        .bind(feedback.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_with_min_rating(&self, username: &str, min_rating: u8) -> Result<Vec<OutfitFeedback>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, outfit, rating, comment, created_at
            FROM outfit_feedback
            WHERE username = $1 AND rating >= $2
            ORDER BY rating DESC, created_at DESC
            "#,
        )
        .bind(username)
        .bind(min_rating as i16)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let rating: i16 = row.get("rating");
                Ok(OutfitFeedback {
                    id: RecordId(row.get("id")),
                    username: row.get("username"),
                    outfit: items_from_row(row)?,
                    rating: rating as u8,
                    comment: row.get("comment"),
                    timestamp: row.get("created_at"),
                })
            })
            .collect()
    }
}
