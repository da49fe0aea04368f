// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Outfit Repository
//!
//! Saved outfits live in `user_outfits`, the worn log in `worn_outfits`.
//! Clothing items are stored as a JSONB array so free-form attributes survive.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{OutfitRepository, RepositoryError};
use crate::domain::wardrobe::{ClothingItem, OutfitRecord, RecordId, WornOutfit};

pub struct PostgresOutfitRepository {
    pool: PgPool,
}

impl PostgresOutfitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(super) fn items_from_row(row: &PgRow) -> Result<Vec<ClothingItem>, RepositoryError> {
    let outfit: serde_json::Value = row.get("outfit");
    serde_json::from_value(outfit)
        .map_err(|e| RepositoryError::Serialization(format!("Failed to deserialize outfit: {}", e)))
}

#[async_trait]
impl OutfitRepository for PostgresOutfitRepository {
    async fn insert_outfit(&self, outfit: &OutfitRecord) -> Result<(), RepositoryError> {
        let items = serde_json::to_value(&outfit.outfit)?;

        sqlx::query(
            r#"
            INSERT INTO user_outfits (id, username, outfit, saved_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(outfit.id.0)
        .bind(&outfit.username)
        .bind(items)
        .bind(outfit.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_outfits(&self, username: &str) -> Result<Vec<OutfitRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, outfit, saved_at
            FROM user_outfits
            WHERE username = $1
            ORDER BY saved_at DESC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OutfitRecord {
                    id: RecordId(row.get("id")),
                    username: row.get("username"),
                    outfit: items_from_row(row)?,
                    timestamp: row.get("saved_at"),
                })
            })
            .collect()
    }

    async fn insert_worn(&self, worn: &WornOutfit) -> Result<(), RepositoryError> {
        let items = serde_json::to_value(&worn.outfit)?;

        sqlx::query(
            r#"
            INSERT INTO worn_outfits (id, username, outfit, occasion, worn_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(worn.id.0)
        .bind(&worn.username)
        .bind(items)
        .bind(worn.occasion.as_deref())
        .bind(worn.worn_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_worn_since(&self, username: &str, since: DateTime<Utc>) -> Result<Vec<WornOutfit>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, outfit, occasion, worn_at
            FROM worn_outfits
            WHERE username = $1 AND worn_at >= $2
            ORDER BY worn_at DESC
            "#,
        )
        .bind(username)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(WornOutfit {
                    id: RecordId(row.get("id")),
                    username: row.get("username"),
                    outfit: items_from_row(row)?,
                    occasion: row.get("occasion"),
                    worn_at: row.get("worn_at"),
                })
            })
            .collect()
    }
}
