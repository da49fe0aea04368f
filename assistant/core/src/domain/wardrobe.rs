// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wardrobe records
//!
//! Clothing items as the assistant extracts them from conversation, plus the
//! three record kinds the tools persist: saved outfits, worn-outfit log
//! entries and outfit feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One garment. The model fills these in freely, so only `type`, `color` and
/// `style` are interpreted; anything else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClothingItem {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClothingItem {
    pub fn new(item_type: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            item_type: Some(item_type.into()),
            color: Some(color.into()),
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// `"red hoodie (streetwear)"`, with `unknown`/`item` standing in for
    /// missing color/type.
    pub fn describe(&self) -> String {
        let mut desc = format!(
            "{} {}",
            self.color.as_deref().unwrap_or("unknown"),
            self.item_type.as_deref().unwrap_or("item")
        );
        if let Some(style) = &self.style {
            desc.push_str(&format!(" ({})", style));
        }
        desc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

/// An outfit the user asked the assistant to remember.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitRecord {
    pub id: RecordId,
    pub username: String,
    pub outfit: Vec<ClothingItem>,
    pub timestamp: DateTime<Utc>,
}

impl OutfitRecord {
    pub fn new(username: impl Into<String>, outfit: Vec<ClothingItem>) -> Self {
        Self {
            id: RecordId::new(),
            username: username.into(),
            outfit,
            timestamp: Utc::now(),
        }
    }
}

/// An outfit the user reports having actually worn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WornOutfit {
    pub id: RecordId,
    pub username: String,
    pub outfit: Vec<ClothingItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    pub worn_at: DateTime<Utc>,
}

impl WornOutfit {
    pub fn new(username: impl Into<String>, outfit: Vec<ClothingItem>, occasion: Option<String>) -> Self {
        Self {
            id: RecordId::new(),
            username: username.into(),
            outfit,
            occasion,
            worn_at: Utc::now(),
        }
    }
}

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitFeedback {
    pub id: RecordId,
    pub username: String,
    pub outfit: Vec<ClothingItem>,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("rating must be between {MIN_RATING} and {MAX_RATING}, got {0}")]
pub struct InvalidRating(pub i64);

impl OutfitFeedback {
    pub fn new(
        username: impl Into<String>,
        outfit: Vec<ClothingItem>,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Self, InvalidRating> {
        if rating < MIN_RATING as i64 || rating > MAX_RATING as i64 {
            return Err(InvalidRating(rating));
        }
        Ok(Self {
            id: RecordId::new(),
            username: username.into(),
            outfit,
            rating: rating as u8,
            comment,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_fills_missing_fields() {
        let item: ClothingItem = serde_json::from_value(serde_json::json!({"type": "hoodie"})).unwrap();
        assert_eq!(item.describe(), "unknown hoodie");

        let item = ClothingItem::new("jeans", "blue").with_style("slim");
        assert_eq!(item.describe(), "blue jeans (slim)");
    }

    #[test]
    fn test_extra_attributes_survive() {
        let raw = serde_json::json!({"type": "coat", "color": "black", "material": "wool"});
        let item: ClothingItem = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.extra.get("material").unwrap(), "wool");
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn test_feedback_rating_bounds() {
        assert!(OutfitFeedback::new("ada", vec![], 0, None).is_err());
        assert!(OutfitFeedback::new("ada", vec![], 6, None).is_err());
        assert_eq!(OutfitFeedback::new("ada", vec![], 5, None).unwrap().rating, 5);
    }
}
