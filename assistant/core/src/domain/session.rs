// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chat Session Aggregate
//!
//! A session is one conversation between a user and the assistant. It owns
//! the ordered transcript of user and assistant turns; tool traffic never
//! lands here, only the final reply of each agent run.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Session identity, ownership and transcript ordering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl SessionMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Full session document as returned by `GET /sessions/{id}`.
///
/// `user_id` carries the owner's username, and the id serializes as `_id`
/// so the JSON shape matches what the web client already consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(rename = "_id")]
    pub id: SessionId,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
}

impl ChatSession {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            user_id: owner.into(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    pub fn is_owned_by(&self, username: &str) -> bool {
        self.user_id == username
    }

    /// Build the user/assistant pair recorded after a successful agent run.
    pub fn exchange(user_input: &str, reply: &str) -> [SessionMessage; 2] {
        [SessionMessage::user(user_input), SessionMessage::assistant(reply)]
    }

    pub fn append_exchange(&mut self, user_input: &str, reply: &str) {
        self.messages.extend(Self::exchange(user_input, reply));
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            user_id: self.user_id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Session listing entry, transcript excluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(rename = "_id")]
    pub id: SessionId,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}
