// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

use crate::domain::llm::LlmMessage;
use crate::domain::session::{MessageRole, SessionMessage};

pub const DEFAULT_MEMORY_WINDOW: usize = 15;

/// A remembered conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContent {
    pub role: MessageRole,
    pub content: String,
    pub mime_type: String,
}

/// Recent transcript handed to an agent when it is (re)built for a session.
///
/// The memory is fixed at construction. Turns produced while the agent stays
/// cached live in the agent's own model context instead.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    entries: Vec<MemoryContent>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the `window` most recent messages, oldest first.
    pub fn from_history(history: &[SessionMessage], window: usize) -> Self {
        let mut sorted: Vec<&SessionMessage> = history.iter().collect();
        sorted.sort_by_key(|m| m.timestamp);
        let skip = sorted.len().saturating_sub(window);

        let entries = sorted
            .into_iter()
            .skip(skip)
            .map(|m| MemoryContent {
                role: m.role,
                content: m.content.clone(),
                mime_type: "text/plain".to_string(),
            })
            .collect();

        Self { entries }
    }

    pub fn add(&mut self, content: MemoryContent) {
        self.entries.push(content);
    }

    pub fn entries(&self) -> &[MemoryContent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let mut out = String::from("Relevant memory content (in chronological order):\n");
        for (idx, entry) in self.entries.iter().enumerate() {
            out.push_str(&format!("{}. [{}] {}\n", idx + 1, entry.role, entry.content));
        }
        Some(out.trim_end().to_string())
    }

    /// Memory as a system message for the model context, if there is any.
    pub fn as_context_message(&self) -> Option<LlmMessage> {
        self.render().map(LlmMessage::system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn msg(role: MessageRole, content: &str, offset_secs: i64) -> SessionMessage {
        SessionMessage {
            role,
            content: content.to_string(),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_window_keeps_latest_in_order() {
        let history: Vec<SessionMessage> = (0..20)
            .rev()
            .map(|i| msg(MessageRole::User, &format!("m{}", i), i))
            .collect();

        let memory = ConversationMemory::from_history(&history, 15);
        assert_eq!(memory.len(), 15);
        assert_eq!(memory.entries()[0].content, "m5");
        assert_eq!(memory.entries()[14].content, "m19");
    }

    #[test]
    fn test_render_numbers_entries() {
        let history = vec![
            msg(MessageRole::User, "I own a red hoodie", 0),
            msg(MessageRole::Assistant, "Noted!", 1),
        ];
        let rendered = ConversationMemory::from_history(&history, 15).render().unwrap();
        assert!(rendered.starts_with("Relevant memory content (in chronological order):"));
        assert!(rendered.contains("1. [user] I own a red hoodie"));
        assert!(rendered.contains("2. [assistant] Noted!"));
    }

    #[test]
    fn test_empty_memory_renders_nothing() {
        assert!(ConversationMemory::new().as_context_message().is_none());
    }
}
