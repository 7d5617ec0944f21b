//! Bounded conversation memory.
//!
//! [`ConversationMemory`] keeps messages oldest-first and evicts from the
//! front after every insert: first down to `max_messages`, then while the
//! estimated token count exceeds `max_tokens`, never below two messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::chunker::CHARS_PER_TOKEN;

/// Fewest messages token-pressure eviction will leave behind.
const MIN_RETAINED: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    /// Transient tool output; never rendered into prompts.
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    messages: VecDeque<Message>,
    total_chars: usize,
    max_messages: usize,
    max_tokens: usize,
}

impl ConversationMemory {
    pub fn new(max_messages: usize, max_tokens: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            total_chars: 0,
            max_messages: max_messages.max(1),
            max_tokens,
        }
    }

    pub fn add_user(&mut self, content: impl Into<String>) {
        self.push(Message::new(Role::User, content));
    }

    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::new(Role::Assistant, content));
    }

    pub fn add_system(&mut self, content: impl Into<String>) {
        self.push(Message::new(Role::System, content));
    }

    pub fn push(&mut self, message: Message) {
        self.total_chars += message.char_len();
        self.messages.push_back(message);
        self.evict();
    }

    fn evict(&mut self) {
        while self.messages.len() > self.max_messages {
            self.pop_oldest();
        }
        while self.estimated_tokens() > self.max_tokens && self.messages.len() > MIN_RETAINED {
            self.pop_oldest();
        }
    }

    fn pop_oldest(&mut self) {
        if let Some(evicted) = self.messages.pop_front() {
            self.total_chars -= evicted.char_len();
            tracing::trace!(role = %evicted.role, "evicted message");
        }
    }

    /// All retained messages, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// User and assistant turns as `role: content` blocks separated by blank lines.
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::new();
        for message in self
            .messages
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        {
            out.push_str(message.role.as_str());
            out.push_str(": ");
            out.push_str(&message.content);
            out.push_str("\n\n");
        }
        out
    }

    pub fn estimated_tokens(&self) -> usize {
        self.total_chars / CHARS_PER_TOKEN
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.total_chars = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_beyond_message_cap() {
        let mut memory = ConversationMemory::new(4, 10_000);
        for i in 0..7 {
            memory.add_user(format!("message {i}"));
        }
        let history = memory.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "message 3");
        assert_eq!(history[3].content, "message 6");
    }

    #[test]
    fn token_pressure_never_drops_below_two() {
        let mut memory = ConversationMemory::new(10, 5);
        memory.add_user("a".repeat(400));
        memory.add_assistant("b".repeat(400));
        memory.add_user("c".repeat(400));
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.history()[0].content, "b".repeat(400));
    }

    #[test]
    fn token_pressure_evicts_until_under_budget() {
        let mut memory = ConversationMemory::new(10, 30);
        for _ in 0..5 {
            memory.add_user("x".repeat(40)); // 10 tokens each
        }
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.estimated_tokens(), 30);
    }

    #[test]
    fn prompt_format_skips_system_messages() {
        let mut memory = ConversationMemory::new(10, 4000);
        memory.add_user("What is Embabel?");
        memory.add_system("Found 1 relevant documents");
        memory.add_assistant("A JVM agent framework.");
        assert_eq!(
            memory.format_for_prompt(),
            "user: What is Embabel?\n\nassistant: A JVM agent framework.\n\n"
        );
    }

    #[test]
    fn clear_resets_counters() {
        let mut memory = ConversationMemory::new(10, 4000);
        memory.add_user("hello there");
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.estimated_tokens(), 0);
        assert!(memory.last().is_none());
    }
}
