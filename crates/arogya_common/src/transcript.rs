//! Session transcript.
//!
//! Owned by whoever runs the conversation (the CLI chat loop, a web client).
//! The resolver never reads it: every turn is resolved on its own.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "you"),
            Self::Assistant => write!(f, "arogya"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Ordered list of messages for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, content: &str) {
        self.messages.push(Message {
            role,
            content: content.to_string(),
        });
    }

    /// Record one user question and its answer
    pub fn push_turn(&mut self, query: &str, answer: &str) {
        self.push(Role::User, query);
        self.push(Role::Assistant, answer);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_turn() {
        let mut t = Transcript::new();
        assert!(t.is_empty());
        t.push_turn("hi", "Hello!");
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].role, Role::User);
        assert_eq!(t.messages()[1].content, "Hello!");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "you");
        assert_eq!(Role::Assistant.to_string(), "arogya");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut t = Transcript::new();
        t.push_turn("what is dengue", "Dengue is a viral infection.");
        t.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"role\": \"assistant\""));
        assert_eq!(Transcript::load(&path).unwrap(), t);
    }
}
