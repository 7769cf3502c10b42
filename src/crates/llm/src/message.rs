//! Conversation messages exchanged with chat models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions that frame the conversation.
    System,

    /// End-user input.
    #[serde(alias = "user")]
    Human,

    /// Model output.
    #[serde(alias = "ai", alias = "model")]
    Assistant,
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Role of the message sender
    #[serde(alias = "type")]
    pub role: MessageRole,

    /// Message text
    pub content: String,
}

impl Message {
    /// Create a new message with a fresh id.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a human message
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Set the message ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Message text.
    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn is_human(&self) -> bool {
        self.role == MessageRole::Human
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors_assign_ids() {
        let a = Message::human("hi");
        let b = Message::human("hi");
        assert!(a.id.is_some());
        assert_ne!(a.id, b.id);
        assert!(a.is_human());
        assert!(Message::assistant("hello").is_assistant());
    }

    #[test]
    fn test_role_aliases() {
        let msg: Message = serde_json::from_value(json!({"role": "user", "content": "q"})).unwrap();
        assert_eq!(msg.role, MessageRole::Human);
        assert_eq!(msg.id, None);

        let msg: Message = serde_json::from_value(json!({"type": "ai", "content": "a", "id": "m1"})).unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_serialized_shape() {
        let msg = Message::system("rules").with_id("s1");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"id": "s1", "role": "system", "content": "rules"})
        );
    }
}
