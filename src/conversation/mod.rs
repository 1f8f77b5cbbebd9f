//! Conversation data model
//!
//! Messages are immutable once created. The transcript only grows, except
//! for a wholesale reset back to a single greeting.

mod envelope;

pub use envelope::{Itinerary, ReplyAction, ReplyEnvelope};

use serde::{Deserialize, Serialize};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Create a user-authored message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant-authored message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered conversation history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Start a transcript with the assistant's greeting
    #[must_use]
    pub fn with_greeting(greeting: &str) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
        }
    }

    /// Append a message at the end
    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_starts_with_greeting() {
        let transcript = Transcript::with_greeting("Hi there");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role(), Role::Assistant);
        assert_eq!(transcript.messages()[0].content(), "Hi there");
    }

    #[test]
    fn transcript_keeps_insertion_order() {
        let mut transcript = Transcript::with_greeting("Hi");
        transcript.push(Message::user("one"));
        transcript.push(Message::assistant("two"));

        let contents: Vec<_> = transcript.messages().iter().map(Message::content).collect();
        assert_eq!(contents, ["Hi", "one", "two"]);
        assert_eq!(transcript.last().map(Message::role), Some(Role::Assistant));
    }

    #[test]
    fn message_serializes_with_lowercase_role() {
        let json = serde_json::to_value(Message::user("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));
    }
}
