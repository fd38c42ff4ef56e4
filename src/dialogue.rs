//! Per-session conversation history.
//!
//! The history is the ordered role-tagged transcript handed to the
//! dialogue collaborator on every reply. It is seeded with a system
//! persona message and only ever grows; suppressed transcriptions are
//! filtered out before they reach it.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    /// Start a fresh history seeded with the persona system message.
    pub fn new(persona: &str) -> Self {
        Self {
            messages: vec![Message {
                role: Role::System,
                content: persona.to_string(),
            }],
        }
    }

    pub fn push_user(&mut self, content: &str) {
        self.messages.push(Message {
            role: Role::User,
            content: content.to_string(),
        });
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: content.to_string(),
        });
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
}
