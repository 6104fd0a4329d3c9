// src/message.rs
// Conversation turn types shared by the controller, server, and stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ContentItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a stored role column. Unknown values fall back to user.
    pub fn parse(s: &str) -> Self {
        if s == "assistant" {
            Role::Assistant
        } else {
            Role::User
        }
    }
}

/// One turn of the conversation.
///
/// Owned by the in-memory conversation during a session and mirrored, one
/// row per turn, in the chat history store. `recommended_content` only ever
/// exists in memory - reloaded history carries the text alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_content: Option<Vec<ContentItem>>,
}

impl ChatMessage {
    pub fn user(content: String) -> Self {
        Self::new(Role::User, content, None)
    }

    pub fn assistant(content: String, recommended_content: Option<Vec<ContentItem>>) -> Self {
        Self::new(Role::Assistant, content, recommended_content)
    }

    fn new(role: Role, content: String, recommended_content: Option<Vec<ContentItem>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            created_at: Utc::now(),
            recommended_content,
        }
    }
}

/// Events emitted to the UI while a turn is being answered.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Incremental text fragment, in arrival order
    Fragment(String),
    /// Stream finished cleanly; carries the full assistant message
    Completed(ChatMessage),
    /// The turn failed; `message` is the user-facing text
    Error { message: String },
}
