//! Timeline entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message.
///
/// The engine only knows two producers. System or tool messages never enter
/// the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Written by the person using the widget.
    User,
    /// Produced by the assistant backend.
    Assistant,
}

/// A message in a session timeline.
///
/// Messages are immutable once appended. Content is opaque to the engine and
/// only ever handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// Text body.
    pub content: String,
    /// Producer-assigned creation time.
    ///
    /// Client clock for optimistic user echoes, server clock for everything
    /// else.
    pub timestamp: DateTime<Utc>,
    /// Opaque payload attached by the assistant producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    /// User message stamped with the given time.
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { role: Role::User, content: content.into(), timestamp, metadata: None }
    }

    /// Assistant message with optional metadata.
    pub fn assistant(
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp, metadata }
    }

    /// True if this message was written by the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Reply to a fallback (request/response) send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackReply {
    /// Assistant reply text.
    pub content: String,
    /// Opaque assistant metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Server timestamp. `None` if the store did not provide one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl FallbackReply {
    /// Reply with content only.
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: None, timestamp: None }
    }

    /// Convert into an assistant message, stamping it with `received_at` if
    /// the store did not supply a timestamp.
    pub fn into_message(self, received_at: DateTime<Utc>) -> Message {
        Message::assistant(self.content, self.timestamp.unwrap_or(received_at), self.metadata)
    }
}
