//! Chat sessions and the context they are scoped to.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Message, error::ParseContextError};

/// Server-issued session identity.
///
/// Opaque to the engine. Also names the transport room the session's events
/// are published to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a server-issued id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a session is about.
///
/// Fixed for the lifetime of a session. Determines the session title and the
/// quick-action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// A single topic page.
    Topic,
    /// A module grouping several topics.
    Module,
    /// A learning path spanning modules.
    LearningPath,
    /// Free-form conversation.
    General,
}

const TOPIC_ACTIONS: &[QuickAction] = &[
    QuickAction::new("Simplify", "Can you explain this topic in simpler terms?"),
    QuickAction::new("Example", "Can you give me a practical example of this topic?"),
    QuickAction::new("Quiz me", "Can you quiz me on this topic?"),
];

const MODULE_ACTIONS: &[QuickAction] = &[
    QuickAction::new("Summarize", "Can you summarize the key points of this module?"),
    QuickAction::new("Study plan", "How should I approach studying this module?"),
];

const LEARNING_PATH_ACTIONS: &[QuickAction] = &[
    QuickAction::new("Next step", "What should I focus on next in this learning path?"),
    QuickAction::new("Progress", "How am I progressing through this learning path?"),
];

impl ContextType {
    /// All context types, in display order.
    pub const ALL: [Self; 4] = [Self::Topic, Self::Module, Self::LearningPath, Self::General];

    /// Human-readable session title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Topic => "Topic Discussion",
            Self::Module => "Module Assistance",
            Self::LearningPath => "Learning Path Guidance",
            Self::General => "General AI Chat",
        }
    }

    /// Quick-action menu for this context. Empty for general chat.
    pub fn quick_actions(self) -> &'static [QuickAction] {
        match self {
            Self::Topic => TOPIC_ACTIONS,
            Self::Module => MODULE_ACTIONS,
            Self::LearningPath => LEARNING_PATH_ACTIONS,
            Self::General => &[],
        }
    }

    /// Wire name (`topic`, `module`, `learning_path`, `general`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Module => "module",
            Self::LearningPath => "learning_path",
            Self::General => "general",
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextType {
    type Err = ParseContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ctx| ctx.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseContextError(s.to_string()))
    }
}

/// Canned prompt offered for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    /// Short button label.
    pub label: &'static str,
    /// Text sent when the action is selected.
    pub prompt: &'static str,
}

impl QuickAction {
    const fn new(label: &'static str, prompt: &'static str) -> Self {
        Self { label, prompt }
    }
}

/// The subject a session is opened for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    /// Kind of subject.
    pub context_type: ContextType,
    /// Foreign reference to the subject. `None` for general chat.
    pub context_id: Option<String>,
}

impl ChatContext {
    /// Context for the given type and subject.
    pub fn new(context_type: ContextType, context_id: Option<String>) -> Self {
        Self { context_type, context_id }
    }

    /// Free-form context with no subject.
    pub fn general() -> Self {
        Self::new(ContextType::General, None)
    }

    /// Title derived from the context type.
    pub fn title(&self) -> &'static str {
        self.context_type.title()
    }
}

/// A conversation as returned by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Server-issued identity.
    pub id: SessionId,
    /// Kind of subject. Immutable.
    pub context_type: ContextType,
    /// Foreign reference to the subject.
    pub context_id: Option<String>,
    /// Persisted history, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ChatSession {
    /// Context this session was opened for.
    pub fn context(&self) -> ChatContext {
        ChatContext::new(self.context_type, self.context_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_fixed_per_context() {
        assert_eq!(ContextType::General.title(), "General AI Chat");
        assert_eq!(ContextType::Topic.title(), "Topic Discussion");
        assert_eq!(ContextType::Module.title(), "Module Assistance");
        assert_eq!(ContextType::LearningPath.title(), "Learning Path Guidance");
    }

    #[test]
    fn general_has_no_quick_actions() {
        assert!(ContextType::General.quick_actions().is_empty());
        for ctx in [ContextType::Topic, ContextType::Module, ContextType::LearningPath] {
            assert!(!ctx.quick_actions().is_empty(), "{ctx} should offer quick actions");
        }
    }

    #[test]
    fn topic_offers_simplify_prompt() {
        assert!(
            ContextType::Topic
                .quick_actions()
                .iter()
                .any(|a| a.prompt == "Can you explain this topic in simpler terms?")
        );
    }

    #[test]
    fn context_type_parses_wire_names() {
        for ctx in ContextType::ALL {
            assert_eq!(ctx.as_str().parse::<ContextType>(), Ok(ctx));
        }
        assert_eq!(" Learning_Path ".parse::<ContextType>(), Ok(ContextType::LearningPath));
        assert!("course".parse::<ContextType>().is_err());
    }

    #[test]
    fn context_type_serde_matches_wire_names() {
        for ctx in ContextType::ALL {
            assert_eq!(serde_json::to_value(ctx).ok(), Some(serde_json::json!(ctx.as_str())));
        }
    }

    #[test]
    fn session_deserializes_without_messages() {
        let json = serde_json::json!({
            "id": "s1",
            "contextType": "topic",
            "contextId": "rust-ownership",
        });
        let session: ChatSession = serde_json::from_value(json).unwrap();

        assert_eq!(session.id, SessionId::new("s1"));
        assert!(session.messages.is_empty());
        assert_eq!(
            session.context(),
            ChatContext::new(ContextType::Topic, Some("rust-ownership".into()))
        );
    }
}
