//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to one widget: user
//! intents, connectivity changes, server-side delivery, stray frames and
//! injected failures. They are generated randomly by proptest and applied to
//! both the model and the real runtime.

use arbitrary::Arbitrary;
use studychat_core::{ChatContext, ContextType};

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Open (or switch) the widget to a context.
    Open {
        /// Context to open.
        context: ModelContext,
    },

    /// User sends text.
    Send {
        /// Text (may be blank).
        text: SmallText,
    },

    /// User picks a quick action.
    QuickAction {
        /// Menu index (may be out of range).
        index: u8,
    },

    /// Transport comes up.
    Connect,

    /// Transport goes down.
    Disconnect,

    /// Server processes queued real-time emits.
    DeliverPending,

    /// A message for a session this process never opened arrives.
    InjectForeignMessage,

    /// An unscoped typing event arrives.
    InjectTyping {
        /// Indicator value.
        is_typing: bool,
    },

    /// A frame with an unusable payload arrives.
    InjectMalformed,

    /// The next create-or-resume call fails.
    FailNextCreate,

    /// The next fallback send fails.
    FailNextFallback,

    /// Advance simulated time.
    AdvanceTime {
        /// Seconds to advance.
        secs: u8,
    },

    /// Close the widget.
    Close,
}

/// Contexts used in model tests.
///
/// Two topics share a context type so switching between them exercises
/// cross-session isolation within one quick-action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
pub enum ModelContext {
    /// Topic `ownership`.
    TopicA,
    /// Topic `lifetimes`.
    TopicB,
    /// Module `m1`.
    Module,
    /// Learning path `p1`.
    LearningPath,
    /// General chat.
    General,
}

impl ModelContext {
    /// Context type.
    pub fn context_type(self) -> ContextType {
        match self {
            Self::TopicA | Self::TopicB => ContextType::Topic,
            Self::Module => ContextType::Module,
            Self::LearningPath => ContextType::LearningPath,
            Self::General => ContextType::General,
        }
    }

    /// Real context.
    pub fn to_context(self) -> ChatContext {
        let id = match self {
            Self::TopicA => Some("ownership"),
            Self::TopicB => Some("lifetimes"),
            Self::Module => Some("m1"),
            Self::LearningPath => Some("p1"),
            Self::General => None,
        };
        ChatContext::new(self.context_type(), id.map(str::to_string))
    }
}

/// Small message content for testing.
#[derive(Debug, Clone, Arbitrary)]
pub enum SmallText {
    /// Whitespace only; always rejected.
    Blank,
    /// Deterministic short text from a seed.
    Word(u8),
}

impl SmallText {
    /// Text as typed by the user.
    pub fn to_text(&self) -> String {
        match self {
            Self::Blank => " \t ".to_string(),
            Self::Word(seed) => format!("  question {seed} "),
        }
    }
}
