//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of widgets at a point in time.
//! Invariants operate on snapshots rather than live state so checks are
//! consistent, and so transition invariants can compare a widget against its
//! own previous snapshot.

use serde::Serialize;
use studychat_app::ChatWidget;
use studychat_core::{Message, Role, SessionId};

/// Snapshot of the entire system state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemSnapshot {
    /// Per-widget state snapshots.
    pub widgets: Vec<WidgetSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no widgets).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single widget.
    pub fn single(widget: WidgetSnapshot) -> Self {
        Self { widgets: vec![widget] }
    }

    /// Create a snapshot from multiple widgets.
    pub fn from_widgets(widgets: Vec<WidgetSnapshot>) -> Self {
        Self { widgets }
    }
}

/// One timeline entry, without timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSnapshot {
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl From<&Message> for MessageSnapshot {
    fn from(message: &Message) -> Self {
        Self { role: message.role, content: message.content.clone() }
    }
}

/// Snapshot of a single widget's observable state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WidgetSnapshot {
    /// Widget identifier.
    pub id: u64,
    /// Initializations started so far.
    pub attempts: u64,
    /// Bound session. `None` if not ready.
    pub session_id: Option<SessionId>,
    /// Session of the outstanding send. `None` if idle.
    pub pending: Option<SessionId>,
    /// Typing indicator shown.
    pub typing: bool,
    /// Widget closed.
    pub closed: bool,
    /// Frames rejected so far.
    pub discarded_frames: u64,
    /// Timeline contents.
    pub messages: Vec<MessageSnapshot>,
    /// Snapshot taken before the last step, for transition checks.
    #[serde(skip)]
    pub previous: Option<Box<WidgetSnapshot>>,
}

impl WidgetSnapshot {
    /// Create a new widget snapshot.
    pub fn new(id: u64) -> Self {
        Self { id, ..Default::default() }
    }

    /// Capture a widget.
    pub fn capture(id: u64, widget: &ChatWidget) -> Self {
        Self {
            id,
            attempts: widget.attempts(),
            session_id: widget.session_id().cloned(),
            pending: widget.pending().map(|p| p.session_id.clone()),
            typing: widget.is_typing(),
            closed: widget.is_closed(),
            discarded_frames: widget.discarded_frames(),
            messages: widget.messages().iter().map(MessageSnapshot::from).collect(),
            previous: None,
        }
    }

    /// Capture a widget after a step, remembering this snapshot as its
    /// predecessor.
    #[must_use]
    pub fn step(self, widget: &ChatWidget) -> Self {
        let id = self.id;
        let mut next = Self::capture(id, widget);
        next.previous = Some(Box::new(Self { previous: None, ..self }));
        next
    }

    /// Set the bound session.
    #[must_use]
    pub fn with_session(mut self, session_id: Option<SessionId>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Set the pending session.
    #[must_use]
    pub fn with_pending(mut self, pending: Option<SessionId>) -> Self {
        self.pending = pending;
        self
    }

    /// Append a message.
    #[must_use]
    pub fn with_message(mut self, role: Role, content: &str) -> Self {
        self.messages.push(MessageSnapshot { role, content: content.to_string() });
        self
    }

    /// Set the previous snapshot.
    #[must_use]
    pub fn with_previous(mut self, previous: WidgetSnapshot) -> Self {
        self.previous = Some(Box::new(previous));
        self
    }
}
