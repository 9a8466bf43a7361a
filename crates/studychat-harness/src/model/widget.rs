//! Reference model of one widget and its backend.
//!
//! The model is the oracle against which the real runtime is verified. It
//! tracks only what a user can observe, plus the backend state needed to
//! predict resumed histories and replies.

use std::collections::HashMap;

use studychat_app::ChatWidget;
use studychat_core::Role;

use super::operation::{ModelContext, Operation};
use crate::MessageSnapshot;

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Timeline contents.
    pub messages: Vec<MessageSnapshot>,
    /// A session is bound.
    pub bound: bool,
    /// A send awaits confirmation.
    pub pending: bool,
    /// Typing indicator shown.
    pub typing: bool,
    /// Widget closed.
    pub closed: bool,
    /// Frames rejected so far.
    pub discarded_frames: u64,
}

impl ObservableState {
    /// Observe a real widget.
    pub fn of(widget: &ChatWidget) -> Self {
        Self {
            messages: widget.messages().iter().map(MessageSnapshot::from).collect(),
            bound: widget.is_ready(),
            pending: widget.is_pending(),
            typing: widget.is_typing(),
            closed: widget.is_closed(),
            discarded_frames: widget.discarded_frames(),
        }
    }
}

/// Reply the simulated backend produces for `text`.
pub fn model_reply(text: &str) -> String {
    format!("Re: {text}")
}

/// Model widget - the reference implementation.
///
/// Assumes the runtime notices connectivity changes immediately, so the
/// widget's room is joined exactly when it is bound and connected.
#[derive(Debug, Clone)]
pub struct ModelWidget {
    connected: bool,
    listening: bool,
    closed: bool,
    context: Option<ModelContext>,
    session: Option<ModelContext>,
    messages: Vec<MessageSnapshot>,
    pending: bool,
    typing: bool,
    discarded_frames: u64,
    create_faults: u32,
    fallback_faults: u32,
    /// Persisted history per context.
    store: HashMap<ModelContext, Vec<MessageSnapshot>>,
    /// Real-time emits not yet processed by the server.
    outbox: Vec<(ModelContext, String)>,
}

impl ModelWidget {
    /// Fresh widget; `connected` is the initial transport state.
    pub fn new(connected: bool) -> Self {
        Self {
            connected,
            listening: false,
            closed: false,
            context: None,
            session: None,
            messages: Vec::new(),
            pending: false,
            typing: false,
            discarded_frames: 0,
            create_faults: 0,
            fallback_faults: 0,
            store: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    /// Apply an operation.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Open { context } => self.open(*context),
            Operation::Send { text } => self.send(&text.to_text()),
            Operation::QuickAction { index } => {
                let prompt = self
                    .context
                    .filter(|_| !self.closed)
                    .and_then(|ctx| ctx.context_type().quick_actions().get(usize::from(*index)))
                    .map(|action| action.prompt);
                if let Some(prompt) = prompt {
                    self.send(prompt);
                }
            },
            Operation::Connect => self.connected = true,
            Operation::Disconnect => {
                // A dropped connection loses the room, so an unconfirmed
                // real-time send fails.
                if self.connected && self.pending {
                    self.pending = false;
                    self.typing = false;
                }
                self.connected = false;
            },
            Operation::DeliverPending => self.deliver(),
            Operation::InjectForeignMessage | Operation::InjectMalformed => {
                if self.listening {
                    self.discarded_frames += 1;
                }
            },
            Operation::InjectTyping { is_typing } => {
                if !self.listening {
                    return;
                }
                if self.session.is_some() {
                    self.typing = *is_typing;
                } else {
                    self.discarded_frames += 1;
                }
            },
            Operation::FailNextCreate => self.create_faults += 1,
            Operation::FailNextFallback => self.fallback_faults += 1,
            Operation::AdvanceTime { .. } => {},
            Operation::Close => self.close(),
        }
    }

    fn open(&mut self, context: ModelContext) {
        if self.closed {
            return;
        }

        self.listening = true;
        self.context = Some(context);
        self.pending = false;
        self.typing = false;

        if self.create_faults > 0 {
            self.create_faults -= 1;
            self.session = None;
            self.messages.clear();
        } else {
            self.session = Some(context);
            self.messages = self.store.get(&context).cloned().unwrap_or_default();
        }
    }

    fn send(&mut self, text: &str) {
        let text = text.trim();
        let Some(session) = self.session else {
            return;
        };
        if self.closed || text.is_empty() || self.pending {
            return;
        }

        self.messages.push(user(text));
        if self.connected {
            self.pending = true;
            self.outbox.push((session, text.to_string()));
        } else if self.fallback_faults > 0 {
            self.fallback_faults -= 1;
        } else {
            let history = self.store.entry(session).or_default();
            history.push(user(text));
            history.push(assistant(&model_reply(text)));
            self.messages.push(assistant(&model_reply(text)));
        }
    }

    fn deliver(&mut self) {
        for (session, text) in std::mem::take(&mut self.outbox) {
            let reply = model_reply(&text);
            let history = self.store.entry(session).or_default();
            history.push(user(&text));
            history.push(assistant(&reply));

            let visible = self.connected && self.listening && self.session == Some(session);
            if visible {
                self.messages.push(assistant(&reply));
                self.pending = false;
                self.typing = false;
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.listening = false;
        self.context = None;
        self.session = None;
        self.pending = false;
        self.typing = false;
    }

    /// Observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            messages: self.messages.clone(),
            bound: self.session.is_some(),
            pending: self.pending,
            typing: self.typing,
            closed: self.closed,
            discarded_frames: self.discarded_frames,
        }
    }

    /// Persisted history of a context.
    pub fn history(&self, context: ModelContext) -> &[MessageSnapshot] {
        self.store.get(&context).map_or(&[], Vec::as_slice)
    }
}

fn user(text: &str) -> MessageSnapshot {
    MessageSnapshot { role: Role::User, content: text.to_string() }
}

fn assistant(text: &str) -> MessageSnapshot {
    MessageSnapshot { role: Role::Assistant, content: text.to_string() }
}
