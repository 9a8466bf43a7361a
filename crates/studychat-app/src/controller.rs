//! Session lifecycle state machine.
//!
//! The [`SessionController`] owns one widget's session: it asks the store to
//! create or resume it, binds it to the transport room named by the session
//! id, and tears the binding down when the widget closes.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐ initialize ┌──────────────┐  ready   ┌───────┐
//! │ Unbound │───────────>│ Initializing │─────────>│ Bound │
//! └─────────┘            └──────────────┘          └───────┘
//!                          │    ^     ^ initialize     │
//!                   failed │    │     └────────────────┘
//!                          v    │ initialize
//!                        ┌────────┐
//!                        │ Failed │      teardown (any) ──> Closed
//!                        └────────┘
//! ```
//!
//! Every initialization gets a fresh attempt number. Results for an attempt
//! that is no longer current are discarded, so a slow store reply can never
//! rebind a widget that moved on or closed.

use studychat_core::{ChatContext, ChatSession, SessionId};

use crate::WidgetAction;

/// Controller phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Never initialized.
    Unbound,
    /// Waiting for the session store.
    Initializing {
        /// Context being opened.
        context: ChatContext,
        /// Attempt number the store result must carry.
        attempt: u64,
    },
    /// Session bound; sends are accepted.
    Bound {
        /// Bound session.
        session_id: SessionId,
        /// Context the session was opened for.
        context: ChatContext,
        /// Whether the transport room has been joined.
        joined: bool,
    },
    /// Store failed; sends are rejected until a later initialization succeeds.
    Failed {
        /// Context that failed to open.
        context: ChatContext,
        /// Store error text.
        reason: String,
    },
    /// Torn down. Terminal.
    Closed,
}

/// Session lifecycle controller.
#[derive(Debug, Clone)]
pub struct SessionController {
    phase: SessionPhase,
    attempts: u64,
    listening: bool,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    /// Controller with no session.
    pub fn new() -> Self {
        Self { phase: SessionPhase::Unbound, attempts: 0, listening: false }
    }

    /// Start creating or resuming a session for `context`.
    ///
    /// Returns no actions while another initialization is in flight or after
    /// teardown. Re-initializing a bound session leaves its room first.
    pub fn initialize(&mut self, context: ChatContext, connected: bool) -> Vec<WidgetAction> {
        match &self.phase {
            SessionPhase::Closed | SessionPhase::Initializing { .. } => return vec![],
            SessionPhase::Unbound | SessionPhase::Bound { .. } | SessionPhase::Failed { .. } => {},
        }

        let mut actions = Vec::new();
        if !self.listening {
            self.listening = true;
            actions.push(WidgetAction::Subscribe);
        }
        if let (SessionPhase::Bound { session_id, .. }, true) = (&self.phase, connected) {
            actions.push(WidgetAction::LeaveRoom { session_id: session_id.clone() });
        }

        self.attempts += 1;
        let attempt = self.attempts;
        let title = context.title();
        self.phase = SessionPhase::Initializing { context: context.clone(), attempt };

        actions.push(WidgetAction::CreateOrResumeSession { attempt, title, context });
        actions
    }

    /// Bind the session returned by the store.
    ///
    /// Returns `None` if `attempt` is not the initialization in flight; the
    /// caller must then ignore the session entirely.
    pub fn session_ready(
        &mut self,
        attempt: u64,
        session: &ChatSession,
        connected: bool,
    ) -> Option<Vec<WidgetAction>> {
        let SessionPhase::Initializing { context, attempt: current } = &self.phase else {
            return None;
        };
        if *current != attempt {
            return None;
        }

        let context = context.clone();
        self.phase =
            SessionPhase::Bound { session_id: session.id.clone(), context, joined: connected };

        if connected {
            Some(vec![WidgetAction::JoinRoom { session_id: session.id.clone() }])
        } else {
            Some(vec![])
        }
    }

    /// Record a failed initialization. Returns false for stale attempts.
    pub fn session_failed(&mut self, attempt: u64, reason: String) -> bool {
        let SessionPhase::Initializing { context, attempt: current } = &self.phase else {
            return false;
        };
        if *current != attempt {
            return false;
        }

        let context = context.clone();
        self.phase = SessionPhase::Failed { context, reason };
        true
    }

    /// Track transport connectivity for the bound room.
    ///
    /// Joins the room when the transport comes up after the session was
    /// bound offline. A dropped connection forgets its rooms, so the next
    /// reconnect joins again.
    pub fn connection_changed(&mut self, connected: bool) -> Vec<WidgetAction> {
        let SessionPhase::Bound { session_id, joined, .. } = &mut self.phase else {
            return vec![];
        };

        match (connected, *joined) {
            (true, false) => {
                *joined = true;
                vec![WidgetAction::JoinRoom { session_id: session_id.clone() }]
            },
            (false, true) => {
                *joined = false;
                vec![]
            },
            _ => vec![],
        }
    }

    /// Tear down: leave the room if connected, always drop listeners.
    pub fn teardown(&mut self, connected: bool) -> Vec<WidgetAction> {
        let mut actions = Vec::new();
        if let (SessionPhase::Bound { session_id, .. }, true) = (&self.phase, connected) {
            actions.push(WidgetAction::LeaveRoom { session_id: session_id.clone() });
        }
        if self.listening {
            self.listening = false;
            actions.push(WidgetAction::Unsubscribe);
        }

        self.phase = SessionPhase::Closed;
        actions
    }

    /// Bound session. `None` unless in [`SessionPhase::Bound`].
    pub fn bound_session(&self) -> Option<&SessionId> {
        match &self.phase {
            SessionPhase::Bound { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    /// Context of the current or most recent initialization.
    pub fn context(&self) -> Option<&ChatContext> {
        match &self.phase {
            SessionPhase::Initializing { context, .. }
            | SessionPhase::Bound { context, .. }
            | SessionPhase::Failed { context, .. } => Some(context),
            SessionPhase::Unbound | SessionPhase::Closed => None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Number of initializations started.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// True while channel listeners are registered.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// True after teardown.
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }
}
