//! Widget side-effects and intents.
//!
//! This module defines the [`WidgetAction`] enum, which represents
//! instructions produced by the [`crate::ChatWidget`] state machine for the
//! runtime to execute.

use studychat_core::{ChatContext, SessionId};

/// Actions produced by the widget state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetAction {
    /// Visible state changed; redraw.
    Render,

    /// Register the widget's channel listeners.
    Subscribe,

    /// Remove the widget's channel listeners.
    Unsubscribe,

    /// Ask the session store to create or resume a session.
    CreateOrResumeSession {
        /// Initialization attempt. Echoed back in the result event.
        attempt: u64,
        /// Session title derived from the context type.
        title: &'static str,
        /// Context the session is for.
        context: ChatContext,
    },

    /// Join the transport room for a session.
    JoinRoom {
        /// Room to join.
        session_id: SessionId,
    },

    /// Leave the transport room for a session.
    LeaveRoom {
        /// Room to leave.
        session_id: SessionId,
    },

    /// Send user text over the real-time channel.
    EmitRealtime {
        /// Target session.
        session_id: SessionId,
        /// Trimmed user text.
        text: String,
    },

    /// Send user text via the request/response fallback.
    RequestFallback {
        /// Target session.
        session_id: SessionId,
        /// Trimmed user text.
        text: String,
    },
}

impl WidgetAction {
    /// True for actions that must be awaited (store round trips).
    pub fn is_async(&self) -> bool {
        matches!(self, Self::CreateOrResumeSession { .. } | Self::RequestFallback { .. })
    }
}
