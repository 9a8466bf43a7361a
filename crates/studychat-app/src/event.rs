//! Widget input events.
//!
//! This module defines [`WidgetEvent`], the asynchronous inputs that drive
//! the [`crate::ChatWidget`] state machine. User intents (open, send, close)
//! are direct method calls on the widget; events are what comes back from
//! the collaborators.
//!
//! Events originate from three sources:
//! - Session store results (initialization and fallback round trips).
//! - Transport notifications (raw channel frames, connection changes).
//! - Clock ticks.

use chrono::{DateTime, Utc};
use studychat_core::{ChannelFrame, ChatSession, FallbackReply, SessionId, StoreError};

/// Events processed by the widget state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// Session store created or resumed a session.
    SessionReady {
        /// Attempt this result answers.
        attempt: u64,
        /// The session, including persisted history.
        session: ChatSession,
        /// Transport connection state when the result arrived.
        connected: bool,
    },

    /// Session store failed to create or resume a session.
    SessionFailed {
        /// Attempt this result answers.
        attempt: u64,
        /// What went wrong.
        error: StoreError,
    },

    /// Transport connection state changed.
    ConnectionChanged {
        /// New state.
        connected: bool,
    },

    /// Raw frame from the widget's channel subscription.
    Frame {
        /// Unvalidated frame.
        frame: ChannelFrame,
        /// Receipt time, used when the payload carries no usable timestamp.
        received_at: DateTime<Utc>,
    },

    /// Fallback round trip succeeded.
    FallbackReplied {
        /// Session the send was for.
        session_id: SessionId,
        /// Assistant reply.
        reply: FallbackReply,
        /// Receipt time, used when the reply carries no timestamp.
        received_at: DateTime<Utc>,
    },

    /// Fallback round trip failed.
    FallbackFailed {
        /// Session the send was for.
        session_id: SessionId,
        /// What went wrong.
        error: StoreError,
    },

    /// Periodic tick.
    Tick {
        /// Current time.
        now: DateTime<Utc>,
    },
}
