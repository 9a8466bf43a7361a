//! Delivery dispatcher.
//!
//! Decides per outgoing message which channel carries it and owns the
//! pending-send gate. Exactly one channel is used per send, which is what
//! lets the [`Timeline`] stay append-only without deduplication: one send
//! yields one echo and at most one confirmation.
//!
//! The channel choice is made from the connection state at send time and is
//! never cached across sends.

use chrono::{DateTime, Utc};
use studychat_core::{FallbackReply, SessionId};
use thiserror::Error;

use crate::{Timeline, WidgetAction};

/// Path a send was dispatched over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryChannel {
    /// Persistent real-time channel. Confirmed by a later channel event.
    Realtime,
    /// Request/response fallback. Confirmed by the response itself.
    Fallback,
}

/// An outstanding send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    /// Session the send targets.
    pub session_id: SessionId,
    /// Channel it went out on.
    pub channel: DeliveryChannel,
    /// When the user submitted it.
    pub started_at: DateTime<Utc>,
}

/// Why a send was not dispatched.
///
/// The widget treats every rejection as a no-op; the reason is only logged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    /// Text was empty or whitespace.
    #[error("message is empty")]
    Empty,
    /// No session is bound.
    #[error("no active session")]
    NoSession,
    /// A previous send has not been confirmed yet.
    #[error("a send is already pending")]
    AlreadyPending,
}

/// Per-widget dispatcher.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    pending: Option<PendingSend>,
}

impl Dispatcher {
    /// Dispatcher with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch user text.
    ///
    /// On success the echo is already in `timeline` and the returned action
    /// carries the text to the chosen channel.
    pub fn send(
        &mut self,
        text: &str,
        session: Option<&SessionId>,
        connected: bool,
        now: DateTime<Utc>,
        timeline: &mut Timeline,
    ) -> Result<WidgetAction, SendRejected> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendRejected::Empty);
        }
        let Some(session_id) = session else {
            return Err(SendRejected::NoSession);
        };
        if self.pending.is_some() {
            return Err(SendRejected::AlreadyPending);
        }

        let channel = if connected { DeliveryChannel::Realtime } else { DeliveryChannel::Fallback };
        self.pending = Some(PendingSend { session_id: session_id.clone(), channel, started_at: now });
        timeline.append_local_echo(text, now);

        let session_id = session_id.clone();
        let text = text.to_string();
        Ok(match channel {
            DeliveryChannel::Realtime => WidgetAction::EmitRealtime { session_id, text },
            DeliveryChannel::Fallback => WidgetAction::RequestFallback { session_id, text },
        })
    }

    /// A channel message for `session_id` arrived.
    ///
    /// Clears a pending real-time send for that session. Returns true if it
    /// did.
    pub fn confirm_realtime(&mut self, session_id: &SessionId) -> bool {
        let confirms = self.pending.as_ref().is_some_and(|p| {
            p.channel == DeliveryChannel::Realtime && &p.session_id == session_id
        });
        if confirms {
            self.pending = None;
        }
        confirms
    }

    /// Apply a fallback reply.
    ///
    /// Appends the assistant message and clears pending if the reply answers
    /// the outstanding fallback send. Returns false (and appends nothing) for
    /// a reply nobody is waiting for.
    pub fn complete_fallback(
        &mut self,
        session_id: &SessionId,
        reply: FallbackReply,
        received_at: DateTime<Utc>,
        timeline: &mut Timeline,
    ) -> bool {
        if !self.awaits_fallback(session_id) {
            return false;
        }

        self.pending = None;
        timeline.append_from_channel(reply.into_message(received_at));
        true
    }

    /// Apply a fallback failure. The echo stays; pending clears.
    pub fn fail_fallback(&mut self, session_id: &SessionId) -> bool {
        if !self.awaits_fallback(session_id) {
            return false;
        }

        self.pending = None;
        true
    }

    /// The real-time channel dropped.
    ///
    /// A disconnected transport forgets its rooms, so a pending real-time
    /// send can no longer be confirmed. Clears it and returns it; the echo
    /// stays. Fallback sends are unaffected.
    pub fn fail_realtime(&mut self) -> Option<PendingSend> {
        if self.pending.as_ref().is_some_and(|p| p.channel == DeliveryChannel::Realtime) {
            self.pending.take()
        } else {
            None
        }
    }

    /// Forget any outstanding send (session switch, teardown).
    pub fn abandon(&mut self) -> Option<PendingSend> {
        self.pending.take()
    }

    fn awaits_fallback(&self, session_id: &SessionId) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.channel == DeliveryChannel::Fallback && &p.session_id == session_id)
    }

    /// Outstanding send. `None` if idle.
    pub fn pending(&self) -> Option<&PendingSend> {
        self.pending.as_ref()
    }

    /// True while a send awaits confirmation.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
