//! Collaborator traits for abstracting I/O.
//!
//! The widget never touches I/O. The [`crate::ChatRuntime`] executes widget
//! actions against these traits, so the same orchestration code runs against
//! a real backend and against the deterministic fakes in the harness.
//!
//! - [`SessionStore`]: request/response persistence (create-or-resume and
//!   the fallback send path)
//! - [`Transport`]: the shared persistent channel (rooms, emits,
//!   subscriptions)
//! - [`Renderer`]: presentation

use std::{future::Future, sync::Arc};

use studychat_core::{ChannelFrame, ChatContext, ChatSession, FallbackReply, SessionId, StoreError};
use tokio::sync::mpsc;

use crate::ChatWidget;

/// Request/response session persistence.
///
/// Implementations must make `create_or_resume_session` idempotent per
/// context: asking twice for the same context returns the same session with
/// its accumulated history.
pub trait SessionStore: Send + Sync {
    /// Create a session for `context`, or resume the existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the request.
    fn create_or_resume_session(
        &self,
        title: &str,
        context: &ChatContext,
    ) -> impl Future<Output = Result<ChatSession, StoreError>> + Send;

    /// Persist user text and return the assistant reply in one round trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the request.
    fn send_message_fallback(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> impl Future<Output = Result<FallbackReply, StoreError>> + Send;
}

/// Persistent bidirectional channel shared by every widget in a process.
///
/// Widgets only ever reach the transport through runtime actions and never
/// own it; `Arc<T>` implements the trait so one transport can back many
/// runtimes.
pub trait Transport: Send + Sync {
    /// True while the persistent channel is up.
    fn is_connected(&self) -> bool;

    /// Join the room named by `session_id`.
    fn join_room(&self, session_id: &SessionId);

    /// Leave the room named by `session_id`.
    fn leave_room(&self, session_id: &SessionId);

    /// Emit user text for `session_id`.
    ///
    /// Fire and forget: the only acknowledgement is a later channel frame.
    fn send(&self, session_id: &SessionId, text: &str);

    /// Register a listener for every frame delivered to this process.
    fn subscribe(&self) -> Subscription;

    /// Remove a listener. Frames not yet received are dropped with it.
    fn unsubscribe(&self, subscription: Subscription);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn join_room(&self, session_id: &SessionId) {
        (**self).join_room(session_id);
    }

    fn leave_room(&self, session_id: &SessionId) {
        (**self).leave_room(session_id);
    }

    fn send(&self, session_id: &SessionId, text: &str) {
        (**self).send(session_id, text);
    }

    fn subscribe(&self) -> Subscription {
        (**self).subscribe()
    }

    fn unsubscribe(&self, subscription: Subscription) {
        (**self).unsubscribe(subscription);
    }
}

/// A registered channel listener.
///
/// Owned by exactly one widget. Handing it back via
/// [`Transport::unsubscribe`] drops the receiver, so frames still queued
/// behind it can never reach the widget.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    frames: mpsc::UnboundedReceiver<ChannelFrame>,
}

impl Subscription {
    /// Wrap the receiving half of a listener channel.
    pub fn new(id: u64, frames: mpsc::UnboundedReceiver<ChannelFrame>) -> Self {
        Self { id, frames }
    }

    /// Listener identifier assigned by the transport.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next frame. `None` once the transport dropped the sender.
    pub async fn recv(&mut self) -> Option<ChannelFrame> {
        self.frames.recv().await
    }

    /// Next frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<ChannelFrame> {
        self.frames.try_recv().ok()
    }
}

/// Presents widget state.
pub trait Renderer: Send {
    /// Draw the widget.
    fn render(&mut self, widget: &ChatWidget);
}

/// Renderer that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _widget: &ChatWidget) {}
}
