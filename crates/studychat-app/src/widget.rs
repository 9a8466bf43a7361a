//! Chat widget state machine.
//!
//! This module defines the [`ChatWidget`] state machine, which composes the
//! session controller, the timeline, the typing indicator and the dispatcher
//! into one widget instance, completely decoupled from I/O.
//!
//! This is a pure state machine: user intents are method calls, collaborator
//! results are [`crate::WidgetEvent`]s, and both produce
//! [`crate::WidgetAction`] instructions for the runtime to execute. The
//! connection state and the current time are passed in by the caller on every
//! call that needs them.
//!
//! # Responsibilities
//!
//! - Validates raw channel frames and filters them to the bound session.
//! - Routes confirmations and fallback replies to the dispatcher.
//! - Tracks the draft input, the last surfaced error and a discard counter.
//! - Goes quiet after [`ChatWidget::close`]: late events are never observed.

use chrono::{DateTime, Utc};
use studychat_core::{
    ChannelEvent, ChannelFrame, ChatContext, Message, QuickAction, SessionId,
};

use crate::{
    Dispatcher, PendingSend, SendRejected, SessionController, SessionPhase, Timeline,
    TypingIndicator, TypingOutcome, WidgetAction, WidgetConfig, WidgetEvent,
};

/// One chat widget instance.
///
/// Owns exactly one session at a time. Nothing here is shared with other
/// widgets; the transport they all use is reached only through actions.
#[derive(Debug, Clone)]
pub struct ChatWidget {
    config: WidgetConfig,
    controller: SessionController,
    timeline: Timeline,
    typing: TypingIndicator,
    dispatcher: Dispatcher,
    /// Unsent input text.
    draft: String,
    /// Last failure surfaced to the user. `None` if nothing to show.
    last_error: Option<String>,
    /// Channel frames rejected as malformed, unscoped or stale.
    discarded_frames: u64,
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new(WidgetConfig::default())
    }
}

impl ChatWidget {
    /// Create a widget with no session.
    pub fn new(config: WidgetConfig) -> Self {
        let typing = TypingIndicator::new(config.typing_timeout);
        Self {
            config,
            controller: SessionController::new(),
            timeline: Timeline::new(),
            typing,
            dispatcher: Dispatcher::new(),
            draft: String::new(),
            last_error: None,
            discarded_frames: 0,
        }
    }

    /// Open (or switch) the widget to a context.
    ///
    /// Starts a create-or-resume round trip. The timeline stays empty until
    /// the session arrives. Any send still pending for a previous session is
    /// abandoned.
    pub fn open(&mut self, context: ChatContext, connected: bool) -> Vec<WidgetAction> {
        let mut actions = self.controller.initialize(context, connected);
        if actions.is_empty() {
            return actions;
        }

        if let Some(pending) = self.dispatcher.abandon() {
            tracing::debug!(session_id = %pending.session_id, "abandoning pending send on session switch");
        }
        self.timeline.clear();
        self.typing.reset();
        self.last_error = None;

        actions.push(WidgetAction::Render);
        actions
    }

    /// Replace the draft input.
    pub fn set_draft(&mut self, text: impl Into<String>) -> Vec<WidgetAction> {
        if self.is_closed() {
            return vec![];
        }
        self.draft = text.into();
        vec![WidgetAction::Render]
    }

    /// Send the current draft.
    pub fn submit(&mut self, connected: bool, now: DateTime<Utc>) -> Vec<WidgetAction> {
        let draft = self.draft.clone();
        self.send(&draft, connected, now)
    }

    /// Send text. A rejected send is a no-op.
    pub fn send(&mut self, text: &str, connected: bool, now: DateTime<Utc>) -> Vec<WidgetAction> {
        self.try_send(text, connected, now).unwrap_or_else(|reason| {
            tracing::debug!(%reason, "send ignored");
            vec![]
        })
    }

    /// Send text, reporting why it was rejected.
    ///
    /// On success the echo is already in the timeline, the draft is cleared,
    /// and the actions are `[Render, <channel action>]`.
    pub fn try_send(
        &mut self,
        text: &str,
        connected: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<WidgetAction>, SendRejected> {
        let action = self.dispatcher.send(
            text,
            self.controller.bound_session(),
            connected,
            now,
            &mut self.timeline,
        )?;

        self.draft.clear();
        self.last_error = None;
        tracing::debug!(realtime = connected, "dispatched user message");

        Ok(vec![WidgetAction::Render, action])
    }

    /// Send the prompt of the quick action at `index`.
    pub fn send_quick_action(
        &mut self,
        index: usize,
        connected: bool,
        now: DateTime<Utc>,
    ) -> Vec<WidgetAction> {
        match self.quick_actions().get(index) {
            Some(action) => self.send(action.prompt, connected, now),
            None => vec![],
        }
    }

    /// Close the widget.
    ///
    /// Leaves the room (if connected), removes listeners, and freezes the
    /// widget. A pending send is abandoned; its reply will never be shown.
    pub fn close(&mut self, connected: bool) -> Vec<WidgetAction> {
        if self.is_closed() {
            return vec![];
        }

        let mut actions = self.controller.teardown(connected);
        if let Some(pending) = self.dispatcher.abandon() {
            tracing::debug!(session_id = %pending.session_id, "closing with a send pending");
        }
        self.typing.reset();

        actions.push(WidgetAction::Render);
        actions
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: WidgetEvent) -> Vec<WidgetAction> {
        if self.is_closed() {
            tracing::trace!("widget closed, ignoring event");
            return vec![];
        }

        match event {
            WidgetEvent::SessionReady { attempt, session, connected } => {
                let Some(mut actions) = self.controller.session_ready(attempt, &session, connected)
                else {
                    tracing::debug!(attempt, "dropping stale session result");
                    return vec![];
                };

                tracing::info!(
                    session_id = %session.id,
                    history = session.messages.len(),
                    joined = connected,
                    "session bound"
                );
                self.timeline.seed(session.messages);
                self.last_error = None;
                actions.push(WidgetAction::Render);
                actions
            },
            WidgetEvent::SessionFailed { attempt, error } => {
                if !self.controller.session_failed(attempt, error.to_string()) {
                    return vec![];
                }
                tracing::warn!(%error, "session initialization failed");
                self.last_error = Some(format!("Could not start chat: {error}"));
                vec![WidgetAction::Render]
            },
            WidgetEvent::ConnectionChanged { connected } => {
                let mut actions = self.controller.connection_changed(connected);
                if !connected && let Some(lost) = self.dispatcher.fail_realtime() {
                    tracing::warn!(session_id = %lost.session_id, "connection lost before reply");
                    self.typing.reset();
                    self.last_error =
                        Some("Connection lost before a reply arrived. Try again.".to_string());
                    actions.push(WidgetAction::Render);
                }
                actions
            },
            WidgetEvent::Frame { frame, received_at } => self.handle_frame(&frame, received_at),
            WidgetEvent::FallbackReplied { session_id, reply, received_at } => {
                if self.dispatcher.complete_fallback(&session_id, reply, received_at, &mut self.timeline)
                {
                    vec![WidgetAction::Render]
                } else {
                    tracing::debug!(%session_id, "dropping fallback reply nobody is waiting for");
                    vec![]
                }
            },
            WidgetEvent::FallbackFailed { session_id, error } => {
                if !self.dispatcher.fail_fallback(&session_id) {
                    return vec![];
                }
                tracing::warn!(%session_id, %error, "fallback send failed");
                self.last_error = Some(format!("Message could not be delivered: {error}"));
                vec![WidgetAction::Render]
            },
            WidgetEvent::Tick { now } => {
                if self.typing.tick(now) {
                    tracing::debug!("typing indicator timed out");
                    vec![WidgetAction::Render]
                } else {
                    vec![]
                }
            },
        }
    }

    fn handle_frame(&mut self, frame: &ChannelFrame, received_at: DateTime<Utc>) -> Vec<WidgetAction> {
        let event = match ChannelEvent::decode(frame, received_at) {
            Ok(event) => event,
            Err(error) => {
                self.discarded_frames += 1;
                tracing::warn!(%error, "discarding channel frame");
                return vec![];
            },
        };

        let Some(active) = self.controller.bound_session() else {
            self.discarded_frames += 1;
            tracing::debug!("no bound session, discarding channel event");
            return vec![];
        };

        match event {
            ChannelEvent::NewMessage { session_id, message } => {
                if &session_id != active {
                    self.discarded_frames += 1;
                    tracing::debug!(%session_id, %active, "discarding message for another session");
                    return vec![];
                }

                if self.dispatcher.confirm_realtime(&session_id) {
                    tracing::debug!(%session_id, "real-time send confirmed");
                }
                self.timeline.append_from_channel(message);
                vec![WidgetAction::Render]
            },
            ChannelEvent::Typing { session_id, is_typing } => {
                match self.typing.apply(session_id.as_ref(), active, is_typing, received_at) {
                    TypingOutcome::Changed => vec![WidgetAction::Render],
                    TypingOutcome::Unchanged => vec![],
                    TypingOutcome::Stale => {
                        self.discarded_frames += 1;
                        vec![]
                    },
                }
            },
        }
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        self.timeline.messages()
    }

    /// The timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// True while the typing indicator is shown.
    pub fn is_typing(&self) -> bool {
        self.typing.is_typing()
    }

    /// True while a send awaits confirmation.
    pub fn is_pending(&self) -> bool {
        self.dispatcher.is_pending()
    }

    /// Outstanding send. `None` if idle.
    pub fn pending(&self) -> Option<&PendingSend> {
        self.dispatcher.pending()
    }

    /// Bound session. `None` if not ready.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.controller.bound_session()
    }

    /// True once a session is bound and sends are accepted.
    pub fn is_ready(&self) -> bool {
        self.controller.bound_session().is_some()
    }

    /// Session lifecycle phase.
    pub fn phase(&self) -> &SessionPhase {
        self.controller.phase()
    }

    /// Number of initializations started.
    pub fn attempts(&self) -> u64 {
        self.controller.attempts()
    }

    /// Context of the current session. `None` before open or after close.
    pub fn context(&self) -> Option<&ChatContext> {
        self.controller.context()
    }

    /// Session title. `None` before open or after close.
    pub fn title(&self) -> Option<&'static str> {
        self.context().map(ChatContext::title)
    }

    /// Quick-action menu for the current context.
    pub fn quick_actions(&self) -> &'static [QuickAction] {
        if !self.config.quick_actions {
            return &[];
        }
        self.context().map_or(&[], |ctx| ctx.context_type.quick_actions())
    }

    /// Unsent input text.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Last failure surfaced to the user.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Channel frames rejected as malformed or out of scope.
    pub fn discarded_frames(&self) -> u64 {
        self.discarded_frames
    }

    /// True while channel listeners are registered.
    pub fn is_listening(&self) -> bool {
        self.controller.is_listening()
    }

    /// True after [`ChatWidget::close`].
    pub fn is_closed(&self) -> bool {
        self.controller.is_closed()
    }

    /// Widget configuration.
    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }
}
