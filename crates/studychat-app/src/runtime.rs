//! Generic runtime for widget orchestration.
//!
//! The runtime drives one widget, coordinating between:
//! - [`ChatWidget`]: pure state machine
//! - [`SessionStore`]: awaited request/response calls
//! - [`Transport`]: fire-and-forget channel operations and the frame stream
//! - [`Renderer`]: presentation
//!
//! Everything runs on one task. Methods take `&mut self`, so no two
//! continuations ever interleave mid-step; frames that arrive while a store
//! call is awaited stay queued in the subscription and are handled in order
//! afterwards.

use std::time::Duration;

use studychat_core::{ChannelFrame, ChatContext, Environment};
use tokio::sync::mpsc;

use crate::{
    ChatWidget, NullRenderer, Renderer, SendRejected, SessionStore, Subscription, Transport,
    WidgetAction, WidgetConfig, WidgetEvent,
};

/// User intents accepted by [`ChatRuntime::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Open or switch to a context.
    Open(ChatContext),
    /// Replace the draft.
    Draft(String),
    /// Send the draft.
    Submit,
    /// Send text directly.
    Send(String),
    /// Send the quick action at this index.
    QuickAction(usize),
    /// Close the widget and stop the loop.
    Close,
}

/// What woke the event loop.
enum Wake {
    Input(UserInput),
    Frame(ChannelFrame),
    Tick,
    InputClosed,
}

/// Generic runtime that executes widget actions against the collaborators.
///
/// # Type Parameters
///
/// - `S`: Session store
/// - `T`: Transport (usually shared, e.g. `Arc<_>`)
/// - `E`: Environment providing the clock
/// - `R`: Renderer
pub struct ChatRuntime<S, T, E, R = NullRenderer> {
    widget: ChatWidget,
    store: S,
    transport: T,
    env: E,
    renderer: R,
    subscription: Option<Subscription>,
    last_connected: bool,
}

impl<S, T, E> ChatRuntime<S, T, E, NullRenderer>
where
    S: SessionStore,
    T: Transport,
    E: Environment,
{
    /// Create a runtime for a fresh widget.
    pub fn new(store: S, transport: T, env: E, config: WidgetConfig) -> Self {
        let last_connected = transport.is_connected();
        Self {
            widget: ChatWidget::new(config),
            store,
            transport,
            env,
            renderer: NullRenderer,
            subscription: None,
            last_connected,
        }
    }
}

impl<S, T, E, R> ChatRuntime<S, T, E, R>
where
    S: SessionStore,
    T: Transport,
    E: Environment,
    R: Renderer,
{
    /// Replace the renderer.
    pub fn with_renderer<R2: Renderer>(self, renderer: R2) -> ChatRuntime<S, T, E, R2> {
        ChatRuntime {
            widget: self.widget,
            store: self.store,
            transport: self.transport,
            env: self.env,
            renderer,
            subscription: self.subscription,
            last_connected: self.last_connected,
        }
    }

    /// Open (or switch) the widget to `context` and wait for the session.
    pub async fn open(&mut self, context: ChatContext) {
        let connected = self.refresh_connection();
        let actions = self.widget.open(context, connected);
        self.process_actions(actions).await;
    }

    /// Replace the draft input.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        let actions = self.widget.set_draft(text);
        self.process_actions_sync(actions);
    }

    /// Send the draft.
    pub async fn submit(&mut self) -> Result<(), SendRejected> {
        let draft = self.widget.draft().to_string();
        self.send(&draft).await
    }

    /// Send text.
    ///
    /// The channel is chosen from the connection state right now. A fallback
    /// send completes before this returns; a real-time send completes when
    /// the confirming frame is handled.
    pub async fn send(&mut self, text: &str) -> Result<(), SendRejected> {
        let connected = self.refresh_connection();
        let now = self.env.now();
        let actions = self.widget.try_send(text, connected, now)?;
        self.process_actions(actions).await;
        Ok(())
    }

    /// Send the quick action at `index`. Out-of-range indices do nothing.
    pub async fn send_quick_action(&mut self, index: usize) {
        let connected = self.refresh_connection();
        let now = self.env.now();
        let actions = self.widget.send_quick_action(index, connected, now);
        self.process_actions(actions).await;
    }

    /// Close the widget. Queued frames are dropped with the subscription.
    pub fn close(&mut self) {
        let connected = self.transport.is_connected();
        let actions = self.widget.close(connected);
        self.process_actions_sync(actions);
    }

    /// Handle one frame from the subscription.
    pub fn handle_frame(&mut self, frame: ChannelFrame) {
        let received_at = self.env.now();
        let actions = self.widget.handle(WidgetEvent::Frame { frame, received_at });
        self.process_actions_sync(actions);
    }

    /// Handle every frame already queued. Returns how many were handled.
    pub fn drain_frames(&mut self) -> usize {
        let mut handled = 0;
        while let Some(frame) = self.subscription.as_mut().and_then(Subscription::try_recv) {
            self.handle_frame(frame);
            handled += 1;
        }
        handled
    }

    /// Wait for the next frame. `None` if not subscribed or the stream ended.
    pub async fn recv_frame(&mut self) -> Option<ChannelFrame> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => None,
        }
    }

    /// Advance time-based state and pick up connection changes.
    pub fn tick(&mut self) {
        self.refresh_connection();
        let now = self.env.now();
        let actions = self.widget.handle(WidgetEvent::Tick { now });
        self.process_actions_sync(actions);
    }

    /// Compare the transport's connection state with the last one seen and
    /// let the widget react to a change. Returns the current state.
    pub fn refresh_connection(&mut self) -> bool {
        let connected = self.transport.is_connected();
        if connected != self.last_connected {
            self.last_connected = connected;
            tracing::info!(connected, "transport connection changed");
            let actions = self.widget.handle(WidgetEvent::ConnectionChanged { connected });
            self.process_actions_sync(actions);
        }
        connected
    }

    /// Run until the input channel closes or [`UserInput::Close`] arrives.
    ///
    /// Ticks every `tick_every` to pick up connection changes and typing
    /// timeouts.
    pub async fn run(&mut self, mut input: mpsc::Receiver<UserInput>, tick_every: Duration) {
        let mut ticker = tokio::time::interval(tick_every);

        loop {
            let wake = tokio::select! {
                user = input.recv() => user.map_or(Wake::InputClosed, Wake::Input),
                Some(frame) = next_frame(&mut self.subscription) => Wake::Frame(frame),
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Input(UserInput::Close) | Wake::InputClosed => {
                    self.close();
                    break;
                },
                Wake::Input(user) => self.apply_input(user).await,
                Wake::Frame(frame) => self.handle_frame(frame),
                Wake::Tick => self.tick(),
            }
        }
    }

    async fn apply_input(&mut self, input: UserInput) {
        match input {
            UserInput::Open(context) => self.open(context).await,
            UserInput::Draft(text) => self.set_draft(text),
            UserInput::Submit => {
                if let Err(reason) = self.submit().await {
                    tracing::debug!(%reason, "submit ignored");
                }
            },
            UserInput::Send(text) => {
                if let Err(reason) = self.send(&text).await {
                    tracing::debug!(%reason, "send ignored");
                }
            },
            UserInput::QuickAction(index) => self.send_quick_action(index).await,
            UserInput::Close => self.close(),
        }
    }

    /// Execute actions, feeding results back into the widget until quiet.
    async fn process_actions(&mut self, initial_actions: Vec<WidgetAction>) {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    WidgetAction::CreateOrResumeSession { attempt, title, context } => {
                        let result = self.store.create_or_resume_session(title, &context).await;
                        let connected = self.refresh_connection();
                        let event = match result {
                            Ok(session) => WidgetEvent::SessionReady { attempt, session, connected },
                            Err(error) => WidgetEvent::SessionFailed { attempt, error },
                        };
                        pending_actions.extend(self.widget.handle(event));
                    },
                    WidgetAction::RequestFallback { session_id, text } => {
                        let result = self.store.send_message_fallback(&session_id, &text).await;
                        let received_at = self.env.now();
                        let event = match result {
                            Ok(reply) => {
                                WidgetEvent::FallbackReplied { session_id, reply, received_at }
                            },
                            Err(error) => WidgetEvent::FallbackFailed { session_id, error },
                        };
                        pending_actions.extend(self.widget.handle(event));
                    },
                    other => self.execute(other),
                }
            }
        }
    }

    /// Execute actions that never wait on the store.
    fn process_actions_sync(&mut self, actions: Vec<WidgetAction>) {
        for action in actions {
            if action.is_async() {
                tracing::warn!(?action, "unexpected store action in sync context");
                continue;
            }
            self.execute(action);
        }
    }

    fn execute(&mut self, action: WidgetAction) {
        match action {
            WidgetAction::Render => self.renderer.render(&self.widget),
            WidgetAction::Subscribe => {
                let subscription = self.transport.subscribe();
                tracing::debug!(id = subscription.id(), "subscribed to channel");
                if let Some(previous) = self.subscription.replace(subscription) {
                    self.transport.unsubscribe(previous);
                }
            },
            WidgetAction::Unsubscribe => {
                if let Some(subscription) = self.subscription.take() {
                    tracing::debug!(id = subscription.id(), "unsubscribed from channel");
                    self.transport.unsubscribe(subscription);
                }
            },
            WidgetAction::JoinRoom { session_id } => self.transport.join_room(&session_id),
            WidgetAction::LeaveRoom { session_id } => self.transport.leave_room(&session_id),
            WidgetAction::EmitRealtime { session_id, text } => {
                self.transport.send(&session_id, &text);
            },
            // Awaited by `process_actions`.
            WidgetAction::CreateOrResumeSession { .. } | WidgetAction::RequestFallback { .. } => {},
        }
    }

    /// The widget.
    pub fn widget(&self) -> &ChatWidget {
        &self.widget
    }

    /// The session store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// True while the runtime holds a channel subscription.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

async fn next_frame(subscription: &mut Option<Subscription>) -> Option<ChannelFrame> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
