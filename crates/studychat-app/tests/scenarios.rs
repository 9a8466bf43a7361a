//! End-to-end scenarios over the runtime and the simulated collaborators.

use studychat_app::{ChatRuntime, ChatWidget, SendRejected, WidgetAction, WidgetConfig, WidgetEvent};
use studychat_core::{
    ChannelFrame, ChatContext, ChatSession, ContextType, Environment, Role, SessionId, StoreError,
};
use studychat_harness::{SimBackend, SimEnv, SimStore, SimTransport};

type Runtime = ChatRuntime<SimStore, SimTransport, SimEnv>;

fn world(connected: bool) -> (Runtime, SimTransport, SimBackend) {
    let env = SimEnv::new();
    let backend = SimBackend::new(env.clone());
    let transport = SimTransport::new(backend.clone());
    transport.set_connected(connected);
    let runtime =
        ChatRuntime::new(backend.store_for("ada"), transport.clone(), env, WidgetConfig::default());
    (runtime, transport, backend)
}

fn topic() -> ChatContext {
    ChatContext::new(ContextType::Topic, Some("ownership".into()))
}

fn roles(widget: &ChatWidget) -> Vec<Role> {
    widget.messages().iter().map(|m| m.role).collect()
}

#[tokio::test]
async fn realtime_send_is_confirmed_by_channel_reply() {
    let (mut runtime, transport, _) = world(true);
    runtime.open(topic()).await;
    assert_eq!(runtime.widget().title(), Some("Topic Discussion"));

    let prompt = "Can you explain this topic in simpler terms?";
    runtime.send(prompt).await.unwrap();

    let widget = runtime.widget();
    assert_eq!(roles(widget), [Role::User]);
    assert_eq!(widget.messages()[0].content, prompt);
    assert!(widget.is_pending());

    transport.deliver_pending();

    let typing = runtime.recv_frame().await.unwrap();
    runtime.handle_frame(typing);
    assert!(runtime.widget().is_typing());
    assert!(runtime.widget().is_pending());

    let reply = runtime.recv_frame().await.unwrap();
    runtime.handle_frame(reply);
    assert_eq!(roles(runtime.widget()), [Role::User, Role::Assistant]);
    assert_eq!(runtime.widget().messages()[1].content, format!("Re: {prompt}"));
    assert!(!runtime.widget().is_pending());

    assert_eq!(runtime.drain_frames(), 1);
    assert!(!runtime.widget().is_typing());
}

#[tokio::test]
async fn fallback_send_appends_reply() {
    let (mut runtime, transport, backend) = world(false);
    runtime.open(topic()).await;

    runtime.send("hello").await.unwrap();

    assert_eq!(backend.stats().fallback_calls, 1);
    assert!(transport.sent().is_empty());
    assert_eq!(roles(runtime.widget()), [Role::User, Role::Assistant]);
    assert_eq!(runtime.widget().messages()[1].content, "Re: hello");
    assert!(!runtime.widget().is_pending());
}

#[tokio::test]
async fn fallback_failure_leaves_only_echo() {
    let (mut runtime, _, backend) = world(false);
    runtime.open(topic()).await;
    backend.fail_next_fallback(StoreError::Unavailable("offline".into()));

    runtime.send("hello").await.unwrap();

    assert_eq!(backend.stats().fallback_calls, 1);
    assert_eq!(roles(runtime.widget()), [Role::User]);
    assert!(!runtime.widget().is_pending());
    assert!(runtime.widget().last_error().is_some());
}

#[tokio::test]
async fn typing_for_previous_session_is_ignored() {
    let (mut runtime, transport, _) = world(true);
    runtime.open(topic()).await;
    let first = runtime.widget().session_id().cloned().unwrap();

    runtime.open(ChatContext::general()).await;
    assert_ne!(runtime.widget().session_id(), Some(&first));

    transport.inject(ChannelFrame::typing(Some(&first), true));
    runtime.drain_frames();

    assert!(!runtime.widget().is_typing());
    assert_eq!(runtime.widget().discarded_frames(), 1);
}

#[test]
fn scoped_typing_for_inactive_session_stays_idle() {
    let env = SimEnv::new();
    let mut widget = ChatWidget::default();
    widget.open(topic(), true);
    widget.handle(WidgetEvent::SessionReady {
        attempt: 1,
        session: ChatSession {
            id: SessionId::new("s2"),
            context_type: ContextType::Topic,
            context_id: Some("ownership".into()),
            messages: vec![],
        },
        connected: true,
    });

    let frame = ChannelFrame::new(
        "typing",
        serde_json::json!({ "sessionId": "s1", "isTyping": true }),
    );
    let actions = widget.handle(WidgetEvent::Frame { frame, received_at: env.now() });

    assert!(actions.is_empty());
    assert!(!widget.is_typing());
}

#[tokio::test]
async fn close_with_send_pending_ignores_late_reply() {
    let (mut runtime, transport, backend) = world(true);
    runtime.open(topic()).await;
    let session_id = runtime.widget().session_id().cloned().unwrap();
    runtime.send("hi").await.unwrap();

    runtime.close();
    assert!(!transport.is_joined(&session_id));
    assert_eq!(transport.subscriber_count(), 0);

    transport.deliver_pending();
    assert_eq!(runtime.drain_frames(), 0);

    let widget = runtime.widget();
    assert!(widget.is_closed());
    assert_eq!(roles(widget), [Role::User]);
    assert!(!widget.is_typing());
    assert_eq!(backend.history(&session_id).len(), 2, "the server still answered");
}

#[tokio::test]
async fn frames_queued_before_close_are_dropped() {
    let (mut runtime, transport, _) = world(true);
    runtime.open(topic()).await;
    runtime.send("hi").await.unwrap();
    transport.deliver_pending();

    runtime.close();

    assert_eq!(runtime.drain_frames(), 0);
    assert_eq!(roles(runtime.widget()), [Role::User]);
}

#[tokio::test]
async fn failed_initialization_rejects_sends_until_reopened() {
    let (mut runtime, transport, backend) = world(true);
    backend.fail_next_create(StoreError::Timeout);

    runtime.open(topic()).await;
    assert_eq!(runtime.send("hi").await, Err(SendRejected::NoSession));
    assert!(runtime.widget().messages().is_empty());
    assert!(transport.sent().is_empty());

    runtime.open(topic()).await;
    assert!(runtime.send("hi").await.is_ok());
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn reconnect_rejoins_room_so_replies_arrive() {
    let (mut runtime, transport, _) = world(false);
    runtime.open(topic()).await;
    let session_id = runtime.widget().session_id().cloned().unwrap();
    assert!(!transport.is_joined(&session_id));

    transport.set_connected(true);
    runtime.send("now online").await.unwrap();
    assert!(transport.is_joined(&session_id));

    transport.deliver_pending();
    runtime.drain_frames();
    assert_eq!(roles(runtime.widget()), [Role::User, Role::Assistant]);
    assert!(!runtime.widget().is_pending());
}

#[tokio::test]
async fn dropped_connection_fails_realtime_send_and_fallback_retry_works() {
    let (mut runtime, transport, backend) = world(true);
    runtime.open(topic()).await;
    runtime.send("hi").await.unwrap();
    assert!(runtime.widget().is_pending());
    assert_eq!(transport.outbox_len(), 1);

    transport.set_connected(false);
    runtime.tick();
    assert!(!runtime.widget().is_pending());
    assert!(runtime.widget().last_error().is_some());
    assert_eq!(roles(runtime.widget()), [Role::User]);

    assert_eq!(transport.deliver_pending(), 1);
    assert_eq!(transport.outbox_len(), 0);
    runtime.drain_frames();
    assert_eq!(roles(runtime.widget()), [Role::User]);

    runtime.send("hi again").await.unwrap();
    assert_eq!(backend.stats().fallback_calls, 1);
    assert_eq!(roles(runtime.widget()), [Role::User, Role::User, Role::Assistant]);
    assert_eq!(runtime.widget().messages()[2].content, "Re: hi again");
    assert!(runtime.widget().last_error().is_none());

    transport.set_connected(true);
    runtime.send("back online").await.unwrap();
    assert_eq!(transport.sent().len(), 2);
    assert!(runtime.widget().is_pending());
}

#[tokio::test]
async fn switching_contexts_leaves_previous_room() {
    let (mut runtime, transport, _) = world(true);
    runtime.open(topic()).await;
    let first = runtime.widget().session_id().cloned().unwrap();

    runtime.open(ChatContext::new(ContextType::Module, Some("m1".into()))).await;
    let second = runtime.widget().session_id().cloned().unwrap();

    assert!(!transport.is_joined(&first));
    assert!(transport.is_joined(&second));
    assert_eq!(runtime.widget().title(), Some("Module Assistance"));
    assert_eq!(transport.subscriber_count(), 1);
}

#[test]
fn actions_for_connected_open_and_send() {
    let env = SimEnv::new();
    let mut widget = ChatWidget::default();
    widget.open(topic(), true);
    let ready = widget.handle(WidgetEvent::SessionReady {
        attempt: 1,
        session: ChatSession {
            id: SessionId::new("s1"),
            context_type: ContextType::Topic,
            context_id: Some("ownership".into()),
            messages: vec![],
        },
        connected: true,
    });

    assert_eq!(ready, vec![
        WidgetAction::JoinRoom { session_id: "s1".into() },
        WidgetAction::Render
    ]);
    assert!(matches!(widget.send("hi", true, env.now()).as_slice(), [
        WidgetAction::Render,
        WidgetAction::EmitRealtime { .. }
    ]));
}
