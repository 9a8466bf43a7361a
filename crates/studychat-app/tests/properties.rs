//! Property-based tests for the reconciliation engine.
//!
//! Each property is checked over random inputs against the runtime driving
//! the simulated collaborators.

use std::future::Future;

use proptest::prelude::*;
use studychat_app::{ChatRuntime, ChatWidget, WidgetConfig, WidgetEvent};
use studychat_core::{
    ChannelFrame, ChatContext, ChatSession, ContextType, Environment, Message, Role, SessionId,
};
use studychat_harness::{SimBackend, SimEnv, SimStore, SimTransport};

type Runtime = ChatRuntime<SimStore, SimTransport, SimEnv>;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(future)
}

fn world(connected: bool) -> (Runtime, SimTransport, SimBackend) {
    let env = SimEnv::new();
    let backend = SimBackend::new(env.clone());
    let transport = SimTransport::new(backend.clone());
    transport.set_connected(connected);
    let runtime =
        ChatRuntime::new(backend.store_for("ada"), transport.clone(), env, WidgetConfig::default());
    (runtime, transport, backend)
}

fn context(index: usize) -> ChatContext {
    match index % 4 {
        0 => ChatContext::new(ContextType::Topic, Some("ownership".into())),
        1 => ChatContext::new(ContextType::Module, Some("m1".into())),
        2 => ChatContext::new(ContextType::LearningPath, Some("p1".into())),
        _ => ChatContext::general(),
    }
}

/// Text with at least one visible character.
fn text_strategy() -> impl Strategy<Value = String> {
    "[ a-zA-Z0-9?.]{0,12}[a-zA-Z0-9?][ a-zA-Z0-9?.]{0,12}"
}

/// Anything, including blank text.
fn any_text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![text_strategy(), "[ \t\n]{0,4}"]
}

/// A channel frame scoped to `session`.
fn scoped_frame_strategy(session: &'static str) -> impl Strategy<Value = ChannelFrame> {
    let session_id = SessionId::new(session);
    let typing_id = session_id.clone();
    prop_oneof![
        (any::<bool>(), text_strategy()).prop_map(move |(user, content)| {
            let message = if user {
                Message::user(content, SimEnv::new().now())
            } else {
                Message::assistant(content, SimEnv::new().now(), None)
            };
            ChannelFrame::new_message(&session_id, &message)
        }),
        any::<bool>().prop_map(move |is_typing| ChannelFrame::typing(Some(&typing_id), is_typing)),
    ]
}

proptest! {
    /// A successful send adds exactly two entries, user echo then reply, and
    /// uses exactly one channel.
    #[test]
    fn send_adds_echo_then_reply_over_one_channel(
        text in text_strategy(),
        connected in any::<bool>(),
    ) {
        block_on(async {
            let (mut runtime, transport, backend) = world(connected);
            runtime.open(context(0)).await;
            runtime.send(&text).await.unwrap();

            if connected {
                prop_assert_eq!(runtime.widget().messages().len(), 1);
                transport.deliver_pending();
                runtime.drain_frames();
            }

            let messages = runtime.widget().messages();
            prop_assert_eq!(messages.len(), 2);
            prop_assert_eq!(messages[0].role, Role::User);
            prop_assert_eq!(messages[0].content.as_str(), text.trim());
            prop_assert_eq!(messages[1].role, Role::Assistant);
            prop_assert!(!runtime.widget().is_pending());

            let channels = (transport.sent().len(), backend.stats().fallback_calls);
            prop_assert_eq!(channels, if connected { (1, 0) } else { (0, 1) });
            Ok(())
        })?;
    }

    /// Sends while a send is pending change nothing.
    #[test]
    fn sends_while_pending_are_no_ops(
        first in text_strategy(),
        rest in prop::collection::vec(any_text_strategy(), 1..8),
    ) {
        block_on(async {
            let (mut runtime, transport, _) = world(true);
            runtime.open(context(0)).await;
            runtime.send(&first).await.unwrap();

            for text in &rest {
                prop_assert!(runtime.send(text).await.is_err());
                runtime.send_quick_action(0).await;
            }

            prop_assert_eq!(runtime.widget().messages().len(), 1);
            prop_assert_eq!(transport.sent().len(), 1);
            prop_assert!(runtime.widget().is_pending());
            Ok(())
        })?;
    }

    /// Frames for another session never mutate the active one.
    #[test]
    fn foreign_session_frames_are_isolated(
        pending in any::<bool>(),
        typing in any::<bool>(),
        frames in prop::collection::vec(scoped_frame_strategy("other"), 1..16),
    ) {
        let now = SimEnv::new().now();
        let mut widget = ChatWidget::default();
        widget.open(context(0), true);
        widget.handle(WidgetEvent::SessionReady {
            attempt: 1,
            session: ChatSession {
                id: SessionId::new("active"),
                context_type: ContextType::Topic,
                context_id: Some("ownership".into()),
                messages: vec![Message::assistant("welcome back", now, None)],
            },
            connected: true,
        });
        if pending {
            widget.send("question", true, now);
        }
        if typing {
            widget.handle(WidgetEvent::Frame {
                frame: ChannelFrame::typing(None, true),
                received_at: now,
            });
        }

        let messages = widget.messages().to_vec();
        let count = frames.len() as u64;
        for frame in frames {
            let actions = widget.handle(WidgetEvent::Frame { frame, received_at: now });
            prop_assert!(actions.is_empty());
        }

        prop_assert_eq!(widget.messages(), messages.as_slice());
        prop_assert_eq!(widget.is_pending(), pending);
        prop_assert_eq!(widget.is_typing(), typing);
        prop_assert_eq!(widget.discarded_frames(), count);
    }

    /// Reopening a context resumes the same session with its history.
    #[test]
    fn reopening_resumes_same_session(
        sends in prop::collection::vec(text_strategy(), 0..5),
        detour in 1usize..4,
    ) {
        block_on(async {
            let (mut runtime, _, backend) = world(false);
            runtime.open(context(0)).await;
            let first_id = runtime.widget().session_id().cloned().unwrap();
            for text in &sends {
                runtime.send(text).await.unwrap();
            }
            let before = runtime.widget().messages().to_vec();

            runtime.open(context(detour)).await;
            prop_assert_ne!(runtime.widget().session_id(), Some(&first_id));

            runtime.open(context(0)).await;
            prop_assert_eq!(runtime.widget().session_id(), Some(&first_id));
            prop_assert!(runtime.widget().messages().starts_with(&before));
            prop_assert_eq!(backend.session_count(), 2);
            Ok(())
        })?;
    }
}

#[test]
fn resumption_is_per_user() {
    block_on(async {
        let env = SimEnv::new();
        let backend = SimBackend::new(env.clone());
        let transport = SimTransport::new(backend.clone());

        let mut ada = ChatRuntime::new(
            backend.store_for("ada"),
            transport.clone(),
            env.clone(),
            WidgetConfig::default(),
        );
        let mut bob =
            ChatRuntime::new(backend.store_for("bob"), transport, env, WidgetConfig::default());

        ada.open(context(0)).await;
        bob.open(context(0)).await;

        assert_ne!(ada.widget().session_id(), bob.widget().session_id());
    });
}
