//! Line-oriented renderer.
//!
//! The widget is re-rendered after every visible change, but a terminal can
//! only append. `TerminalRenderer` remembers what it already printed and
//! writes the difference.
//!
//! A resumed session is announced with how long ago its last message was
//! written, which is why the renderer reads a clock.

use std::io::Write;

use studychat_app::{ChatWidget, Renderer};
use studychat_core::{
    Environment, Message, Role,
    format::{format_relative, format_time},
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Renders a [`ChatWidget`] as appended lines of text.
#[derive(Debug)]
pub struct TerminalRenderer<W, E> {
    out: W,
    env: E,
    /// Open attempt the printed lines belong to.
    attempts: u64,
    /// Timeline entries already printed for that attempt.
    shown: usize,
    /// Whether the session of that attempt has been announced.
    bound: bool,
    typing: bool,
    error: Option<String>,
    closed: bool,
}

impl<W: Write + Send, E: Environment> TerminalRenderer<W, E> {
    /// Renderer writing to `out`, reading the time from `env`.
    pub fn new(out: W, env: E) -> Self {
        Self {
            out,
            env,
            attempts: 0,
            shown: 0,
            bound: false,
            typing: false,
            error: None,
            closed: false,
        }
    }

    /// Consume the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, widget: &ChatWidget) -> std::io::Result<()> {
        if widget.is_closed() {
            if !self.closed {
                self.closed = true;
                writeln!(self.out, "-- chat closed --")?;
            }
            return self.out.flush();
        }
        self.closed = false;

        if widget.attempts() != self.attempts {
            self.attempts = widget.attempts();
            self.shown = 0;
            self.bound = false;
            self.typing = false;
            if let Some(title) = widget.title() {
                writeln!(self.out, "== {title} ==")?;
            }
            let actions: Vec<_> = widget
                .quick_actions()
                .iter()
                .enumerate()
                .map(|(i, action)| format!("/quick {} {}", i + 1, action.label))
                .collect();
            if !actions.is_empty() {
                writeln!(self.out, "quick actions: {}", actions.join(" | "))?;
            }
        }

        if widget.is_ready() && !self.bound {
            self.bound = true;
            // Sends are rejected until the session binds, so everything in
            // the timeline now is resumed history.
            if let Some(last) = widget.messages().last() {
                let ago = format_relative(&last.timestamp, self.env.now());
                writeln!(self.out, "(resumed conversation, last message {ago})")?;
            }
        }

        for message in widget.messages().iter().skip(self.shown) {
            writeln!(self.out, "{}", message_line(message))?;
        }
        self.shown = widget.messages().len();

        if widget.is_typing() && !self.typing {
            writeln!(self.out, "  (tutor is typing...)")?;
        }
        self.typing = widget.is_typing();

        let error = widget.last_error().map(str::to_string);
        if error != self.error {
            if let Some(error) = &error {
                writeln!(self.out, "! {error}")?;
            }
            self.error = error;
        }

        self.out.flush()
    }
}

fn message_line(message: &Message) -> String {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "tutor",
    };
    format!("[{}] {who}: {}", format_time(&message.timestamp), message.content)
}

/// Write one line of command feedback outside the widget. Failures are
/// logged, never returned.
pub async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) {
    let result = async {
        out.write_all(format!("{line}\n").as_bytes()).await?;
        out.flush().await
    }
    .await;
    if let Err(error) = result {
        tracing::warn!(%error, "failed to write to terminal");
    }
}

impl<W: Write + Send, E: Environment> Renderer for TerminalRenderer<W, E> {
    fn render(&mut self, widget: &ChatWidget) {
        if let Err(error) = self.draw(widget) {
            tracing::warn!(%error, "failed to write to terminal");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };

    use chrono::{TimeDelta, TimeZone, Utc};
    use studychat_app::{WidgetConfig, WidgetEvent};
    use studychat_core::{ChannelFrame, ChatContext, ChatSession, ContextType, SessionId};
    use studychat_harness::SimEnv;

    use super::*;

    #[test]
    fn prints_only_what_changed() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 0).unwrap();
        let env = SimEnv::starting_at(now + TimeDelta::minutes(12));
        let mut renderer = TerminalRenderer::new(Vec::new(), env);
        let mut widget = ChatWidget::new(WidgetConfig::default());

        widget.open(ChatContext::new(ContextType::Topic, Some("t1".into())), true);
        renderer.render(&widget);
        widget.handle(WidgetEvent::SessionReady {
            attempt: 1,
            session: ChatSession {
                id: SessionId::new("s1"),
                context_type: ContextType::Topic,
                context_id: Some("t1".into()),
                messages: vec![Message::assistant("welcome back", now, None)],
            },
            connected: true,
        });
        renderer.render(&widget);
        widget.send("what is a borrow?", true, now);
        renderer.render(&widget);
        renderer.render(&widget);
        widget.handle(WidgetEvent::Frame {
            frame: ChannelFrame::typing(None, true),
            received_at: now,
        });
        renderer.render(&widget);
        widget.close(true);
        renderer.render(&widget);

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(
            output,
            "== Topic Discussion ==\n\
             quick actions: /quick 1 Simplify | /quick 2 Example | /quick 3 Quiz me\n\
             (resumed conversation, last message 12 minutes ago)\n\
             [09:05] tutor: welcome back\n\
             [09:05] you: what is a borrow?\n  \
             (tutor is typing...)\n\
             -- chat closed --\n"
        );
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn write_line_appends_newline() {
        let mut out = Vec::new();
        write_line(&mut out, "! unknown command /dance (try /help)").await;
        assert_eq!(out, b"! unknown command /dance (try /help)\n");
    }

    #[tokio::test]
    async fn write_line_swallows_write_errors() {
        write_line(&mut BrokenPipe, "lost").await;
    }

    #[test]
    fn general_context_has_no_quick_actions_line() {
        let mut renderer = TerminalRenderer::new(Vec::new(), SimEnv::new());
        let mut widget = ChatWidget::default();
        widget.open(ChatContext::general(), false);
        renderer.render(&widget);

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(output, "== General AI Chat ==\n");
    }
}
