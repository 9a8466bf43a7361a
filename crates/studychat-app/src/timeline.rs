//! Message reconciliation.
//!
//! The [`Timeline`] is the single ordered list the user sees. It has three
//! producers: the local optimistic echo, real-time channel deliveries, and
//! fallback replies. All of them append to the tail.
//!
//! There is no reconciliation by identity. An incoming message is never
//! matched against an earlier echo. Duplicates are ruled out upstream instead:
//! the [`crate::Dispatcher`] uses exactly one channel per send, so every send
//! yields one echo plus at most one confirmation. Order is insertion order and
//! is never re-sorted by timestamp.

use chrono::{DateTime, Utc};
use studychat_core::Message;

/// Append-only message list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    messages: Vec<Message>,
}

impl Timeline {
    /// Empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list wholesale with persisted history.
    pub fn seed(&mut self, initial: Vec<Message>) {
        self.messages = initial;
    }

    /// Drop every message. Used when the widget switches sessions.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Append the optimistic echo of a user submission.
    pub fn append_local_echo(&mut self, content: impl Into<String>, now: DateTime<Utc>) -> &Message {
        self.push(Message::user(content, now))
    }

    /// Append a message delivered by either channel.
    pub fn append_from_channel(&mut self, message: Message) -> &Message {
        self.push(message)
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message. `None` if empty.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use studychat_core::Role;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 10, minute, 0).unwrap()
    }

    #[test]
    fn seed_replaces_existing() {
        let mut timeline = Timeline::new();
        timeline.append_local_echo("draft", at(0));

        timeline.seed(vec![Message::assistant("welcome back", at(1), None)]);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.messages()[0].content, "welcome back");
    }

    #[test]
    fn echo_is_user_message_with_client_time() {
        let mut timeline = Timeline::new();
        let echo = timeline.append_local_echo("hello", at(5));

        assert_eq!(echo.role, Role::User);
        assert_eq!(echo.timestamp, at(5));
        assert!(echo.metadata.is_none());
    }

    #[test]
    fn channel_messages_are_never_merged_with_echo() {
        let mut timeline = Timeline::new();
        timeline.append_local_echo("hello", at(5));
        timeline.append_from_channel(Message::user("hello", at(5)));

        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn insertion_order_wins_over_timestamps() {
        let mut timeline = Timeline::new();
        timeline.append_from_channel(Message::assistant("later", at(30), None));
        timeline.append_local_echo("earlier", at(10));

        let contents: Vec<_> = timeline.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["later", "earlier"]);
    }
}
