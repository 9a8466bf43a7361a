//! Real-time channel frames and their validation boundary.
//!
//! The transport delivers loosely shaped `(event name, JSON payload)` pairs
//! ([`ChannelFrame`]). Nothing downstream of the subscription ever looks at a
//! raw frame: [`ChannelEvent::decode`] either produces a typed event or a
//! [`DecodeError`], and the caller counts the error as a discarded frame.
//!
//! # Wire format
//!
//! ```text
//! new_message  { "sessionId": "s1",
//!                "message": { "role": "assistant", "content": "...",
//!                             "timestamp": "2026-10-17T14:05:00Z",
//!                             "metadata": { ... } } }
//! typing       { "sessionId": "s1", "isTyping": true }
//! ```
//!
//! `timestamp`, `metadata` and the typing event's `sessionId` are optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DecodeError, Message, Role, SessionId, format::DateLike};

/// Event name for a message published to a session room.
pub const NEW_MESSAGE_EVENT: &str = "new_message";

/// Event name for assistant typing notifications.
pub const TYPING_EVENT: &str = "typing";

/// Raw frame as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFrame {
    /// Event name.
    pub event: String,
    /// Unvalidated payload.
    pub payload: Value,
}

impl ChannelFrame {
    /// Frame with an arbitrary event name and payload.
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self { event: event.into(), payload }
    }

    /// Encode a `new_message` frame.
    pub fn new_message(session_id: &SessionId, message: &Message) -> Self {
        let mut body = serde_json::json!({
            "role": message.role,
            "content": message.content,
            "timestamp": message.timestamp.to_rfc3339(),
        });
        if let (Some(metadata), Value::Object(map)) = (&message.metadata, &mut body) {
            map.insert("metadata".to_string(), metadata.clone());
        }

        Self::new(NEW_MESSAGE_EVENT, serde_json::json!({ "sessionId": session_id, "message": body }))
    }

    /// Encode a `typing` frame, optionally scoped to a session.
    pub fn typing(session_id: Option<&SessionId>, is_typing: bool) -> Self {
        let payload = match session_id {
            Some(id) => serde_json::json!({ "sessionId": id, "isTyping": is_typing }),
            None => serde_json::json!({ "isTyping": is_typing }),
        };
        Self::new(TYPING_EVENT, payload)
    }
}

/// Validated channel event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A message was published to a session room.
    NewMessage {
        /// Session the message belongs to.
        session_id: SessionId,
        /// The message.
        message: Message,
    },

    /// The assistant started or stopped typing.
    Typing {
        /// Session scope. `None` applies to whichever session is active.
        session_id: Option<SessionId>,
        /// Whether the indicator should be shown.
        is_typing: bool,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewMessagePayload {
    session_id: SessionId,
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    role: Role,
    content: String,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingPayload {
    #[serde(default)]
    session_id: Option<SessionId>,
    is_typing: bool,
}

impl ChannelEvent {
    /// Validate a raw frame.
    ///
    /// `received_at` stamps messages whose timestamp is missing or cannot be
    /// parsed; a bad timestamp alone never rejects a message.
    pub fn decode(frame: &ChannelFrame, received_at: DateTime<Utc>) -> Result<Self, DecodeError> {
        match frame.event.as_str() {
            NEW_MESSAGE_EVENT => {
                let payload: NewMessagePayload = serde_json::from_value(frame.payload.clone())
                    .map_err(|e| DecodeError::MalformedPayload {
                        event: NEW_MESSAGE_EVENT,
                        reason: e.to_string(),
                    })?;

                let wire = payload.message;
                let timestamp =
                    wire.timestamp.as_ref().and_then(wire_timestamp).unwrap_or(received_at);

                Ok(Self::NewMessage {
                    session_id: payload.session_id,
                    message: Message {
                        role: wire.role,
                        content: wire.content,
                        timestamp,
                        metadata: wire.metadata,
                    },
                })
            },
            TYPING_EVENT => {
                let payload: TypingPayload = serde_json::from_value(frame.payload.clone())
                    .map_err(|e| DecodeError::MalformedPayload {
                        event: TYPING_EVENT,
                        reason: e.to_string(),
                    })?;

                Ok(Self::Typing { session_id: payload.session_id, is_typing: payload.is_typing })
            },
            other => Err(DecodeError::UnknownEvent(other.to_string())),
        }
    }

    /// Session the event is scoped to. `None` for unscoped typing events.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::NewMessage { session_id, .. } => Some(session_id),
            Self::Typing { session_id, .. } => session_id.as_ref(),
        }
    }
}

fn wire_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => s.to_utc(),
        Value::Number(n) => n.as_i64().and_then(|v| v.to_utc()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn decodes_new_message() {
        let frame = ChannelFrame::new(
            NEW_MESSAGE_EVENT,
            json!({
                "sessionId": "s1",
                "message": {
                    "role": "assistant",
                    "content": "Ownership means one owner at a time.",
                    "timestamp": "2026-10-17T11:59:00Z",
                    "metadata": { "sources": ["book"] },
                },
            }),
        );

        let event = ChannelEvent::decode(&frame, received()).unwrap();
        let ChannelEvent::NewMessage { session_id, message } = event else {
            panic!("expected NewMessage");
        };
        assert_eq!(session_id.as_str(), "s1");
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.timestamp, Utc.with_ymd_and_hms(2026, 10, 17, 11, 59, 0).unwrap());
        assert_eq!(message.metadata, Some(json!({ "sources": ["book"] })));
    }

    #[test]
    fn bad_timestamp_falls_back_to_receipt_time() {
        for ts in [json!("whenever"), json!(null), json!(true)] {
            let frame = ChannelFrame::new(
                NEW_MESSAGE_EVENT,
                json!({ "sessionId": "s1", "message": { "role": "assistant", "content": "x", "timestamp": ts } }),
            );
            let Ok(ChannelEvent::NewMessage { message, .. }) = ChannelEvent::decode(&frame, received())
            else {
                panic!("message with bad timestamp should still decode");
            };
            assert_eq!(message.timestamp, received());
        }
    }

    #[test]
    fn numeric_timestamp_is_accepted() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap();
        let frame = ChannelFrame::new(
            NEW_MESSAGE_EVENT,
            json!({ "sessionId": "s1", "message": { "role": "user", "content": "x", "timestamp": at.timestamp_millis() } }),
        );
        let event = ChannelEvent::decode(&frame, received()).unwrap();
        assert!(matches!(event, ChannelEvent::NewMessage { message, .. } if message.timestamp == at));
    }

    #[test]
    fn rejects_malformed_payloads() {
        let cases = [
            ChannelFrame::new(NEW_MESSAGE_EVENT, json!({ "message": { "role": "assistant", "content": "x" } })),
            ChannelFrame::new(NEW_MESSAGE_EVENT, json!({ "sessionId": "s1", "message": { "role": "system", "content": "x" } })),
            ChannelFrame::new(NEW_MESSAGE_EVENT, json!({ "sessionId": 7, "message": { "role": "user", "content": "x" } })),
            ChannelFrame::new(NEW_MESSAGE_EVENT, json!("hello")),
            ChannelFrame::new(TYPING_EVENT, json!({ "sessionId": "s1" })),
            ChannelFrame::new(TYPING_EVENT, json!({ "isTyping": "yes" })),
        ];

        for frame in &cases {
            assert!(
                matches!(ChannelEvent::decode(frame, received()), Err(DecodeError::MalformedPayload { .. })),
                "{frame:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_unknown_events() {
        let frame = ChannelFrame::new("presence", json!({}));
        assert_eq!(
            ChannelEvent::decode(&frame, received()),
            Err(DecodeError::UnknownEvent("presence".into()))
        );
    }

    #[test]
    fn typing_scope_is_optional() {
        let scoped = ChannelFrame::typing(Some(&SessionId::new("s1")), true);
        let unscoped = ChannelFrame::typing(None, false);

        assert_eq!(
            ChannelEvent::decode(&scoped, received()),
            Ok(ChannelEvent::Typing { session_id: Some(SessionId::new("s1")), is_typing: true })
        );
        assert_eq!(
            ChannelEvent::decode(&unscoped, received()),
            Ok(ChannelEvent::Typing { session_id: None, is_typing: false })
        );
    }

    #[test]
    fn encoded_message_decodes_to_itself() {
        let message = Message::assistant("hi", received(), Some(json!({ "k": 1 })));
        let frame = ChannelFrame::new_message(&SessionId::new("s9"), &message);

        assert_eq!(
            ChannelEvent::decode(&frame, received()),
            Ok(ChannelEvent::NewMessage { session_id: SessionId::new("s9"), message })
        );
    }
}
