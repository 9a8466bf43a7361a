//! Error types for the studychat engine.
//!
//! Strongly-typed errors for each boundary: the session store
//! ([`StoreError`]), the real-time channel validation boundary
//! ([`DecodeError`]) and textual context parsing ([`ParseContextError`]).
//!
//! None of these are fatal to the application. The state machines turn them
//! into status updates or discard counters rather than propagating them to the
//! rendering layer.

use thiserror::Error;

/// Errors reported by the session store collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store could not be reached.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// Store answered but refused the request.
    #[error("session store rejected request ({status}): {message}")]
    Rejected {
        /// Status code reported by the store.
        status: u16,
        /// Human-readable reason.
        message: String,
    },

    /// Request did not complete in time.
    ///
    /// Timeouts are enforced by the store's own request layer, never by the
    /// engine.
    #[error("session store request timed out")]
    Timeout,

    /// Response could not be interpreted.
    #[error("malformed session store response: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Returns true if retrying the same request may succeed.
    ///
    /// Rejections and malformed responses indicate the request itself is the
    /// problem; resending it unchanged will fail the same way.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Errors raised while validating a raw channel frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Event name is not one the engine subscribes to.
    #[error("unknown channel event: {0}")]
    UnknownEvent(String),

    /// Payload does not match the schema for its event.
    #[error("malformed {event} payload: {reason}")]
    MalformedPayload {
        /// Event name the payload arrived under.
        event: &'static str,
        /// Why validation failed.
        reason: String,
    },
}

/// Error parsing a [`crate::ContextType`] from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown context type {0:?} (expected topic, module, learning_path or general)")]
pub struct ParseContextError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_errors_are_transient() {
        assert!(StoreError::Unavailable("connection refused".into()).is_transient());
        assert!(StoreError::Timeout.is_transient());
    }

    #[test]
    fn request_errors_are_not_transient() {
        assert!(
            !StoreError::Rejected { status: 403, message: "forbidden".into() }.is_transient()
        );
        assert!(!StoreError::Malformed("missing id".into()).is_transient());
    }

    #[test]
    fn decode_error_names_event() {
        let err = DecodeError::MalformedPayload { event: "typing", reason: "missing isTyping".into() };
        assert_eq!(err.to_string(), "malformed typing payload: missing isTyping");
    }
}
