//! Typing indicator.
//!
//! Two states, `Idle` and `Typing`, driven only by channel events. The
//! indicator is not part of the timeline and is never persisted.
//!
//! ```text
//!            typing=true (same or no scope)
//!   ┌──────┐ ─────────────────────────────> ┌────────┐
//!   │ Idle │                                │ Typing │
//!   └──────┘ <───────────────────────────── └────────┘
//!            typing=false (same or no scope)
//!            Tick past timeout (opt-in)
//! ```
//!
//! Events scoped to another session never change state.

use chrono::{DateTime, TimeDelta, Utc};
use studychat_core::SessionId;

/// Indicator state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypingState {
    /// Nothing shown.
    #[default]
    Idle,
    /// Assistant is typing.
    Typing {
        /// Time of the most recent `typing=true` event.
        since: DateTime<Utc>,
    },
}

/// Result of applying a typing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingOutcome {
    /// Visible state flipped.
    Changed,
    /// Event accepted but the indicator already showed that state.
    Unchanged,
    /// Event was scoped to a different session and ignored.
    Stale,
}

/// Session-scoped typing indicator.
#[derive(Debug, Clone)]
pub struct TypingIndicator {
    state: TypingState,
    timeout: Option<TimeDelta>,
}

impl TypingIndicator {
    /// Idle indicator. `timeout` enables the opt-in auto-clear.
    pub fn new(timeout: Option<TimeDelta>) -> Self {
        Self { state: TypingState::Idle, timeout }
    }

    /// Apply a typing event for the `active` session.
    ///
    /// An unscoped event (`scope == None`) applies to the active session.
    pub fn apply(
        &mut self,
        scope: Option<&SessionId>,
        active: &SessionId,
        is_typing: bool,
        now: DateTime<Utc>,
    ) -> TypingOutcome {
        if scope.is_some_and(|id| id != active) {
            return TypingOutcome::Stale;
        }

        let was_typing = self.is_typing();
        self.state = if is_typing { TypingState::Typing { since: now } } else { TypingState::Idle };

        if was_typing == is_typing { TypingOutcome::Unchanged } else { TypingOutcome::Changed }
    }

    /// Advance time. Returns true if the timeout cleared the indicator.
    ///
    /// Always false when no timeout is configured.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        let (Some(timeout), TypingState::Typing { since }) = (self.timeout, self.state) else {
            return false;
        };

        // A clock that stepped backwards reads as zero elapsed.
        let elapsed = now.signed_duration_since(since).max(TimeDelta::zero());
        if elapsed >= timeout {
            self.state = TypingState::Idle;
            true
        } else {
            false
        }
    }

    /// Force idle (session switch, teardown).
    pub fn reset(&mut self) {
        self.state = TypingState::Idle;
    }

    /// Current state.
    pub fn state(&self) -> TypingState {
        self.state
    }

    /// True while the indicator is shown.
    pub fn is_typing(&self) -> bool {
        matches!(self.state, TypingState::Typing { .. })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 10, 0, second).unwrap()
    }

    fn s(id: &str) -> SessionId {
        SessionId::new(id)
    }

    #[test]
    fn scoped_event_for_active_session_applies() {
        let mut typing = TypingIndicator::new(None);
        let outcome = typing.apply(Some(&s("s1")), &s("s1"), true, at(0));

        assert_eq!(outcome, TypingOutcome::Changed);
        assert!(typing.is_typing());
    }

    #[test]
    fn event_for_other_session_is_stale() {
        let mut typing = TypingIndicator::new(None);
        let outcome = typing.apply(Some(&s("s1")), &s("s2"), true, at(0));

        assert_eq!(outcome, TypingOutcome::Stale);
        assert_eq!(typing.state(), TypingState::Idle);
    }

    #[test]
    fn unscoped_event_applies_to_active() {
        let mut typing = TypingIndicator::new(None);
        typing.apply(None, &s("s1"), true, at(0));
        assert!(typing.is_typing());

        assert_eq!(typing.apply(None, &s("s1"), false, at(1)), TypingOutcome::Changed);
        assert!(!typing.is_typing());
    }

    #[test]
    fn repeated_typing_refreshes_since() {
        let mut typing = TypingIndicator::new(None);
        typing.apply(None, &s("s1"), true, at(0));

        assert_eq!(typing.apply(None, &s("s1"), true, at(7)), TypingOutcome::Unchanged);
        assert_eq!(typing.state(), TypingState::Typing { since: at(7) });
    }

    #[test]
    fn without_timeout_indicator_stays_on() {
        let mut typing = TypingIndicator::new(None);
        typing.apply(None, &s("s1"), true, at(0));

        assert!(!typing.tick(at(59)));
        assert!(typing.is_typing());
    }

    #[test]
    fn timeout_clears_after_quiet_period() {
        let mut typing = TypingIndicator::new(Some(TimeDelta::seconds(10)));
        typing.apply(None, &s("s1"), true, at(0));

        assert!(!typing.tick(at(9)));
        assert!(typing.tick(at(10)));
        assert!(!typing.is_typing());
        assert!(!typing.tick(at(20)), "idle indicator has nothing to clear");
    }

    #[test]
    fn backwards_clock_never_clears() {
        let mut typing = TypingIndicator::new(Some(TimeDelta::seconds(10)));
        typing.apply(None, &s("s1"), true, at(30));

        assert!(!typing.tick(at(0)));
        assert!(typing.is_typing());
    }
}
