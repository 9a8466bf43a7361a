//! Widget invariants.
//!
//! Most checks look at one snapshot; the transition checks compare a widget
//! snapshot with the predecessor it carries.

use studychat_core::Role;

use super::{Invariant, InvariantKind, InvariantResult, SystemSnapshot, Violation};

/// The timeline only grows within one initialization.
///
/// Between two snapshots with the same attempt count, the earlier message
/// list must be a prefix of the later one. A new initialization may start
/// over.
pub struct TimelineAppendOnly;

impl Invariant for TimelineAppendOnly {
    fn kind(&self) -> InvariantKind {
        InvariantKind::TimelineAppendOnly
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for widget in &state.widgets {
            let Some(previous) = widget.previous.as_deref() else {
                continue;
            };
            if previous.attempts != widget.attempts {
                continue;
            }

            if !widget.messages.starts_with(&previous.messages) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "widget {}: timeline went from {} to {} entries without being extended",
                        widget.id,
                        previous.messages.len(),
                        widget.messages.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A pending send always targets the bound session.
///
/// A pending flag without a session, or for another session, would either
/// block sends forever or let a foreign event release it.
pub struct PendingMatchesSession;

impl Invariant for PendingMatchesSession {
    fn kind(&self) -> InvariantKind {
        InvariantKind::PendingMatchesSession
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for widget in &state.widgets {
            if let Some(pending) = &widget.pending
                && widget.session_id.as_ref() != Some(pending)
            {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "widget {}: pending for {} while bound to {:?}",
                        widget.id, pending, widget.session_id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// While a send is pending, its echo is the newest entry.
///
/// Any message for the bound session confirms the send, so nothing can be
/// appended after the echo until pending clears.
pub struct PendingEchoIsLast;

impl Invariant for PendingEchoIsLast {
    fn kind(&self) -> InvariantKind {
        InvariantKind::PendingEchoIsLast
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for widget in &state.widgets {
            if widget.pending.is_none() {
                continue;
            }
            if widget.messages.last().map(|m| m.role) != Some(Role::User) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "widget {}: send pending but last entry is {:?}",
                        widget.id,
                        widget.messages.last()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// The typing indicator is only shown for a bound session.
pub struct TypingRequiresSession;

impl Invariant for TypingRequiresSession {
    fn kind(&self) -> InvariantKind {
        InvariantKind::TypingRequiresSession
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for widget in &state.widgets {
            if widget.typing && widget.session_id.is_none() {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("widget {}: typing shown without a session", widget.id),
                });
            }
        }
        Ok(())
    }
}

/// A closed widget never changes again.
pub struct ClosedWidgetFrozen;

impl Invariant for ClosedWidgetFrozen {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ClosedWidgetFrozen
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for widget in &state.widgets {
            let Some(previous) = widget.previous.as_deref() else {
                continue;
            };
            if !previous.closed {
                continue;
            }

            let frozen = widget.closed
                && widget.messages == previous.messages
                && widget.discarded_frames == previous.discarded_frames
                && widget.attempts == previous.attempts
                && !widget.typing
                && widget.pending.is_none();
            if !frozen {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("widget {}: state changed after close", widget.id),
                });
            }
        }
        Ok(())
    }
}

/// The discarded-frame counter never decreases.
pub struct DiscardCountMonotonic;

impl Invariant for DiscardCountMonotonic {
    fn kind(&self) -> InvariantKind {
        InvariantKind::DiscardCountMonotonic
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for widget in &state.widgets {
            if let Some(previous) = widget.previous.as_deref()
                && widget.discarded_frames < previous.discarded_frames
            {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "widget {}: discarded frames {} → {}",
                        widget.id, previous.discarded_frames, widget.discarded_frames
                    ),
                });
            }
        }
        Ok(())
    }
}
