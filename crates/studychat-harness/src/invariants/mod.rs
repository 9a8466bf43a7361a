//! Properties of the chat widget checked after every simulated step.
//!
//! Tests assert particular outcomes; these hold however user input and
//! channel traffic interleave.
//!
//! # Architecture
//!
//! Observable widget state is extracted into a [`SystemSnapshot`]; each
//! widget snapshot may carry its predecessor so transition properties
//! (append-only, frozen-after-close) can be checked too. Registered
//! [`Invariant`]s then run against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = WidgetSnapshot::capture(0, &widget);
//! registry.check_all(&SystemSnapshot::single(snapshot))?;
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    ClosedWidgetFrozen, DiscardCountMonotonic, PendingEchoIsLast, PendingMatchesSession,
    TimelineAppendOnly, TypingRequiresSession,
};
pub use snapshot::{MessageSnapshot, SystemSnapshot, WidgetSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Known invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantKind {
    /// See [`TimelineAppendOnly`].
    TimelineAppendOnly,
    /// See [`PendingMatchesSession`].
    PendingMatchesSession,
    /// See [`PendingEchoIsLast`].
    PendingEchoIsLast,
    /// See [`TypingRequiresSession`].
    TypingRequiresSession,
    /// See [`ClosedWidgetFrozen`].
    ClosedWidgetFrozen,
    /// See [`DiscardCountMonotonic`].
    DiscardCountMonotonic,
}

impl InvariantKind {
    /// Name for error reporting.
    pub fn name(self) -> &'static str {
        match self {
            Self::TimelineAppendOnly => "timeline_append_only",
            Self::PendingMatchesSession => "pending_matches_session",
            Self::PendingEchoIsLast => "pending_echo_is_last",
            Self::TypingRequiresSession => "typing_requires_session",
            Self::ClosedWidgetFrozen => "closed_widget_frozen",
            Self::DiscardCountMonotonic => "discard_count_monotonic",
        }
    }
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Violated invariant.
    pub invariant: InvariantKind,
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against system state.
pub trait Invariant: Send + Sync {
    /// Which invariant this is.
    fn kind(&self) -> InvariantKind;

    /// Check the invariant against the current state.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with every standard widget invariant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(TimelineAppendOnly);
        registry.add(PendingMatchesSession);
        registry.add(PendingEchoIsLast);
        registry.add(TypingRequiresSession);
        registry.add(ClosedWidgetFrozen);
        registry.add(DiscardCountMonotonic);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
