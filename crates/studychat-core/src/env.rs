//! Environment abstraction for deterministic testing.
//!
//! Decouples engine logic from the system clock. Production code reads the
//! real wall clock; simulation uses a virtual clock that only moves when the
//! test advances it, so timestamps and typing timeouts are reproducible.

use chrono::{DateTime, Utc};

/// Abstract environment providing wall-clock time.
///
/// State machines never call this directly. The runtime reads the clock and
/// passes the instant in as a parameter, which keeps the state machines pure.
///
/// # Invariants
///
/// Implementations SHOULD return values that never decrease within one
/// execution context. Consumers tolerate a clock that steps backwards (all
/// elapsed-time arithmetic saturates at zero) but timestamps on optimistic
/// echoes will look out of order if it does.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}
