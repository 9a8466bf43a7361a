//! Virtual clock environment.
//!
//! Time only moves when a test advances it, so timestamps on echoes and
//! replies, relative formatting and typing timeouts are reproducible.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use studychat_core::Environment;

/// Default start of simulated time: 2026-10-17T09:00:00Z.
const DEFAULT_START_SECS: i64 = 1_792_227_600;

/// Simulation environment with a shared virtual clock.
///
/// Clones share the clock: advancing one advances all of them.
#[derive(Debug, Clone)]
pub struct SimEnv {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Clock starting at the default instant.
    pub fn new() -> Self {
        Self::starting_at(DateTime::UNIX_EPOCH + TimeDelta::seconds(DEFAULT_START_SECS))
    }

    /// Clock starting at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.clock();
        *now += by;
    }

    fn clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    fn now(&self) -> DateTime<Utc> {
        *self.clock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::new();
        let other = env.clone();
        let start = env.now();

        other.advance(TimeDelta::seconds(90));
        assert_eq!(env.now() - start, TimeDelta::seconds(90));
    }

    #[test]
    fn time_stands_still_unless_advanced() {
        let env = SimEnv::new();
        assert_eq!(env.now(), env.now());
    }
}
