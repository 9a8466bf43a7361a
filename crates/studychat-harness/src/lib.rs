//! Deterministic simulation harness for studychat engine testing.
//!
//! In-memory implementations of the collaborator traits and the environment
//! for deterministic, reproducible testing of the widget under arbitrary
//! interleavings of user input, connectivity changes and channel traffic.
//!
//! # Simulation
//!
//! - [`SimEnv`]: virtual clock, advanced explicitly
//! - [`SimBackend`] / [`SimStore`]: persisted sessions, scripted replies and
//!   queued failures
//! - [`SimTransport`]: the process-wide channel, with rooms, manual delivery
//!   and raw frame injection
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and real runtime, and
//! their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Use [`InvariantRegistry::standard()`] for the timeline, pending
//! and teardown invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_backend;
pub mod sim_env;
pub mod sim_transport;

pub use invariants::{
    ClosedWidgetFrozen, DiscardCountMonotonic, Invariant, InvariantKind, InvariantRegistry,
    InvariantResult, MessageSnapshot, PendingEchoIsLast, PendingMatchesSession, SystemSnapshot,
    TimelineAppendOnly, TypingRequiresSession, Violation, WidgetSnapshot,
};
pub use model::{ModelContext, ModelWidget, ObservableState, Operation, SmallText, model_reply};
pub use sim_backend::{BackendStats, Responder, SimBackend, SimStore};
pub use sim_env::SimEnv;
pub use sim_transport::SimTransport;
