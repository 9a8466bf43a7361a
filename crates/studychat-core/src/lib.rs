//! Core types for the studychat session synchronization engine.
//!
//! Everything in this crate is pure: no I/O, no async runtime. Higher layers
//! ([`studychat-app`], the simulation harness) build state machines on top of
//! these types.
//!
//! # Modules
//!
//! - [`message`]: Timeline entries ([`Message`], [`Role`])
//! - [`session`]: Sessions, contexts and the quick-action menu
//! - [`channel`]: Real-time channel frames and the validation boundary that
//!   turns loosely shaped payloads into [`ChannelEvent`]s
//! - [`format`]: Tolerant timestamp parsing and display formatting
//! - [`env`]: Clock abstraction for deterministic testing
//! - [`error`]: Error types shared across layers
//!
//! [`studychat-app`]: https://docs.rs/studychat-app

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
pub mod env;
pub mod error;
pub mod format;
pub mod message;
pub mod session;

pub use channel::{ChannelEvent, ChannelFrame, NEW_MESSAGE_EVENT, TYPING_EVENT};
pub use env::Environment;
pub use error::{DecodeError, ParseContextError, StoreError};
pub use message::{FallbackReply, Message, Role};
pub use session::{ChatContext, ChatSession, ContextType, QuickAction, SessionId};
