//! Application layer for the studychat widget.
//!
//! Pure state machines and a generic runtime for session synchronization,
//! so the same code runs in production and in deterministic simulation.
//!
//! # Components
//!
//! - [`Timeline`]: Append-only message list fed by three producers
//! - [`TypingIndicator`]: Session-scoped typing state
//! - [`SessionController`]: Create-or-resume, room binding and teardown
//! - [`Dispatcher`]: Per-send channel choice and the pending-send gate
//! - [`ChatWidget`]: Composes the above; consumes [`WidgetEvent`]s and
//!   produces [`WidgetAction`]s
//! - [`SessionStore`] / [`Transport`]: Collaborator traits for I/O
//! - [`ChatRuntime`]: Executes widget actions against the collaborators

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod config;
mod controller;
mod dispatcher;
mod driver;
mod event;
mod runtime;
mod system_env;
mod timeline;
mod typing;
mod widget;

pub use action::WidgetAction;
pub use config::{DEFAULT_QUICK_ACTIONS, DEFAULT_TYPING_TIMEOUT, WidgetConfig};
pub use controller::{SessionController, SessionPhase};
pub use dispatcher::{DeliveryChannel, Dispatcher, PendingSend, SendRejected};
pub use driver::{NullRenderer, Renderer, SessionStore, Subscription, Transport};
pub use event::WidgetEvent;
pub use runtime::{ChatRuntime, UserInput};
pub use system_env::SystemEnv;
pub use timeline::Timeline;
pub use typing::{TypingIndicator, TypingOutcome, TypingState};
pub use widget::ChatWidget;
