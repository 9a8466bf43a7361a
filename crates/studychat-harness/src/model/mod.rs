//! Model-based testing support.
//!
//! [`ModelWidget`] is a deliberately simple reference implementation of one
//! widget plus its backend. Random [`Operation`] sequences are applied to
//! both the model and the real runtime; their [`ObservableState`]s must
//! match after every step.

mod operation;
mod widget;

pub use operation::{ModelContext, Operation, SmallText};
pub use widget::{ModelWidget, ObservableState, model_reply};
