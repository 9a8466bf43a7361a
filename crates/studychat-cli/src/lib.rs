//! Line-based terminal client for studychat.
//!
//! A thin shell over [`studychat_app::ChatRuntime`]: it parses input lines
//! into [`studychat_app::UserInput`]s and prints the widget as it changes.
//! All session, delivery and typing logic lives in the app crate.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod render;

pub use command::{Command, CommandError, HELP, parse_command};
pub use render::{TerminalRenderer, write_line};
