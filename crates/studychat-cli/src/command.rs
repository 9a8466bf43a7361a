//! Line input parsing.
//!
//! Lines starting with `/` are commands; anything else is chat text.

use studychat_app::UserInput;
use studychat_core::{ChatContext, ContextType, error::ParseContextError};
use thiserror::Error;

/// Help text for `/help`.
pub const HELP: &str = "\
commands:
  /open <topic|module|learning_path|general> [id]   switch context
  /quick <n>                                        send quick action n
  /connect, /disconnect                             toggle the live channel
  /quit                                             leave
anything else is sent as a message";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward to the runtime.
    Input(UserInput),
    /// Bring the simulated transport up.
    Connect,
    /// Take the simulated transport down.
    Disconnect,
    /// Show help.
    Help,
    /// Leave.
    Quit,
}

/// Input line that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown `/command`.
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),

    /// Required argument missing.
    #[error("/{command} needs {argument}")]
    MissingArgument {
        /// Command name.
        command: &'static str,
        /// What is missing.
        argument: &'static str,
    },

    /// `/quick` index is not a positive number.
    #[error("invalid quick action number: {0}")]
    InvalidIndex(String),

    /// `/open` context type not recognized.
    #[error(transparent)]
    Context(#[from] ParseContextError),
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let Some(rest) = line.trim().strip_prefix('/') else {
        return Ok(Command::Input(UserInput::Send(line.to_string())));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    match name {
        "quit" | "exit" => Ok(Command::Quit),
        "help" => Ok(Command::Help),
        "connect" => Ok(Command::Connect),
        "disconnect" => Ok(Command::Disconnect),
        "quick" => {
            let arg = words.next().ok_or(CommandError::MissingArgument {
                command: "quick",
                argument: "an action number",
            })?;
            let index = arg
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| CommandError::InvalidIndex(arg.to_string()))?;
            Ok(Command::Input(UserInput::QuickAction(index)))
        },
        "open" => {
            let kind = words.next().ok_or(CommandError::MissingArgument {
                command: "open",
                argument: "a context type",
            })?;
            let context_type: ContextType = kind.parse()?;
            let context_id = words.next().map(str::to_string);
            Ok(Command::Input(UserInput::Open(ChatContext::new(context_type, context_id))))
        },
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
