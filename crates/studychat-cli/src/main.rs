//! studychat terminal client.
//!
//! Runs the chat widget against an in-process backend so the session and
//! delivery behavior can be exercised without a server.
//!
//! # Usage
//!
//! ```bash
//! # Chat about a topic over the live channel
//! studychat --context topic --context-id ownership
//!
//! # Start offline: every send takes the request/response path
//! studychat --offline
//! ```

use std::time::Duration;

use clap::Parser;
use studychat_app::{ChatRuntime, SystemEnv, UserInput, WidgetConfig};
use studychat_cli::{Command, HELP, TerminalRenderer, parse_command, write_line};
use studychat_core::{ChatContext, ContextType};
use studychat_harness::{SimBackend, SimTransport};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// studychat terminal client
#[derive(Parser, Debug)]
#[command(name = "studychat")]
#[command(about = "Chat with the learning assistant from a terminal")]
#[command(version)]
struct Args {
    /// Context to open (topic, module, learning_path, general)
    #[arg(short, long, default_value = "general")]
    context: ContextType,

    /// Identifier of the topic, module or learning path
    #[arg(long)]
    context_id: Option<String>,

    /// User the in-process backend keys sessions on
    #[arg(short, long, default_value = "learner")]
    user: String,

    /// Start with the live channel down
    #[arg(long)]
    offline: bool,

    /// Clear a stuck typing indicator after this many seconds
    #[arg(long)]
    typing_timeout_secs: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let env = SystemEnv::new();
    let backend = SimBackend::new(env);
    let mut transport = SimTransport::new(backend.clone()).with_auto_delivery();
    if args.offline {
        transport = transport.disconnected();
    }

    let mut config = WidgetConfig::default();
    if let Some(secs) = args.typing_timeout_secs {
        config = config.with_typing_timeout(chrono::TimeDelta::seconds(i64::from(secs)));
    }

    tracing::info!(user = %args.user, context = %args.context, offline = args.offline, "starting");

    let mut runtime =
        ChatRuntime::new(backend.store_for(args.user), transport.clone(), env, config)
            .with_renderer(TerminalRenderer::new(std::io::stdout(), env));

    let (tx, rx) = mpsc::channel(16);
    tx.send(UserInput::Open(ChatContext::new(args.context, args.context_id))).await?;

    let reader = tokio::spawn(read_input(tx, transport));
    runtime.run(rx, Duration::from_millis(250)).await;
    reader.abort();

    Ok(())
}

/// Forward stdin lines to the runtime until `/quit` or end of input.
async fn read_input(tx: mpsc::Sender<UserInput>, transport: SimTransport) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::error!(%error, "failed to read input");
                break;
            },
        };
        if line.trim().is_empty() {
            continue;
        }

        let input = match parse_command(&line) {
            Ok(Command::Input(input)) => input,
            Ok(Command::Connect) => {
                transport.set_connected(true);
                continue;
            },
            Ok(Command::Disconnect) => {
                transport.set_connected(false);
                continue;
            },
            Ok(Command::Help) => {
                write_line(&mut stdout, HELP).await;
                continue;
            },
            Ok(Command::Quit) => break,
            Err(error) => {
                write_line(&mut stdout, &format!("! {error}")).await;
                continue;
            },
        };

        if tx.send(input).await.is_err() {
            break;
        }
    }
}
