//! PawChat terminal client, the composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the HTTP backend and start a chat session
//! 4. Print session events while reading commands from stdin

mod cli;
mod repl;

use std::sync::Arc;

use clap::Parser;
use pawchat_assist::IntentMatcher;
use pawchat_chat::{ChatBackend, ChatError, ChatSession, HttpChatBackend, SessionEvent};
use pawchat_core::config::PawchatConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::cli::CliArgs;
use crate::repl::{render_counterpart, Command, TimelinePrinter, HELP};

/// Print timeline changes, mode switches, and notices as they arrive.
async fn event_printer(mut events: broadcast::Receiver<SessionEvent>, mut printer: TimelinePrinter) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::TimelineUpdated(timeline)) => {
                for line in printer.update(&timeline) {
                    println!("{}", line);
                }
            }
            Ok(SessionEvent::ModeChanged(mode)) => println!("-- {} mode --", mode),
            Ok(SessionEvent::Notice(notice)) => println!("! {}", notice),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Run one command. Returns `false` when the user asked to quit.
async fn dispatch(session: &ChatSession, command: Command) -> bool {
    match command {
        Command::Quit => return false,
        Command::Help => println!("{}", HELP),
        Command::ToggleMode => {
            session.toggle_mode();
        }
        Command::Refresh => {
            if let Err(e) = session.refresh_now().await {
                println!("! {}", e);
            }
        }
        Command::Admins => match session.counterparts().await {
            Ok(roster) if roster.is_empty() => println!("No staff listed."),
            Ok(roster) => {
                for counterpart in &roster {
                    println!("{}", render_counterpart(counterpart));
                }
            }
            Err(e) => println!("! {}", e),
        },
        Command::Send(text) => match session.send_text(text).await {
            Ok(_) | Err(ChatError::EmptyMessage) => {}
            // Already reported through a notice.
            Err(ChatError::ConversationCreationFailed(_) | ChatError::SendFailed(_)) => {}
            Err(e) => println!("! {}", e),
        },
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = PawchatConfig::load_or_default(&config_file);
    args.apply(&mut config);

    // Tracing. Logs go to stderr so they do not interleave with the chat.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting PawChat v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");
    config.validate()?;

    let Some(user_id) = args.resolve_user_id() else {
        tracing::error!("No user id given; pass --user-id or set PAWCHAT_USER_ID");
        return Err("missing user id".into());
    };

    // Backend and session.
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpChatBackend::new(config.remote.clone())?);
    tracing::info!(base_url = %config.remote.base_url, "Remote backend ready");

    let session = ChatSession::start(
        user_id,
        config.chat.clone(),
        backend,
        IntentMatcher::default(),
    )
    .await;

    let mut printer = TimelinePrinter::new();
    for line in printer.update(&session.timeline()) {
        println!("{}", line);
    }
    println!("-- {} mode -- {}", session.mode(), HELP);
    let printer_task = tokio::spawn(event_printer(session.subscribe(), printer));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !dispatch(&session, Command::parse(&line)).await {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    session.shutdown();
    printer_task.abort();
    Ok(())
}
