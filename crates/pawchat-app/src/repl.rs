//! Line commands and message rendering for the terminal chat.

use std::collections::HashMap;

use chrono::Local;
use pawchat_core::types::{Counterpart, DeliveryState, Message, MessageId, Provenance, SenderRole};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    ToggleMode,
    Refresh,
    Admins,
    Help,
    Quit,
}

impl Command {
    /// Parse a line. Unknown slash commands are sent as text.
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/mode" => Command::ToggleMode,
            "/refresh" => Command::Refresh,
            "/admins" => Command::Admins,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Send(line.to_string()),
        }
    }
}

pub const HELP: &str =
    "Commands: /mode toggles assisted chat, /refresh checks for replies, /admins lists staff, /quit exits";

/// Format a message for the terminal.
pub fn render_message(message: &Message) -> String {
    let who = match (message.sender, message.provenance) {
        (SenderRole::User, _) => "You",
        (SenderRole::Counterpart, Provenance::Assisted) => "Assistant",
        (SenderRole::Counterpart, Provenance::Persisted) => "Clinic",
    };
    let time = message
        .timestamp
        .map(|t| format!("[{}] ", t.with_timezone(&Local).format("%H:%M")))
        .unwrap_or_default();
    let status = match message.delivery {
        Some(DeliveryState::Pending) => " (sending)",
        Some(DeliveryState::Failed) => " (not sent)",
        Some(DeliveryState::Sent) | None => "",
    };
    format!("{}{}: {}{}", time, who, message.body, status)
}

pub fn render_counterpart(counterpart: &Counterpart) -> String {
    let name = counterpart.name.as_deref().unwrap_or("(unnamed)");
    match counterpart.email.as_deref() {
        Some(email) => format!("#{} {} <{}>", counterpart.id, name, email),
        None => format!("#{} {}", counterpart.id, name),
    }
}

/// Remembers what has been printed so each timeline update shows only changes.
#[derive(Default)]
pub struct TimelinePrinter {
    shown: HashMap<MessageId, Option<DeliveryState>>,
}

impl TimelinePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines for messages that are new or whose failure is newly known.
    pub fn update(&mut self, timeline: &[Message]) -> Vec<String> {
        let mut lines = Vec::new();
        for message in timeline {
            let previous = self.shown.insert(message.id.clone(), message.delivery);
            let newly_failed = message.delivery == Some(DeliveryState::Failed)
                && previous != Some(Some(DeliveryState::Failed));
            if previous.is_none() || newly_failed {
                lines.push(render_message(message));
            }
        }
        lines
    }
}
