//! relaybot: relays addressed chat messages to a text-generation service and
//! paces the replies back onto the channel.

pub mod activity;
pub mod config;
pub mod error;
pub mod llm;
pub mod messaging;
pub mod relay;
pub mod telemetry;
pub mod trigger;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// A message observed on the session, as handed to the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Nick of the sender.
    pub sender: String,
    /// Channel name or, for private messages, our own nick.
    pub target: String,
    pub text: String,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

impl ChannelMessage {
    pub fn new(
        sender: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            target: target.into(),
            text: text.into(),
            received_at: chrono::Utc::now(),
        }
    }

    /// Whether this message was sent to a channel rather than privately.
    pub fn is_channel_message(&self) -> bool {
        self.target.starts_with(['#', '&', '+', '!'])
    }
}

/// Events emitted by a session, delivered to the router in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Registration with the server completed.
    Connected,
    /// A PRIVMSG arrived.
    Message(ChannelMessage),
    /// The connection was lost and will not recover.
    Disconnected(String),
}

/// Collapse line breaks into spaces and trim the result. Both the activity
/// log and outbound replies are single-line.
pub fn normalize_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ").trim().to_string()
}
