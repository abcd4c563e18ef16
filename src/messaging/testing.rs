//! In-memory session that records joins and sends.

use crate::error::{Result, SessionError};
use crate::messaging::traits::Session;

use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    pub target: String,
    pub text: String,
    pub at: tokio::time::Instant,
}

pub struct RecordingSession {
    nick: String,
    fail_after: Option<usize>,
    joins: Mutex<Vec<String>>,
    sends: Mutex<Vec<RecordedSend>>,
}

impl RecordingSession {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            fail_after: None,
            joins: Mutex::new(Vec::new()),
            sends: Mutex::new(Vec::new()),
        }
    }

    /// Make every send after the first `count` fail.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn joins(&self) -> Vec<String> {
        self.joins.lock().expect("joins lock poisoned").clone()
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().expect("sends lock poisoned").clone()
    }
}

impl Session for RecordingSession {
    fn name(&self) -> &str {
        "recording"
    }

    fn display_name(&self) -> String {
        self.nick.clone()
    }

    async fn join(&self, channel: &str) -> Result<()> {
        self.joins
            .lock()
            .expect("joins lock poisoned")
            .push(channel.to_string());
        Ok(())
    }

    async fn send(&self, target: &str, text: &str) -> Result<()> {
        let mut sends = self.sends.lock().expect("sends lock poisoned");
        if self.fail_after.is_some_and(|limit| sends.len() >= limit) {
            return Err(SessionError::Send {
                target: target.to_string(),
                message: "connection reset".into(),
            }
            .into());
        }
        sends.push(RecordedSend {
            target: target.to_string(),
            text: text.to_string(),
            at: tokio::time::Instant::now(),
        });
        Ok(())
    }
}
