//! RelayService: routes session events through logging, trigger detection,
//! query dispatch and paced delivery.
//!
//! Events are handled one at a time in arrival order. A slow upstream query
//! or a long paced reply holds up the next message; message rates on a
//! single channel are low enough that this is acceptable.

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::error::{Result, SessionError};
use crate::llm::QueryDispatcher;
use crate::messaging::pacer::{self, PacerSettings};
use crate::messaging::{EventStream, Session};
use crate::trigger;
use crate::{ChannelMessage, SessionEvent};

use futures::StreamExt as _;

/// Everything the router needs, constructed once at startup.
pub struct RelayService {
    channel: String,
    activity_log: ActivityLog,
    dispatcher: QueryDispatcher,
    pacer: PacerSettings,
}

impl RelayService {
    pub fn new(
        channel: impl Into<String>,
        activity_log: ActivityLog,
        dispatcher: QueryDispatcher,
        pacer: PacerSettings,
    ) -> Self {
        Self {
            channel: channel.into(),
            activity_log,
            dispatcher,
            pacer,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.irc.channel.clone(),
            ActivityLog::new(config.relay.activity_log.clone()),
            QueryDispatcher::new(&config.llm)?,
            config.relay.pacer,
        ))
    }

    /// The watched channel.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Drive the event stream until the session goes away.
    pub async fn run<S: Session>(&self, session: &S, mut events: EventStream) -> Result<()> {
        while let Some(event) = events.next().await {
            self.handle_event(session, event).await?;
        }
        Err(SessionError::Disconnected("event stream ended".into()).into())
    }

    /// Handle one event. Only a lost session is an error.
    pub async fn handle_event<S: Session>(&self, session: &S, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Connected => {
                tracing::info!(channel = %self.channel, "session established, joining channel");
                if let Err(error) = session.join(&self.channel).await {
                    tracing::error!(channel = %self.channel, %error, "failed to join channel");
                }
                Ok(())
            }
            SessionEvent::Message(message) => {
                self.handle_message(session, message).await;
                Ok(())
            }
            SessionEvent::Disconnected(reason) => Err(SessionError::Disconnected(reason).into()),
        }
    }

    #[tracing::instrument(skip_all, fields(sender = %message.sender, target = %message.target))]
    async fn handle_message<S: Session>(&self, session: &S, message: ChannelMessage) {
        tracing::info!(text = %message.text, "message received");

        if message.target.eq_ignore_ascii_case(&self.channel) {
            // Failures are already logged by the writer.
            let _ = self
                .activity_log
                .append_at(message.received_at, &message.sender, &message.text)
                .await;
        }

        let Some(payload) = trigger::detect(&session.display_name(), &message.text).payload else {
            return;
        };
        if payload.is_empty() {
            tracing::debug!("addressed without a question, ignoring");
            return;
        }

        let reply_target = if message.is_channel_message() {
            message.target.as_str()
        } else {
            message.sender.as_str()
        };

        tracing::info!(%payload, "looking for answers");
        let outcome = self.dispatcher.ask(&payload).await;
        match &outcome {
            Ok(response) => tracing::info!(%response, "response received"),
            Err(error) => tracing::error!(
                kind = %error.kind(),
                detail = %error.detail(),
                "text-generation query failed"
            ),
        }

        let segments = pacer::plan(&outcome, &self.pacer);
        if let Err(error) = pacer::deliver(session, reply_target, segments).await {
            tracing::warn!(%error, target = %reply_target, "failed to deliver reply");
        }
    }
}
