//! IRC session adapter using the irc client crate.

use crate::config::IrcConfig;
use crate::error::SessionError;
use crate::messaging::traits::{EventStream, Session};
use crate::{ChannelMessage, SessionEvent};

use ::irc::client::prelude::{Client, Command, Config as ClientConfig, Message, Response};
use ::irc::client::Sender;
use futures::StreamExt as _;
use tokio::sync::mpsc;

use std::sync::{Arc, RwLock};

/// A registered IRC connection. Inbound traffic is read by a background
/// task and surfaced through the [`EventStream`] returned by `connect`.
pub struct IrcSession {
    /// Kept current by the read loop when the server renames us.
    nickname: Arc<RwLock<String>>,
    sender: Sender,
    shutdown_tx: mpsc::Sender<()>,
}

impl IrcSession {
    /// Connect, register, and start the read loop.
    pub async fn connect(config: &IrcConfig) -> crate::Result<(Self, EventStream)> {
        let client_config = ClientConfig {
            nickname: Some(config.nickname.clone()),
            server: Some(config.host.clone()),
            port: Some(config.port),
            password: Some(config.password.clone()),
            use_tls: Some(config.use_tls),
            ..ClientConfig::default()
        };

        let connect_error = |error: ::irc::error::Error| SessionError::Connect {
            server: config.address(),
            message: error.to_string(),
        };

        let mut client = Client::from_config(client_config)
            .await
            .map_err(connect_error)?;
        client.identify().map_err(connect_error)?;
        let mut incoming = client.stream().map_err(connect_error)?;

        let nickname = client.current_nickname().to_string();
        let sender = client.sender();

        tracing::info!(server = %config.address(), nick = %nickname, "irc connected");

        let (event_tx, event_rx) = mpsc::channel(256);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let nickname = Arc::new(RwLock::new(nickname));
        let own_nick = nickname.clone();

        tokio::spawn(async move {
            // The client owns connection state; keep it alive with the loop.
            let _client = client;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("irc message loop shutting down");
                        break;
                    }
                    message = incoming.next() => {
                        let event = match message {
                            Some(Ok(message)) => {
                                let mut current = read_nick(&own_nick);
                                if let Some(renamed) = own_nick_change(&message, &current) {
                                    tracing::info!(from = %current, to = %renamed, "own nick changed");
                                    match own_nick.write() {
                                        Ok(mut guard) => *guard = renamed.clone(),
                                        Err(poisoned) => *poisoned.into_inner() = renamed.clone(),
                                    }
                                    current = renamed;
                                }
                                match to_event(&message, &current) {
                                    Some(event) => event,
                                    None => continue,
                                }
                            }
                            Some(Err(error)) => {
                                tracing::error!(%error, "irc connection failed");
                                SessionEvent::Disconnected(error.to_string())
                            }
                            None => SessionEvent::Disconnected("connection closed".into()),
                        };

                        let disconnected = matches!(event, SessionEvent::Disconnected(_));
                        if event_tx.send(event).await.is_err() {
                            tracing::warn!("irc event receiver dropped");
                            break;
                        }
                        if disconnected {
                            break;
                        }
                    }
                }
            }
        });

        let session = Self {
            nickname,
            sender,
            shutdown_tx,
        };
        let stream = tokio_stream::wrappers::ReceiverStream::new(event_rx);
        Ok((session, Box::pin(stream)))
    }
}

impl Session for IrcSession {
    fn name(&self) -> &str {
        "irc"
    }

    fn display_name(&self) -> String {
        read_nick(&self.nickname)
    }

    async fn join(&self, channel: &str) -> crate::Result<()> {
        self.sender
            .send_join(channel)
            .map_err(|error| SessionError::Join {
                channel: channel.to_string(),
                message: error.to_string(),
            })?;
        Ok(())
    }

    async fn send(&self, target: &str, text: &str) -> crate::Result<()> {
        self.sender
            .send_privmsg(target, text)
            .map_err(|error| SessionError::Send {
                target: target.to_string(),
                message: error.to_string(),
            })?;
        Ok(())
    }

    async fn shutdown(&self) -> crate::Result<()> {
        if let Err(error) = self.sender.send_quit("") {
            tracing::debug!(%error, "failed to send QUIT");
        }
        self.shutdown_tx.send(()).await.ok();
        tracing::info!("irc session shut down");
        Ok(())
    }
}

fn read_nick(nickname: &RwLock<String>) -> String {
    match nickname.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// The nick we go by after `message`, if it renames us. Covers NICK
/// messages sourced from our own nick and the nick the server confirms in
/// its welcome.
fn own_nick_change(message: &Message, own_nick: &str) -> Option<String> {
    let renamed = match &message.command {
        Command::NICK(new_nick) => {
            let sender = message.source_nickname()?;
            if !sender.eq_ignore_ascii_case(own_nick) {
                return None;
            }
            new_nick
        }
        Command::Response(Response::RPL_WELCOME, args) => args.first()?,
        _ => return None,
    };
    (renamed != own_nick).then(|| renamed.clone())
}

/// Translate a protocol message into a router event. Our own messages and
/// everything other than registration and PRIVMSG are dropped.
fn to_event(message: &Message, own_nick: &str) -> Option<SessionEvent> {
    match &message.command {
        Command::Response(Response::RPL_WELCOME, _) => Some(SessionEvent::Connected),
        Command::PRIVMSG(target, text) => {
            let sender = message.source_nickname()?;
            if sender.eq_ignore_ascii_case(own_nick) {
                return None;
            }
            Some(SessionEvent::Message(ChannelMessage::new(sender, target, text)))
        }
        _ => None,
    }
}
