//! Session trait: the chat-protocol connection the relay runs on.

use crate::SessionEvent;
use crate::error::Result;

use futures::Stream;
use std::pin::Pin;

/// Inbound event stream type.
pub type EventStream = Pin<Box<dyn Stream<Item = SessionEvent> + Send>>;

/// A connected chat session. Events arrive separately through the
/// [`EventStream`] returned at connect time, strictly in arrival order.
pub trait Session: Send + Sync + 'static {
    /// Unique name for this adapter.
    fn name(&self) -> &str;

    /// The nick the session is currently registered under. May change over
    /// the lifetime of the session.
    fn display_name(&self) -> String;

    /// Join a channel.
    fn join(&self, channel: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Send one line of text to a channel or nick.
    fn send(
        &self,
        target: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Graceful shutdown.
    fn shutdown(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
