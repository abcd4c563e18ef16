//! Chat sessions and outbound pacing.

pub mod irc;
pub mod pacer;
#[cfg(test)]
pub mod testing;
pub mod traits;

pub use self::irc::IrcSession;
pub use traits::{EventStream, Session};
