//! Text-generation provider access.

pub mod dispatcher;
pub mod types;

pub use dispatcher::{QueryDispatcher, QueryOutcome};
