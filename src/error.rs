//! Top-level error types for relaybot.

use std::sync::Arc;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        source: Arc<std::io::Error>,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("please set env var {0}")]
    MissingKey(String),
}

/// Chat session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("could not connect to {server}: {message}")]
    Connect { server: String, message: String },

    #[error("session disconnected: {0}")]
    Disconnected(String),

    #[error("failed to send to {target}: {message}")]
    Send { target: String, message: String },

    #[error("failed to join {channel}: {message}")]
    Join { channel: String, message: String },
}

/// Classification of a failed text-generation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Upstream,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Protocol => write!(f, "protocol"),
            ErrorKind::Upstream => write!(f, "upstream"),
        }
    }
}

/// Text-generation query failures. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The endpoint could not be reached or the body could not be read.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The body did not have the expected shape. Carries the raw body.
    #[error("malformed response: {0}")]
    Protocol(String),

    /// The provider returned a structured error object.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Transport(_) => ErrorKind::Transport,
            QueryError::Protocol(_) => ErrorKind::Protocol,
            QueryError::Upstream(_) => ErrorKind::Upstream,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            QueryError::Transport(detail)
            | QueryError::Protocol(detail)
            | QueryError::Upstream(detail) => detail,
        }
    }
}
