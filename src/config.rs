//! Configuration loading and validation.
//!
//! Settings come from the environment, optionally layered over a TOML file.
//! Secrets (server password, API key) are only read from the environment.

use crate::error::{ConfigError, Result};
use crate::messaging::pacer::{DEFAULT_SEGMENT_DELAY, DEFAULT_SEGMENT_LENGTH, PacerSettings};

use anyhow::Context as _;
use rand::Rng as _;
use serde::Deserialize;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const ENV_SERVER: &str = "IRC_SERVER";
pub const ENV_NICK: &str = "IRC_NICK";
pub const ENV_SERVER_PASSWORD: &str = "IRC_SERVER_PASSWORD";
pub const ENV_CHANNEL: &str = "IRC_CHANNEL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_USE_TLS: &str = "IRC_USE_TLS";
pub const ENV_MODEL: &str = "OPENAI_MODEL";
pub const ENV_API_URL: &str = "OPENAI_API_URL";
pub const ENV_ACTIVITY_LOG: &str = "RELAYBOT_ACTIVITY_LOG";
pub const ENV_REQUEST_TIMEOUT: &str = "RELAYBOT_REQUEST_TIMEOUT_SECS";
pub const ENV_SEGMENT_LENGTH: &str = "RELAYBOT_SEGMENT_LENGTH";
pub const ENV_SEGMENT_DELAY: &str = "RELAYBOT_SEGMENT_DELAY_MS";

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TLS_PORT: u16 = 6697;
const DEFAULT_PLAIN_PORT: u16 = 6667;

/// Relaybot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub irc: IrcConfig,
    pub llm: LlmConfig,
    pub relay: RelayConfig,
}

/// IRC connection settings.
#[derive(Debug, Clone)]
pub struct IrcConfig {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    /// Nick seed with the random two-digit suffix already applied.
    pub nickname: String,
    pub password: String,
    /// Watched channel, always `#`-prefixed.
    pub channel: String,
}

impl IrcConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Text-generation provider settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

/// Relay behavior settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub activity_log: PathBuf,
    pub pacer: PacerSettings,
}

/// Optional on-disk overrides. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub irc: FileIrcConfig,
    pub llm: FileLlmConfig,
    pub relay: FileRelayConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileIrcConfig {
    pub server: Option<String>,
    pub nick: Option<String>,
    pub channel: Option<String>,
    pub use_tls: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileLlmConfig {
    pub model: Option<String>,
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileRelayConfig {
    pub activity_log: Option<PathBuf>,
    pub segment_length: Option<usize>,
    pub segment_delay_ms: Option<u64>,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        Self::finish(FileConfig::default())
    }

    /// Load from a TOML file, with the environment taking precedence.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.display().to_string(),
            source: Arc::new(source),
        })?;
        let file = parse_file(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })?;
        Self::finish(file)
    }

    fn finish(file: FileConfig) -> Result<Self> {
        let suffix = rand::rng().random_range(0..100u8);
        let config = Self::from_sources(file, |key| std::env::var(key).ok(), suffix)?;

        if let Some(parent) = config.relay.activity_log.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create activity log directory: {}", parent.display())
            })?;
        }

        Ok(config)
    }

    /// Resolve a configuration from a file layer and an environment lookup.
    /// `nick_suffix` is appended to the nick seed as two digits.
    pub fn from_sources(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        nick_suffix: u8,
    ) -> Result<Self> {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let server = lookup(ENV_SERVER).or(file.irc.server);
        let nick = lookup(ENV_NICK).or(file.irc.nick);
        let password = lookup(ENV_SERVER_PASSWORD);
        let channel = lookup(ENV_CHANNEL).or(file.irc.channel);
        let api_key = lookup(ENV_API_KEY);

        let server = server.ok_or_else(|| missing(ENV_SERVER))?;
        let nick = nick.ok_or_else(|| missing(ENV_NICK))?;
        let password = password.ok_or_else(|| missing(ENV_SERVER_PASSWORD))?;
        let channel = channel.ok_or_else(|| missing(ENV_CHANNEL))?;
        let api_key = api_key.ok_or_else(|| missing(ENV_API_KEY))?;

        let use_tls = match lookup(ENV_USE_TLS) {
            Some(value) => parse_bool(ENV_USE_TLS, &value)?,
            None => file.irc.use_tls.unwrap_or(false),
        };
        let (host, port) = parse_server(&server, use_tls)?;

        let irc = IrcConfig {
            host,
            port,
            use_tls,
            nickname: display_name(&nick, nick_suffix),
            password,
            channel: normalize_channel(&channel)?,
        };

        let request_timeout_secs = match lookup(ENV_REQUEST_TIMEOUT) {
            Some(value) => parse_number(ENV_REQUEST_TIMEOUT, &value)?,
            None => file
                .llm
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request timeout must be positive".into()).into());
        }

        let llm = LlmConfig {
            api_key,
            api_url: lookup(ENV_API_URL)
                .or(file.llm.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.into()),
            model: lookup(ENV_MODEL)
                .or(file.llm.model)
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            request_timeout: Duration::from_secs(request_timeout_secs),
        };

        let max_segment_len = match lookup(ENV_SEGMENT_LENGTH) {
            Some(value) => parse_number(ENV_SEGMENT_LENGTH, &value)?,
            None => file.relay.segment_length.unwrap_or(DEFAULT_SEGMENT_LENGTH),
        };
        if max_segment_len == 0 {
            return Err(ConfigError::Invalid("segment length must be positive".into()).into());
        }
        let inter_segment_delay = match lookup(ENV_SEGMENT_DELAY) {
            Some(value) => Duration::from_millis(parse_number(ENV_SEGMENT_DELAY, &value)?),
            None => file
                .relay
                .segment_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SEGMENT_DELAY),
        };

        let relay = RelayConfig {
            activity_log: lookup(ENV_ACTIVITY_LOG)
                .map(PathBuf::from)
                .or(file.relay.activity_log)
                .unwrap_or_else(default_activity_log),
            pacer: PacerSettings {
                max_segment_len,
                inter_segment_delay,
            },
        };

        Ok(Self { irc, llm, relay })
    }
}

fn parse_file(content: &str) -> std::result::Result<FileConfig, String> {
    toml::from_str(content).map_err(|error| error.to_string())
}

fn missing(key: &str) -> crate::Error {
    ConfigError::MissingKey(key.to_string()).into()
}

/// Default activity log location inside the platform data directory.
pub fn default_activity_log() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("relaybot"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("activity.log")
}

/// Nick seed plus a two-digit suffix, so several instances can share a seed.
pub fn display_name(seed: &str, suffix: u8) -> String {
    format!("{}{:02}", seed.trim(), suffix % 100)
}

/// Split `host[:port]`, falling back to the conventional port for the
/// transport. IPv6 literals are written `[addr]` or `[addr]:port`; a bare
/// literal without brackets is accepted only when it carries no port.
fn parse_server(server: &str, use_tls: bool) -> Result<(String, u16)> {
    let server = server.trim();
    let default_port = if use_tls {
        DEFAULT_TLS_PORT
    } else {
        DEFAULT_PLAIN_PORT
    };
    let invalid = |reason: &str| -> crate::Error {
        ConfigError::Invalid(format!("{reason} in {ENV_SERVER}: {server}")).into()
    };
    let parse_port = |port: &str| port.parse::<u16>().map_err(|_| invalid("invalid port"));

    let (host, port) = if let Some(bracketed) = server.strip_prefix('[') {
        let (host, rest) = bracketed
            .split_once(']')
            .ok_or_else(|| invalid("unterminated IPv6 address"))?;
        if host.parse::<std::net::Ipv6Addr>().is_err() {
            return Err(invalid("invalid IPv6 address"));
        }
        let port = match rest {
            "" => default_port,
            rest => match rest.strip_prefix(':') {
                Some(port) => parse_port(port)?,
                None => return Err(invalid("unexpected text after IPv6 address")),
            },
        };
        (host, port)
    } else if server.matches(':').count() > 1 {
        if server.parse::<std::net::Ipv6Addr>().is_err() {
            return Err(invalid("IPv6 addresses with a port need brackets"));
        }
        (server, default_port)
    } else {
        match server.rsplit_once(':') {
            Some((host, port)) => (host, parse_port(port)?),
            None => (server, default_port),
        }
    };

    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    Ok((host.to_string(), port))
}

fn normalize_channel(channel: &str) -> Result<String> {
    let channel = channel.trim();
    if channel.contains([' ', ',', '\x07']) {
        return Err(ConfigError::Invalid(format!("invalid channel name: {channel}")).into());
    }
    if channel.starts_with(['#', '&', '+', '!']) {
        Ok(channel.to_string())
    } else {
        Ok(format!("#{channel}"))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!("{key} must be a boolean, got {value:?}")).into()),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} must be a number, got {value:?}")).into())
}
