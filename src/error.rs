//! Error types shared by the transport, connection manager and config layers.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`Transport`](crate::irc::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Every nickname we offered was already taken. Recoverable: the
    /// connection manager moves on to nick reclamation.
    #[error("nickname already in use")]
    NickCollision,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server did not complete registration within {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection closed before registration")]
    Closed,

    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    Send(String),
}

impl From<irc::error::Error> for TransportError {
    fn from(err: irc::error::Error) -> Self {
        match err {
            irc::error::Error::NoUsableNick => TransportError::NickCollision,
            other => TransportError::Connect(other.to_string()),
        }
    }
}

/// Outcome of a whole connect sequence that did not end connected.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("no valid configuration is loaded")]
    NotConfigured,

    /// A disconnect was requested while connecting.
    #[error("connect cancelled")]
    Cancelled,
}

/// Configuration and resource file failures. None of these replace the
/// active configuration snapshot.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A default file was written and must be edited before it can be used.
    #[error("created default configuration at {0}")]
    Created(PathBuf),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
