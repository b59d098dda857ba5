//! Configuration data model.
//!
//! The TOML sections deserialize into the `*Section` structs below. Every
//! field has a default so a sparse file still parses; required values are
//! checked afterwards by [`ConnectionConfig::from_relay`], which produces the
//! immutable snapshot the rest of the crate works from.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Root of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub commands: CommandsSection,
    #[serde(default)]
    pub settings: SettingsSection,
    #[serde(default)]
    pub line_formatting: LineFormatting,
}

/// `[connection]`: where and how to connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSection {
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_port")]
    pub server_port: i64,
    #[serde(default)]
    pub server_password: String,
    #[serde(default)]
    pub nick: String,
    #[serde(default)]
    pub nick_password: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub channel_key: String,
    /// Connect attempts per sequence.
    #[serde(default = "default_retries")]
    pub retries: i64,
    /// Seconds to wait after a failed attempt.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: i64,
    /// Milliseconds to let NickServ act during nick reclamation.
    #[serde(default = "default_nick_settle_delay")]
    pub nick_settle_delay: i64,
    /// Milliseconds between outgoing messages.
    #[serde(default = "default_message_delay")]
    pub bot_message_delay: i64,
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            server: String::new(),
            server_port: default_port(),
            server_password: String::new(),
            nick: String::new(),
            nick_password: String::new(),
            channel: String::new(),
            channel_key: String::new(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            nick_settle_delay: default_nick_settle_delay(),
            bot_message_delay: default_message_delay(),
            auto_reconnect: true,
            quit_message: default_quit_message(),
        }
    }
}

/// `[commands]`: in-channel commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsSection {
    #[serde(default = "default_true")]
    pub players: bool,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self { players: true }
    }
}

/// `[settings]`: which events are relayed in each direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSection {
    #[serde(default = "default_true")]
    pub irc_chat: bool,
    #[serde(default = "default_true")]
    pub irc_action: bool,
    #[serde(default = "default_true")]
    pub irc_join: bool,
    #[serde(default = "default_true")]
    pub irc_part: bool,
    #[serde(default = "default_true")]
    pub irc_quit: bool,
    #[serde(default = "default_true")]
    pub irc_kick: bool,
    #[serde(default = "default_true")]
    pub irc_nick: bool,
    #[serde(default = "default_true")]
    pub irc_mode: bool,
    #[serde(default = "default_true")]
    pub irc_topic: bool,
    #[serde(default = "default_true")]
    pub game_chat: bool,
    #[serde(default = "default_true")]
    pub game_action: bool,
    #[serde(default = "default_true")]
    pub game_join: bool,
    #[serde(default = "default_true")]
    pub game_quit: bool,
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            irc_chat: true,
            irc_action: true,
            irc_join: true,
            irc_part: true,
            irc_quit: true,
            irc_kick: true,
            irc_nick: true,
            irc_mode: true,
            irc_topic: true,
            game_chat: true,
            game_action: true,
            game_join: true,
            game_quit: true,
        }
    }
}

/// `[line_formatting.*]`: templates with `%name%` and `%message%`.
///
/// Only deserialized to reject malformed files; lookups go through the
/// dotted-key getters so an empty value can fall back to a built-in template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineFormatting {
    #[serde(default)]
    pub to_irc: ToIrcFormats,
    #[serde(default)]
    pub to_minecraft: ToGameFormats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToIrcFormats {
    #[serde(default)]
    pub chat: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub join: String,
    #[serde(default)]
    pub quit: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToGameFormats {
    #[serde(default)]
    pub chat: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub kick: String,
}

/// Per-category switches for IRC -> game notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFlags {
    pub chat: bool,
    pub action: bool,
    pub join: bool,
    pub part: bool,
    pub quit: bool,
    pub kick: bool,
    pub nick: bool,
    pub mode: bool,
    pub topic: bool,
}

impl EventFlags {
    pub fn all() -> Self {
        Self {
            chat: true,
            action: true,
            join: true,
            part: true,
            quit: true,
            kick: true,
            nick: true,
            mode: true,
            topic: true,
        }
    }
}

/// Per-category switches for game -> IRC lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameFlags {
    pub chat: bool,
    pub action: bool,
    pub join: bool,
    pub quit: bool,
}

/// Validated, immutable connection snapshot.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub server_password: Option<String>,
    /// Desired nickname. The live one may differ after a collision.
    pub nickname: String,
    pub nick_password: Option<String>,
    /// Always starts with a channel prefix.
    pub channel: String,
    pub channel_key: Option<String>,
    pub events: EventFlags,
    pub game: GameFlags,
    pub players_command: bool,
    pub attempts: u32,
    pub retry_delay: Duration,
    pub nick_settle_delay: Duration,
    pub message_delay: Duration,
    pub auto_reconnect: bool,
    pub quit_message: String,
}

impl ConnectionConfig {
    /// A snapshot with every optional knob at its default.
    pub fn new(host: &str, port: u16, nickname: &str, channel: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            server_password: None,
            nickname: nickname.to_string(),
            nick_password: None,
            channel: normalize_channel(channel),
            channel_key: None,
            events: EventFlags::all(),
            game: GameFlags {
                chat: true,
                action: true,
                join: true,
                quit: true,
            },
            players_command: true,
            attempts: default_retries() as u32,
            retry_delay: Duration::from_secs(default_retry_delay() as u64),
            nick_settle_delay: Duration::from_millis(default_nick_settle_delay() as u64),
            message_delay: Duration::from_millis(default_message_delay() as u64),
            auto_reconnect: true,
            quit_message: default_quit_message(),
        }
    }

    /// Validate the parsed file and build the snapshot. Numeric knobs that
    /// are out of range fall back to their defaults; required values that
    /// are missing reject the whole file.
    pub fn from_relay(cfg: &RelayConfig) -> Result<Self, ConfigError> {
        let conn = &cfg.connection;

        let host = conn.server.trim();
        if host.is_empty() {
            return Err(ConfigError::invalid(
                "connection.server",
                "the server to connect to is not defined",
            ));
        }
        if !(1..=65535).contains(&conn.server_port) {
            return Err(ConfigError::invalid(
                "connection.server_port",
                format!("{} is not a valid port number", conn.server_port),
            ));
        }
        let nickname = conn.nick.trim();
        if nickname.is_empty() {
            return Err(ConfigError::invalid(
                "connection.nick",
                "a nickname was not defined",
            ));
        }
        if conn.channel.trim().is_empty() {
            return Err(ConfigError::invalid(
                "connection.channel",
                "a channel was not defined",
            ));
        }

        let attempts = if conn.retries < 1 {
            default_retries()
        } else {
            conn.retries
        };
        let retry_delay = if conn.retry_delay < 0 {
            default_retry_delay()
        } else {
            conn.retry_delay
        };
        let settle = if conn.nick_settle_delay < 0 {
            default_nick_settle_delay()
        } else {
            conn.nick_settle_delay
        };
        let message_delay = if conn.bot_message_delay < 0 {
            default_message_delay()
        } else {
            conn.bot_message_delay
        };

        let s = &cfg.settings;
        Ok(Self {
            host: host.to_string(),
            port: conn.server_port as u16,
            server_password: non_empty(&conn.server_password),
            nickname: nickname.to_string(),
            nick_password: non_empty(&conn.nick_password),
            channel: normalize_channel(&conn.channel),
            channel_key: non_empty(&conn.channel_key),
            events: EventFlags {
                chat: s.irc_chat,
                action: s.irc_action,
                join: s.irc_join,
                part: s.irc_part,
                quit: s.irc_quit,
                kick: s.irc_kick,
                nick: s.irc_nick,
                mode: s.irc_mode,
                topic: s.irc_topic,
            },
            game: GameFlags {
                chat: s.game_chat,
                action: s.game_action,
                join: s.game_join,
                quit: s.game_quit,
            },
            players_command: cfg.commands.players,
            attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
            retry_delay: Duration::from_secs(retry_delay as u64),
            nick_settle_delay: Duration::from_millis(settle as u64),
            message_delay: Duration::from_millis(message_delay as u64),
            auto_reconnect: conn.auto_reconnect,
            quit_message: conn.quit_message.clone(),
        })
    }
}

/// Prefix a bare channel name with `#`. Names already starting with `#` or
/// `&` are kept as-is.
pub fn normalize_channel(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('#') || name.starts_with('&') {
        name.to_string()
    } else {
        format!("#{}", name)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn default_port() -> i64 {
    6667
}
fn default_true() -> bool {
    true
}
fn default_retries() -> i64 {
    5
}
fn default_retry_delay() -> i64 {
    5
}
fn default_nick_settle_delay() -> i64 {
    2000
}
fn default_message_delay() -> i64 {
    1000
}
fn default_quit_message() -> String {
    "ircrelay shutting down".to_string()
}
