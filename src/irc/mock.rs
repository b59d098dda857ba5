//! Scripted in-memory transport for unit tests.

use crate::config::{ConfigStore, IgnoreList, Snapshot};
use crate::error::TransportError;
use crate::irc::transport::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Connect { nickname: String, password: Option<String> },
    ChangeNick(String),
    Message { target: String, text: String },
    Join { channel: String, key: Option<String> },
    Disconnect(String),
}

/// What the next `connect` does.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// Registered, under the given nick or the requested one.
    Welcome(Option<String>),
    /// Reports a collision; stays registered if a nick is given.
    Collision(Option<String>),
    Fail,
}

#[derive(Debug, Default)]
struct Link {
    connected: bool,
    live: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    calls: Mutex<Vec<Call>>,
    script: Mutex<VecDeque<Outcome>>,
    link: Mutex<Link>,
    members: Mutex<Vec<String>>,
    ignore_nick_changes: Mutex<bool>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.script.lock().extend(outcomes);
    }

    /// Make NICK requests have no effect, as if the nick stayed taken.
    pub fn refuse_nick_changes(&self) {
        *self.ignore_nick_changes.lock() = true;
    }

    pub fn set_members(&self, names: &[&str]) {
        *self.members.lock() = names.iter().map(|s| s.to_string()).collect();
    }

    /// Simulate the server dropping us.
    pub fn drop_link(&self) {
        self.link.lock().connected = false;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn connects(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Connect { .. }))
            .count()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Message { target, text } => Some((target.clone(), text.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn joins(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Join { .. }))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &self,
        _host: &str,
        _port: u16,
        password: Option<&str>,
        nickname: &str,
    ) -> Result<(), TransportError> {
        self.calls.lock().push(Call::Connect {
            nickname: nickname.to_string(),
            password: password.map(str::to_string),
        });
        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(Outcome::Welcome(None));
        let mut link = self.link.lock();
        match outcome {
            Outcome::Welcome(nick) => {
                link.connected = true;
                link.live = Some(nick.unwrap_or_else(|| nickname.to_string()));
                Ok(())
            }
            Outcome::Collision(Some(nick)) => {
                link.connected = true;
                link.live = Some(nick);
                Err(TransportError::NickCollision)
            }
            Outcome::Collision(None) => Err(TransportError::NickCollision),
            Outcome::Fail => Err(TransportError::Connect("connection refused".into())),
        }
    }

    fn is_connected(&self) -> bool {
        self.link.lock().connected
    }

    fn live_nickname(&self) -> Option<String> {
        self.link.lock().live.clone()
    }

    fn change_nick(&self, nickname: &str) -> Result<(), TransportError> {
        self.calls.lock().push(Call::ChangeNick(nickname.to_string()));
        if !*self.ignore_nick_changes.lock() {
            self.link.lock().live = Some(nickname.to_string());
        }
        Ok(())
    }

    fn send_message(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.calls.lock().push(Call::Message {
            target: target.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn join_channel(&self, channel: &str, key: Option<&str>) -> Result<(), TransportError> {
        self.calls.lock().push(Call::Join {
            channel: channel.to_string(),
            key: key.map(str::to_string),
        });
        Ok(())
    }

    fn channel_members(&self, _channel: &str) -> Vec<String> {
        self.members.lock().clone()
    }

    fn disconnect(&self, message: &str) -> Result<(), TransportError> {
        self.calls.lock().push(Call::Disconnect(message.to_string()));
        self.link.lock().connected = false;
        Ok(())
    }
}

/// A store for server `irc.test`, nick `Relay`, channel `#game` unless
/// `connection` sets one.
/// `connection` is appended to the `[connection]` table, `rest` after it.
pub(crate) fn store(connection: &str, rest: &str) -> Arc<ConfigStore> {
    store_with_ignores(connection, rest, "")
}

pub(crate) fn store_with_ignores(connection: &str, rest: &str, ignores: &str) -> Arc<ConfigStore> {
    let text = format!(
        "[connection]\nserver = \"irc.test\"\nnick = \"Relay\"\n{}\n{}",
        connection, rest
    );
    let text = if connection.contains("channel =") {
        text
    } else {
        text.replacen("[connection]\n", "[connection]\nchannel = \"#game\"\n", 1)
    };
    let snapshot = Snapshot::parse(&text, Path::new("test"), IgnoreList::parse(ignores)).unwrap();
    Arc::new(ConfigStore::with_snapshot("/nonexistent", snapshot))
}
