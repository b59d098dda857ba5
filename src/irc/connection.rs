//! [`Transport`] implementation backed by the `irc` crate.
//!
//! Each successful `connect` spawns one reader task that drives the client
//! stream, keeps our live nickname and the channel member lists current, and
//! forwards channel events to the session. While registering it also sends
//! the alternate nicks itself; once registered, a refused NICK leaves the
//! live nick unchanged instead of ending the connection.

use crate::error::TransportError;
use crate::irc::event::{IrcEvent, TransportEvent};
use crate::irc::transport::Transport;
use async_trait::async_trait;
use futures::StreamExt;
use irc::client::prelude::*;
use irc::client::ClientStream;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(30);
const ALT_NICK_COUNT: usize = 3;
const BURST_WINDOW_SECS: u32 = 8;
const REALNAME: &str = "IRC to game chat relay";

#[derive(Default)]
struct LinkState {
    sender: Option<irc::client::Sender>,
    nickname: Option<String>,
    registered: bool,
    members: ChannelMembers,
    /// Nicks still to try while the server refuses ours during registration.
    alternates: VecDeque<String>,
    /// Bumped on every connect so a stale reader cannot touch newer state.
    generation: u64,
    reader: Option<JoinHandle<()>>,
}

enum NickRefused {
    /// Already registered: the live nick stays as it is.
    Keep,
    Retry(irc::client::Sender, String),
    Exhausted,
}

impl LinkState {
    fn is_me(&self, nick: &str) -> bool {
        self.nickname
            .as_deref()
            .map(|me| me.eq_ignore_ascii_case(nick))
            .unwrap_or(false)
    }

    fn reset(&mut self) {
        self.sender = None;
        self.nickname = None;
        self.registered = false;
        self.members = ChannelMembers::default();
        self.alternates.clear();
    }

    /// The server answered 433/432 to the last NICK we sent.
    fn nick_refused(&mut self) -> NickRefused {
        if self.registered {
            return NickRefused::Keep;
        }
        match (self.alternates.pop_front(), self.sender.clone()) {
            (Some(alt), Some(sender)) => NickRefused::Retry(sender, alt),
            _ => NickRefused::Exhausted,
        }
    }

    /// Update link state from one server message and translate it into a
    /// channel event where there is one.
    fn apply(&mut self, message: &Message) -> Option<IrcEvent> {
        let from = message.source_nickname().unwrap_or("").to_string();

        match &message.command {
            Command::Response(Response::RPL_WELCOME, args) => {
                if let Some(nick) = args.first() {
                    self.nickname = Some(nick.clone());
                }
                self.registered = true;
                None
            }
            // args: <me> <channel> <topic>
            Command::Response(Response::RPL_TOPIC, args) => {
                let text = args.get(2)?.clone();
                Some(IrcEvent::Topic {
                    setter: String::new(),
                    text,
                    changed: false,
                })
            }
            // args: <me> <symbol> <channel> <names>
            Command::Response(Response::RPL_NAMREPLY, args) => {
                if args.len() >= 4 {
                    self.members.add_names(&args[2], &args[3]);
                }
                None
            }
            Command::PRIVMSG(target, text) => {
                if !is_channel(target) {
                    return None;
                }
                if let Some(action) = ctcp_action(text) {
                    Some(IrcEvent::Action {
                        sender: from,
                        text: action.to_string(),
                    })
                } else if text.starts_with('\x01') {
                    // Other CTCP requests are answered by the client itself.
                    None
                } else {
                    Some(IrcEvent::Chat {
                        sender: from,
                        text: text.clone(),
                    })
                }
            }
            Command::JOIN(channel, _, _) => {
                if self.is_me(&from) {
                    self.members.forget(channel);
                }
                self.members.join(channel, &from);
                Some(IrcEvent::Join { sender: from })
            }
            Command::PART(channel, _) => {
                if self.is_me(&from) {
                    self.members.forget(channel);
                } else {
                    self.members.part(channel, &from);
                }
                Some(IrcEvent::Part { sender: from })
            }
            Command::QUIT(reason) => {
                self.members.quit(&from);
                Some(IrcEvent::Quit {
                    sender: from,
                    reason: reason.clone().unwrap_or_default(),
                })
            }
            Command::KICK(channel, user, reason) => {
                if self.is_me(user) {
                    self.members.forget(channel);
                } else {
                    self.members.part(channel, user);
                }
                Some(IrcEvent::Kick {
                    actor: from,
                    target: user.clone(),
                    reason: reason.clone().unwrap_or_default(),
                })
            }
            Command::NICK(new_nick) => {
                if self.is_me(&from) {
                    self.nickname = Some(new_nick.clone());
                }
                self.members.rename(&from, new_nick);
                Some(IrcEvent::NickChange {
                    old_nick: from,
                    new_nick: new_nick.clone(),
                })
            }
            Command::TOPIC(_, Some(topic)) => Some(IrcEvent::Topic {
                setter: from,
                text: topic.clone(),
                changed: true,
            }),
            Command::ChannelMODE(_, modes) => {
                let modes = modes
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(IrcEvent::Mode {
                    setter: from,
                    modes,
                })
            }
            _ => None,
        }
    }
}

/// Who is in which channel, as far as JOIN/PART/QUIT/KICK/NICK and NAMES
/// replies tell us. Keys are lowercased channel names.
#[derive(Debug, Default)]
struct ChannelMembers {
    channels: HashMap<String, Vec<String>>,
}

impl ChannelMembers {
    fn add_names(&mut self, channel: &str, names: &str) {
        for name in names.split_whitespace() {
            let nick = name.trim_start_matches(['@', '+', '%', '~', '&']);
            if !nick.is_empty() {
                self.join(channel, nick);
            }
        }
    }

    fn join(&mut self, channel: &str, nick: &str) {
        let users = self.channels.entry(channel.to_lowercase()).or_default();
        if !users.iter().any(|u| u.eq_ignore_ascii_case(nick)) {
            users.push(nick.to_string());
        }
    }

    fn part(&mut self, channel: &str, nick: &str) {
        if let Some(users) = self.channels.get_mut(&channel.to_lowercase()) {
            users.retain(|u| !u.eq_ignore_ascii_case(nick));
        }
    }

    fn forget(&mut self, channel: &str) {
        self.channels.remove(&channel.to_lowercase());
    }

    fn quit(&mut self, nick: &str) {
        for users in self.channels.values_mut() {
            users.retain(|u| !u.eq_ignore_ascii_case(nick));
        }
    }

    fn rename(&mut self, old: &str, new: &str) {
        for users in self.channels.values_mut() {
            for u in users.iter_mut() {
                if u.eq_ignore_ascii_case(old) {
                    *u = new.to_string();
                }
            }
        }
    }

    fn list(&self, channel: &str) -> Vec<String> {
        self.channels
            .get(&channel.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

pub struct IrcClientTransport {
    state: Arc<Mutex<LinkState>>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    message_delay: Mutex<Duration>,
}

impl IrcClientTransport {
    pub fn new(event_tx: mpsc::UnboundedSender<TransportEvent>, message_delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(LinkState::default())),
            event_tx,
            message_delay: Mutex::new(message_delay),
        }
    }

    /// Takes effect on the next connect.
    pub fn set_message_delay(&self, delay: Duration) {
        *self.message_delay.lock() = delay;
    }

    fn sender(&self) -> Result<irc::client::Sender, TransportError> {
        self.state
            .lock()
            .sender
            .clone()
            .ok_or(TransportError::NotConnected)
    }

    fn client_config(
        &self,
        host: &str,
        port: u16,
        password: Option<&str>,
        nickname: &str,
    ) -> Config {
        let (burst_window_length, max_messages_in_burst) = flood_limits(*self.message_delay.lock());
        Config {
            server: Some(host.to_string()),
            port: Some(port),
            password: password.map(str::to_string),
            nickname: Some(nickname.to_string()),
            // Alternates are sent by the reader; the client's own fallback
            // also fires on a refused NICK after registration.
            alt_nicks: Vec::new(),
            username: Some(nickname.to_string()),
            realname: Some(REALNAME.to_string()),
            version: Some(format!("ircrelay v{}", env!("CARGO_PKG_VERSION"))),
            burst_window_length,
            max_messages_in_burst,
            ..Config::default()
        }
    }
}

#[async_trait]
impl Transport for IrcClientTransport {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        password: Option<&str>,
        nickname: &str,
    ) -> Result<(), TransportError> {
        let config = self.client_config(host, port, password, nickname);
        let mut client = Client::from_config(config).await?;
        client.identify()?;
        let sender = client.sender();
        let stream = client.stream()?;
        drop(client);

        let (ready_tx, ready_rx) = oneshot::channel();
        let generation = {
            let mut st = self.state.lock();
            if let Some(old) = st.reader.take() {
                old.abort();
            }
            st.reset();
            st.generation += 1;
            let generation = st.generation;
            st.sender = Some(sender);
            st.alternates = alternate_nicks(nickname).into();
            st.reader = Some(tokio::spawn(read_loop(
                stream,
                self.state.clone(),
                self.event_tx.clone(),
                generation,
                ready_tx,
            )));
            generation
        };

        match tokio::time::timeout(REGISTRATION_TIMEOUT, ready_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                let mut st = self.state.lock();
                if st.generation == generation {
                    if let Some(reader) = st.reader.take() {
                        reader.abort();
                    }
                    st.reset();
                }
                Err(TransportError::Timeout(REGISTRATION_TIMEOUT))
            }
        }
    }

    fn is_connected(&self) -> bool {
        let st = self.state.lock();
        st.registered && st.sender.is_some()
    }

    fn live_nickname(&self) -> Option<String> {
        self.state.lock().nickname.clone()
    }

    fn change_nick(&self, nickname: &str) -> Result<(), TransportError> {
        self.sender()?
            .send(Command::NICK(nickname.to_string()))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn send_message(&self, target: &str, text: &str) -> Result<(), TransportError> {
        let clean = sanitize(text);
        self.sender()?
            .send_privmsg(target, &clean)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn join_channel(&self, channel: &str, key: Option<&str>) -> Result<(), TransportError> {
        self.sender()?
            .send(Command::JOIN(
                channel.to_string(),
                key.map(str::to_string),
                None,
            ))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn channel_members(&self, channel: &str) -> Vec<String> {
        self.state.lock().members.list(channel)
    }

    fn disconnect(&self, message: &str) -> Result<(), TransportError> {
        self.sender()?
            .send_quit(message)
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

async fn read_loop(
    mut stream: ClientStream,
    state: Arc<Mutex<LinkState>>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    generation: u64,
    ready_tx: oneshot::Sender<Result<(), TransportError>>,
) {
    let mut ready = Some(ready_tx);

    while let Some(result) = stream.next().await {
        match result {
            Ok(message) => {
                let event = {
                    let mut st = state.lock();
                    if st.generation != generation {
                        return;
                    }
                    let event = st.apply(&message);
                    if st.registered {
                        if let Some(tx) = ready.take() {
                            debug!(nick = ?st.nickname, "registered with server");
                            let _ = tx.send(Ok(()));
                        }
                    }
                    event
                };
                if let Some(event) = event {
                    if event_tx.send(TransportEvent::Irc(event)).is_err() {
                        break;
                    }
                }
            }
            Err(irc::error::Error::NoUsableNick) => {
                let refused = {
                    let mut st = state.lock();
                    if st.generation != generation {
                        return;
                    }
                    st.nick_refused()
                };
                match refused {
                    NickRefused::Keep => {
                        warn!("Nickname change refused by the server");
                        continue;
                    }
                    NickRefused::Retry(sender, alt) => {
                        debug!(%alt, "nickname in use, trying alternate");
                        match sender.send(Command::NICK(alt)) {
                            Ok(()) => continue,
                            Err(e) => {
                                if let Some(tx) = ready.take() {
                                    let _ = tx.send(Err(TransportError::Send(e.to_string())));
                                }
                                break;
                            }
                        }
                    }
                    NickRefused::Exhausted => {
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Err(TransportError::NickCollision));
                        }
                        break;
                    }
                }
            }
            Err(e) => {
                let err = TransportError::from(e);
                match ready.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(err));
                    }
                    None => warn!(error = %err, "IRC connection error"),
                }
                break;
            }
        }
    }

    let was_registered = {
        let mut st = state.lock();
        if st.generation != generation {
            return;
        }
        let was = st.registered;
        st.reader = None;
        st.reset();
        was
    };
    if let Some(tx) = ready.take() {
        let _ = tx.send(Err(TransportError::Closed));
    }
    if was_registered {
        let _ = event_tx.send(TransportEvent::Disconnected);
    }
}

fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

fn ctcp_action(text: &str) -> Option<&str> {
    text.strip_prefix("\x01ACTION ")
        .map(|rest| rest.strip_suffix('\x01').unwrap_or(rest))
}

/// Outbound text must not smuggle CTCP or extra protocol lines.
fn sanitize(text: &str) -> String {
    text.replace('\x01', "").replace(['\r', '\n'], " ")
}

fn alternate_nicks(nickname: &str) -> Vec<String> {
    (1..=ALT_NICK_COUNT)
        .map(|i| format!("{}{}", nickname, i))
        .collect()
}

/// Translate a per-message delay into the client's burst limiter. Zero keeps
/// the library defaults.
fn flood_limits(delay: Duration) -> (Option<u32>, Option<u32>) {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return (None, None);
    }
    let per_window = (u64::from(BURST_WINDOW_SECS) * 1000 / ms).max(1);
    (
        Some(BURST_WINDOW_SECS),
        Some(u32::try_from(per_window).unwrap_or(u32::MAX)),
    )
}
