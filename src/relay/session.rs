//! The long-lived relay context: owns the connection manager, routes IRC
//! events to the game side and game events to IRC.

use crate::config::ConfigStore;
use crate::error::{ConnectError, TransportError};
use crate::irc::{ConnectionManager, ConnectionState, IrcEvent, Transport, TransportEvent};
use crate::relay::format;
use crate::relay::notification::{NotificationSink, PresenceProvider};
use crate::relay::translator::{self, ChatCommand};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Something that happened on the game server and may be relayed to IRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Chat { name: String, message: String },
    Action { name: String, message: String },
    Join { name: String },
    Quit { name: String },
}

pub struct RelaySession<T: Transport> {
    manager: ConnectionManager<T>,
    config: Arc<ConfigStore>,
    sink: Arc<dyn NotificationSink>,
    presence: Arc<dyn PresenceProvider>,
}

impl<T: Transport> RelaySession<T> {
    pub fn new(
        transport: Arc<T>,
        config: Arc<ConfigStore>,
        sink: Arc<dyn NotificationSink>,
        presence: Arc<dyn PresenceProvider>,
    ) -> Self {
        Self {
            manager: ConnectionManager::new(transport, config.clone()),
            config,
            sink,
            presence,
        }
    }

    pub fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    fn transport(&self) -> &Arc<T> {
        self.manager.transport()
    }

    pub fn connect(&self) -> Option<JoinHandle<Result<String, ConnectError>>> {
        self.manager.request_connect()
    }

    /// Quit IRC with the configured quit message. No reconnect follows.
    pub fn disconnect(&self) -> Result<(), TransportError> {
        let message = self
            .config
            .connection()
            .map(|c| c.quit_message.clone())
            .unwrap_or_default();
        self.manager.disconnect(&message)
    }

    pub fn rejoin(&self) -> Result<(), TransportError> {
        self.manager.join_channel()
    }

    /// Re-read configuration and ignore list. The live connection keeps
    /// running; new settings apply to what happens next.
    pub fn reload(&self) -> bool {
        self.config.load()
    }

    pub fn channel(&self) -> String {
        self.config
            .connection()
            .map(|c| c.channel.clone())
            .unwrap_or_default()
    }

    /// Who is in the channel, formatted for display.
    pub fn userlist(&self) -> String {
        let channel = self.channel();
        let names = self.transport().channel_members(&channel);
        translator::format_user_list(&names, &channel)
    }

    pub fn status(&self) -> String {
        let Some(cfg) = self.config.connection() else {
            return "No valid configuration loaded.".to_string();
        };
        match self.manager.state() {
            ConnectionState::Connected => format!(
                "Connected to {}:{} as {} in {}",
                cfg.host,
                cfg.port,
                self.transport().live_nickname().unwrap_or_default(),
                cfg.channel
            ),
            ConnectionState::Connecting => format!("Connecting to {}:{}", cfg.host, cfg.port),
            ConnectionState::ShuttingDown => "Disconnecting".to_string(),
            ConnectionState::Idle | ConnectionState::Disconnected => "Not connected".to_string(),
        }
    }

    /// Drain transport events until the channel closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_transport_event(event).await;
        }
        debug!("transport event channel closed");
    }

    pub async fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Disconnected => {
                self.manager.on_disconnect().await;
            }
            TransportEvent::Irc(event) => self.handle_irc_event(&event),
        }
    }

    fn handle_irc_event(&self, event: &IrcEvent) {
        let Some(cfg) = self.config.connection() else {
            return;
        };

        match event {
            IrcEvent::Chat { sender, .. } | IrcEvent::Action { sender, .. }
                if self.config.is_ignored(sender) =>
            {
                debug!(nick = %sender, "ignored");
                return;
            }
            IrcEvent::Chat { sender, text } if cfg.players_command => {
                if let Some(command) = translator::parse_command(text) {
                    self.run_command(sender, command);
                    return;
                }
            }
            IrcEvent::Kick { target, .. } if self.is_self(target) => {
                info!(channel = %cfg.channel, "Kicked from channel; rejoining");
                if let Err(e) = self.manager.join_channel() {
                    warn!(error = %e, "Rejoin failed");
                }
            }
            _ => {}
        }

        if let Some(notification) = translator::from_irc(event, &cfg) {
            self.sink.deliver(notification);
        }
    }

    fn is_self(&self, nick: &str) -> bool {
        self.transport()
            .live_nickname()
            .map(|me| me.eq_ignore_ascii_case(nick))
            .unwrap_or(false)
    }

    fn run_command(&self, sender: &str, command: ChatCommand) {
        let Some(cfg) = self.config.connection() else {
            return;
        };
        match command {
            ChatCommand::Players => {
                let reply = translator::players_reply(&self.presence.online_players());
                if let Err(e) = self
                    .transport()
                    .send_message(&cfg.channel, &translator::to_irc(&reply))
                {
                    warn!(error = %e, "Failed to answer !players");
                }
            }
        }
        if let Some(notice) = translator::command_notice(sender, command, &cfg) {
            self.sink.deliver(notice);
        }
    }

    /// Render a game event with its `line_formatting.to_irc` template and
    /// send it to the channel. Categories switched off are skipped.
    pub fn relay_game_event(&self, event: &GameEvent) -> Result<(), TransportError> {
        let Some(cfg) = self.config.connection() else {
            return Err(TransportError::NotConnected);
        };
        let (enabled, key, fallback, name, message) = match event {
            GameEvent::Chat { name, message } => {
                (cfg.game.chat, "chat", format::IRC_CHAT, name, message.as_str())
            }
            GameEvent::Action { name, message } => {
                (cfg.game.action, "action", format::IRC_ACTION, name, message.as_str())
            }
            GameEvent::Join { name } => (cfg.game.join, "join", format::IRC_JOIN, name, ""),
            GameEvent::Quit { name } => (cfg.game.quit, "quit", format::IRC_QUIT, name, ""),
        };
        if !enabled {
            return Ok(());
        }
        let template = self
            .config
            .get_string(&format!("line_formatting.to_irc.{}", key));
        let line = format::render(&template, fallback, name, message);
        self.transport()
            .send_message(&cfg.channel, &translator::to_irc(&line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irc::mock::{store, store_with_ignores, Call, MockTransport};
    use crate::relay::notification::OutboundNotification;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<OutboundNotification>>);

    impl NotificationSink for RecordingSink {
        fn deliver(&self, notification: OutboundNotification) {
            self.0.lock().push(notification);
        }
    }

    struct Players(Vec<String>);

    impl PresenceProvider for Players {
        fn online_players(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    struct Fixture {
        mock: Arc<MockTransport>,
        sink: Arc<RecordingSink>,
        session: RelaySession<MockTransport>,
    }

    impl Fixture {
        fn delivered(&self) -> Vec<OutboundNotification> {
            self.sink.0.lock().clone()
        }
    }

    async fn connected(config: Arc<ConfigStore>, players: &[&str]) -> Fixture {
        let mock = MockTransport::new();
        let sink = Arc::new(RecordingSink::default());
        let presence = Arc::new(Players(players.iter().map(|s| s.to_string()).collect()));
        let session = RelaySession::new(mock.clone(), config, sink.clone(), presence);
        session.connect().unwrap().await.unwrap().unwrap();
        mock.clear_calls();
        Fixture { mock, sink, session }
    }

    fn irc(event: IrcEvent) -> TransportEvent {
        TransportEvent::Irc(event)
    }

    fn chat(sender: &str, text: &str) -> TransportEvent {
        irc(IrcEvent::Chat {
            sender: sender.into(),
            text: text.into(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_forwarded_to_sink() {
        let f = connected(store("", ""), &[]).await;
        f.session.handle_transport_event(chat("alice", "hello")).await;
        assert_eq!(
            f.delivered(),
            vec![OutboundNotification::ChatLine {
                actor: "alice".into(),
                text: "hello".into()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_players_command_forms() {
        for (players, reply) in [
            (vec![], "There are 0 players connected."),
            (vec!["Steve"], "There is 1 player connected: Steve"),
            (vec!["Steve", "Alex"], "There are 2 players connected: Steve Alex"),
        ] {
            let f = connected(store("", ""), &players).await;
            f.session.handle_transport_event(chat("alice", "!players")).await;
            assert_eq!(f.mock.messages(), vec![("#game".to_string(), reply.to_string())]);
            assert_eq!(
                f.delivered(),
                vec![OutboundNotification::SystemEvent {
                    actor: "alice".into(),
                    text: "asked for the player list".into()
                }]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_players_command_runs_with_chat_disabled() {
        let f = connected(store("", "[settings]\nirc_chat = false"), &["Steve"]).await;
        f.session.handle_transport_event(chat("alice", "!players")).await;
        assert_eq!(f.mock.messages().len(), 1);
        assert!(f.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_players_command_switched_off_is_plain_chat() {
        let f = connected(store("", "[commands]\nplayers = false"), &["Steve"]).await;
        f.session.handle_transport_event(chat("alice", "!players")).await;
        assert!(f.mock.messages().is_empty());
        assert_eq!(f.delivered().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_nicks_dropped() {
        let f = connected(store_with_ignores("", "", "# list\nSpammer\n"), &[]).await;
        f.session.handle_transport_event(chat("spammer", "buy now")).await;
        f.session.handle_transport_event(chat("SPAMMER", "!players")).await;
        f.session
            .handle_transport_event(irc(IrcEvent::Action {
                sender: "Spammer".into(),
                text: "spams".into(),
            }))
            .await;
        assert!(f.delivered().is_empty());
        assert!(f.mock.messages().is_empty());

        f.session
            .handle_transport_event(irc(IrcEvent::Join {
                sender: "spammer".into(),
            }))
            .await;
        assert_eq!(f.delivered().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_kick_rejoins_even_when_kicks_hidden() {
        let f = connected(store("channel_key = \"k\"", "[settings]\nirc_kick = false"), &[]).await;
        f.session
            .handle_transport_event(irc(IrcEvent::Kick {
                actor: "op".into(),
                target: "relay".into(),
                reason: "out".into(),
            }))
            .await;
        assert_eq!(
            f.mock.calls(),
            vec![Call::Join {
                channel: "#game".into(),
                key: Some("k".into())
            }]
        );
        assert!(f.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_kick_does_not_rejoin() {
        let f = connected(store("", ""), &[]).await;
        f.session
            .handle_transport_event(irc(IrcEvent::Kick {
                actor: "op".into(),
                target: "bob".into(),
                reason: String::new(),
            }))
            .await;
        assert_eq!(f.mock.joins(), 0);
        assert_eq!(
            f.delivered(),
            vec![OutboundNotification::KickEvent {
                actor: "bob".into(),
                text: "was kicked by op".into()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_event_reconnects() {
        let f = connected(store("", ""), &[]).await;
        f.mock.drop_link();
        f.session.handle_transport_event(TransportEvent::Disconnected).await;
        // Let the spawned reconnect routine run.
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        assert_eq!(f.mock.connects(), 1);
        assert_eq!(f.session.manager().state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_intentional_disconnect_event_does_not_reconnect() {
        let f = connected(store("quit_message = \"later\"", ""), &[]).await;
        f.session.disconnect().unwrap();
        f.session.handle_transport_event(TransportEvent::Disconnected).await;
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        assert_eq!(f.mock.calls(), vec![Call::Disconnect("later".into())]);
        assert_eq!(f.session.manager().state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_events_use_templates() {
        let f = connected(
            store("", "[line_formatting.to_irc]\nchat = \"[%name%] %message%\"\njoin = \"\""),
            &[],
        )
        .await;
        let s = &f.session;
        s.relay_game_event(&GameEvent::Chat {
            name: "Steve".into(),
            message: "hi".into(),
        })
        .unwrap();
        s.relay_game_event(&GameEvent::Action {
            name: "Steve".into(),
            message: "mines".into(),
        })
        .unwrap();
        s.relay_game_event(&GameEvent::Join { name: "Alex".into() }).unwrap();
        s.relay_game_event(&GameEvent::Quit { name: "Alex".into() }).unwrap();

        let sent: Vec<String> = f.mock.messages().into_iter().map(|(_, text)| text).collect();
        assert_eq!(
            sent,
            vec![
                "[Steve] hi",
                "* Steve mines",
                "Alex joined the game",
                "Alex left the game"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_categories_can_be_switched_off() {
        let f = connected(store("", "[settings]\ngame_join = false\ngame_quit = false"), &[]).await;
        f.session
            .relay_game_event(&GameEvent::Join { name: "Alex".into() })
            .unwrap();
        f.session
            .relay_game_event(&GameEvent::Quit { name: "Alex".into() })
            .unwrap();
        assert!(f.mock.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_userlist_and_channel() {
        let f = connected(store("channel = \"lobby\"", ""), &[]).await;
        f.mock.set_members(&["Relay", "alice"]);
        assert_eq!(f.session.channel(), "#lobby");
        assert_eq!(f.session.userlist(), "#lobby: Relay alice");

        let crowd: Vec<String> = (0..26).map(|i| format!("u{}", i)).collect();
        let crowd: Vec<&str> = crowd.iter().map(String::as_str).collect();
        f.mock.set_members(&crowd);
        assert!(f.session.userlist().contains("Too many to list!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_live_nick() {
        let f = connected(store("", ""), &[]).await;
        assert_eq!(f.session.status(), "Connected to irc.test:6667 as Relay in #game");
    }
}
