mod app;

use crate::app::action::Action;
use crate::app::event::AppEvent;
use crate::app::handler;
use crate::app::roster::PlayerRoster;
use crate::app::sink::ConsoleSink;
use anyhow::Result;
use ircrelay::config::{self, ConfigStore};
use ircrelay::irc::IrcClientTransport;
use ircrelay::relay::translator;
use ircrelay::relay::RelaySession;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Time the client gets to flush QUIT before the process exits.
const QUIT_FLUSH: Duration = Duration::from_millis(500);

type Session = RelaySession<IrcClientTransport>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::default_dir);
    let store = Arc::new(ConfigStore::new(dir.clone()));
    let loaded = store.load();

    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let message_delay = store
        .connection()
        .map(|c| c.message_delay)
        .unwrap_or(Duration::from_secs(1));
    let transport = Arc::new(IrcClientTransport::new(transport_tx, message_delay));
    let roster = Arc::new(PlayerRoster::default());
    let sink = Arc::new(ConsoleSink::new(store.clone()));
    let session = Arc::new(RelaySession::new(
        transport.clone(),
        store.clone(),
        sink,
        roster.clone(),
    ));
    tokio::spawn(session.clone().run(transport_rx));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if event_tx.send(AppEvent::Input(line)).is_err() {
                        break;
                    }
                }
                Ok(None) | Err(_) => {
                    let _ = event_tx.send(AppEvent::InputClosed);
                    break;
                }
            }
        }
    });

    if loaded {
        session.connect();
    } else {
        warn!(
            "Edit {} and enter '/irc reload' to start relaying.",
            dir.join("config.toml").display()
        );
    }
    println!("ircrelay v{} ready. Type /help for commands.", env!("CARGO_PKG_VERSION"));

    while let Some(event) = event_rx.recv().await {
        let line = match event {
            AppEvent::Input(line) => line,
            AppEvent::InputClosed => break,
        };
        for action in handler::handle_line(&roster, &line) {
            if action == Action::Quit {
                shutdown(&session).await;
                return Ok(());
            }
            execute(&session, &transport, &roster, action);
        }
    }

    shutdown(&session).await;
    Ok(())
}

fn execute(session: &Session, transport: &IrcClientTransport, roster: &PlayerRoster, action: Action) {
    match action {
        Action::Connect => {
            if session.connect().is_none() {
                println!("Already connecting.");
            }
        }
        Action::Disconnect => {
            if let Err(e) = session.disconnect() {
                println!("Disconnect failed: {}", e);
            }
        }
        Action::Rejoin => {
            if let Err(e) = session.rejoin() {
                println!("Rejoin failed: {}", e);
            }
        }
        Action::Reload => {
            if session.reload() {
                if let Some(cfg) = session.config().connection() {
                    transport.set_message_delay(cfg.message_delay);
                }
                println!("Configuration reloaded.");
            } else {
                println!("Reload failed; the previous configuration stays active.");
            }
        }
        Action::ShowUsers => println!("{}", session.userlist()),
        Action::ShowChannel => println!("{}", session.channel()),
        Action::ShowStatus => println!("{}", session.status()),
        Action::ShowPlayers => println!("{}", translator::players_reply(&roster.list())),
        Action::Relay(event) => {
            if let Err(e) = session.relay_game_event(&event) {
                tracing::debug!(error = %e, ?event, "not relayed");
            }
        }
        Action::Print(text) => println!("{}", text),
        Action::Quit => {}
    }
}

async fn shutdown(session: &Session) {
    if let Err(e) = session.disconnect() {
        warn!(error = %e, "Failed to send QUIT");
    }
    tokio::time::sleep(QUIT_FLUSH).await;
}
