use ircrelay::relay::GameEvent;

/// Work the console loop performs against the relay session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Connect,
    Disconnect,
    Rejoin,
    Reload,
    ShowUsers,
    ShowChannel,
    ShowStatus,
    ShowPlayers,
    Relay(GameEvent),
    Print(String),
    Quit,
}
