use crate::app::action::Action;
use crate::app::commands::{parse_command, ConsoleCommand, IrcCommand, HELP};
use crate::app::roster::PlayerRoster;
use ircrelay::relay::GameEvent;

/// Name used for plain console lines.
pub const CONSOLE_NAME: &str = "Console";

/// Turn one console line into actions. Login and logout update the roster
/// here so the relay never sees a duplicate join or a quit for nobody.
pub fn handle_line(roster: &PlayerRoster, line: &str) -> Vec<Action> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }

    let Some(command) = parse_command(line) else {
        if line.starts_with('/') {
            let name = line.split(' ').next().unwrap_or(line);
            return vec![Action::Print(format!(
                "Unknown command or missing arguments: {}. Type /help for a list.",
                name
            ))];
        }
        return vec![Action::Relay(GameEvent::Chat {
            name: CONSOLE_NAME.to_string(),
            message: line.to_string(),
        })];
    };

    match command {
        ConsoleCommand::Irc(sub) => vec![match sub {
            IrcCommand::Connect => Action::Connect,
            IrcCommand::Disconnect => Action::Disconnect,
            IrcCommand::Rejoin => Action::Rejoin,
            IrcCommand::Reload => Action::Reload,
            IrcCommand::Users => Action::ShowUsers,
            IrcCommand::Channel => Action::ShowChannel,
            IrcCommand::Status => Action::ShowStatus,
        }],
        ConsoleCommand::Login { name } => {
            if roster.add(&name) {
                vec![Action::Relay(GameEvent::Join { name })]
            } else {
                vec![Action::Print(format!("{} is already online.", name))]
            }
        }
        ConsoleCommand::Logout { name } => match roster.remove(&name) {
            Some(name) => vec![Action::Relay(GameEvent::Quit { name })],
            None => vec![Action::Print(format!("{} is not online.", name))],
        },
        ConsoleCommand::Say { name, text } => vec![Action::Relay(GameEvent::Chat {
            name,
            message: text,
        })],
        ConsoleCommand::Me { name, text } => vec![Action::Relay(GameEvent::Action {
            name,
            message: text,
        })],
        ConsoleCommand::Players => vec![Action::ShowPlayers],
        ConsoleCommand::Help => HELP.iter().map(|l| Action::Print(l.to_string())).collect(),
        ConsoleCommand::Quit => vec![Action::Quit],
    }
}
