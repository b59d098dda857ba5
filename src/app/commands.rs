//! Console command parser.
//!
//! Parses `/command arg1 arg2 ...` lines typed on the console into typed
//! [`ConsoleCommand`] values.

/// A `/irc <subcommand>` acting on the IRC side of the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcCommand {
    Connect,
    Disconnect,
    Rejoin,
    Reload,
    Users,
    Channel,
    Status,
}

/// A parsed console command. Each variant corresponds to a `/command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Irc(IrcCommand),
    Login { name: String },
    Logout { name: String },
    Say { name: String, text: String },
    Me { name: String, text: String },
    Players,
    Help,
    Quit,
}

/// Parse a console line into a [`ConsoleCommand`].
///
/// Returns `None` if the input does not start with `/`, names an unknown
/// command or is missing arguments. Command names are case-insensitive.
pub fn parse_command(input: &str) -> Option<ConsoleCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let parts: Vec<&str> = rest.splitn(3, ' ').collect();
    let cmd = parts.first()?.to_lowercase();

    match cmd.as_str() {
        "irc" => {
            let subcmd = parts.get(1).map(|s| s.to_lowercase()).unwrap_or_default();
            let sub = match subcmd.as_str() {
                "connect" => IrcCommand::Connect,
                "disconnect" | "dc" => IrcCommand::Disconnect,
                "rejoin" => IrcCommand::Rejoin,
                "reload" => IrcCommand::Reload,
                "users" | "who" => IrcCommand::Users,
                "channel" => IrcCommand::Channel,
                "status" => IrcCommand::Status,
                _ => return None,
            };
            Some(ConsoleCommand::Irc(sub))
        }
        "login" | "join" => {
            let name = single_name(&parts)?;
            Some(ConsoleCommand::Login { name })
        }
        "logout" | "leave" => {
            let name = single_name(&parts)?;
            Some(ConsoleCommand::Logout { name })
        }
        "say" => {
            let name = parts.get(1)?.to_string();
            let text = parts.get(2)?.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(ConsoleCommand::Say { name, text })
        }
        "me" => {
            let name = parts.get(1)?.to_string();
            let text = parts.get(2)?.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(ConsoleCommand::Me { name, text })
        }
        "players" | "list" => Some(ConsoleCommand::Players),
        "help" | "h" => Some(ConsoleCommand::Help),
        "quit" | "exit" => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

fn single_name(parts: &[&str]) -> Option<String> {
    let name = parts.get(1)?.trim();
    if name.is_empty() || parts.len() > 2 {
        return None;
    }
    Some(name.to_string())
}

pub const HELP: &[&str] = &[
    "/irc connect|disconnect|rejoin|reload|users|channel|status",
    "/login <name>          a player joins the game",
    "/logout <name>         a player leaves the game",
    "/say <name> <text>     game chat from <name>",
    "/me <name> <text>      game action from <name>",
    "/players               who is online",
    "/help                  this text",
    "/quit                  disconnect and exit",
    "Anything else is sent as chat from Console.",
];
