//! Pure mappings between IRC events, game-bound notifications and IRC lines,
//! plus the in-channel command language.

use crate::config::ConnectionConfig;
use crate::irc::IrcEvent;
use crate::relay::notification::OutboundNotification;

/// Most names `format_user_list` will print before giving up.
pub const MAX_LISTED: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Players,
}

/// Map an IRC event to what game-side users should see, or `None` if its
/// category is switched off. In-channel commands yield `None` too.
pub fn from_irc(event: &IrcEvent, cfg: &ConnectionConfig) -> Option<OutboundNotification> {
    let flags = &cfg.events;
    match event {
        IrcEvent::Chat { sender, text } => {
            if !flags.chat || (cfg.players_command && parse_command(text).is_some()) {
                return None;
            }
            Some(OutboundNotification::ChatLine {
                actor: sender.clone(),
                text: text.clone(),
            })
        }
        IrcEvent::Action { sender, text } => flags.action.then(|| OutboundNotification::ActionLine {
            actor: sender.clone(),
            text: text.clone(),
        }),
        IrcEvent::Join { sender } => {
            flags.join.then(|| system(sender, format!("joined {}", cfg.channel)))
        }
        IrcEvent::Part { sender } => {
            flags.part.then(|| system(sender, format!("left {}", cfg.channel)))
        }
        IrcEvent::Quit { sender, reason } => {
            flags.quit.then(|| system(sender, with_reason("quit IRC", reason)))
        }
        IrcEvent::Kick {
            actor,
            target,
            reason,
        } => flags.kick.then(|| OutboundNotification::KickEvent {
            actor: target.clone(),
            text: with_reason(&format!("was kicked by {}", actor), reason),
        }),
        IrcEvent::NickChange { old_nick, new_nick } => {
            flags.nick.then(|| system(old_nick, format!("is now known as {}", new_nick)))
        }
        IrcEvent::Topic {
            setter,
            text,
            changed,
        } => (flags.topic && *changed)
            .then(|| system(setter, with_reason("changed the topic", text))),
        IrcEvent::Mode { setter, modes } => {
            flags.mode.then(|| system(setter, format!("set mode {}", modes)))
        }
    }
}

fn system(actor: &str, text: String) -> OutboundNotification {
    OutboundNotification::SystemEvent {
        actor: actor.to_string(),
        text,
    }
}

fn with_reason(base: &str, reason: &str) -> String {
    if reason.is_empty() {
        base.to_string()
    } else {
        format!("{}: {}", base, reason)
    }
}

/// Recognize an in-channel command. Matching is a case-insensitive prefix,
/// so `!Players please` counts.
pub fn parse_command(text: &str) -> Option<ChatCommand> {
    const PLAYERS: &str = "!players";
    text.get(..PLAYERS.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(PLAYERS))
        .map(|_| ChatCommand::Players)
}

pub fn players_reply(names: &[String]) -> String {
    match names.len() {
        0 => "There are 0 players connected.".to_string(),
        1 => format!("There is 1 player connected: {}", names[0]),
        n => format!("There are {} players connected: {}", n, names.join(" ")),
    }
}

/// The game-side notice that someone ran `command`, shown only while chat
/// relay is on.
pub fn command_notice(
    sender: &str,
    command: ChatCommand,
    cfg: &ConnectionConfig,
) -> Option<OutboundNotification> {
    if !cfg.events.chat {
        return None;
    }
    let text = match command {
        ChatCommand::Players => "asked for the player list",
    };
    Some(system(sender, text.to_string()))
}

/// Game text to IRC text. Formatting codes pass through unchanged.
pub fn to_irc(line: &str) -> String {
    line.to_string()
}

pub fn format_user_list(names: &[String], channel: &str) -> String {
    if names.len() > MAX_LISTED {
        return format!(
            "{}: Too many to list! You will have to look at {} yourself to see who's on.",
            channel, channel
        );
    }
    let mut out = format!("{}:", channel);
    for name in names {
        out.push(' ');
        out.push_str(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventFlags;

    fn cfg() -> ConnectionConfig {
        ConnectionConfig::new("irc.test", 6667, "Relay", "#game")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sys(actor: &str, text: &str) -> Option<OutboundNotification> {
        Some(OutboundNotification::SystemEvent {
            actor: actor.into(),
            text: text.into(),
        })
    }

    #[test]
    fn test_rendered_bodies() {
        let c = cfg();
        assert_eq!(
            from_irc(&IrcEvent::Chat { sender: "a".into(), text: "hi".into() }, &c),
            Some(OutboundNotification::ChatLine { actor: "a".into(), text: "hi".into() })
        );
        assert_eq!(
            from_irc(&IrcEvent::Action { sender: "a".into(), text: "waves".into() }, &c),
            Some(OutboundNotification::ActionLine { actor: "a".into(), text: "waves".into() })
        );
        assert_eq!(from_irc(&IrcEvent::Join { sender: "a".into() }, &c), sys("a", "joined #game"));
        assert_eq!(from_irc(&IrcEvent::Part { sender: "a".into() }, &c), sys("a", "left #game"));
        assert_eq!(
            from_irc(&IrcEvent::Quit { sender: "a".into(), reason: "Ping timeout".into() }, &c),
            sys("a", "quit IRC: Ping timeout")
        );
        assert_eq!(
            from_irc(&IrcEvent::Quit { sender: "a".into(), reason: String::new() }, &c),
            sys("a", "quit IRC")
        );
        assert_eq!(
            from_irc(
                &IrcEvent::NickChange { old_nick: "a".into(), new_nick: "b".into() },
                &c
            ),
            sys("a", "is now known as b")
        );
        assert_eq!(
            from_irc(&IrcEvent::Mode { setter: "op".into(), modes: "+o a".into() }, &c),
            sys("op", "set mode +o a")
        );
    }

    #[test]
    fn test_kick_body_names_target() {
        let c = cfg();
        let kick = |reason: &str| IrcEvent::Kick {
            actor: "op".into(),
            target: "bob".into(),
            reason: reason.into(),
        };
        assert_eq!(
            from_irc(&kick("spam"), &c),
            Some(OutboundNotification::KickEvent {
                actor: "bob".into(),
                text: "was kicked by op: spam".into()
            })
        );
        assert_eq!(
            from_irc(&kick(""), &c),
            Some(OutboundNotification::KickEvent {
                actor: "bob".into(),
                text: "was kicked by op".into()
            })
        );
    }

    #[test]
    fn test_topic_only_when_changed() {
        let c = cfg();
        let topic = |changed| IrcEvent::Topic {
            setter: "op".into(),
            text: "Build night".into(),
            changed,
        };
        assert_eq!(from_irc(&topic(false), &c), None);
        assert_eq!(from_irc(&topic(true), &c), sys("op", "changed the topic: Build night"));
    }

    #[test]
    fn test_disabled_categories_yield_nothing() {
        let mut c = cfg();
        c.events = EventFlags {
            chat: false,
            action: false,
            join: false,
            part: false,
            quit: false,
            kick: false,
            nick: false,
            mode: false,
            topic: false,
        };
        let events = [
            IrcEvent::Chat { sender: "a".into(), text: "x".into() },
            IrcEvent::Action { sender: "a".into(), text: "x".into() },
            IrcEvent::Join { sender: "a".into() },
            IrcEvent::Part { sender: "a".into() },
            IrcEvent::Quit { sender: "a".into(), reason: String::new() },
            IrcEvent::Kick { actor: "a".into(), target: "b".into(), reason: String::new() },
            IrcEvent::NickChange { old_nick: "a".into(), new_nick: "b".into() },
            IrcEvent::Topic { setter: "a".into(), text: "t".into(), changed: true },
            IrcEvent::Mode { setter: "a".into(), modes: "+m".into() },
        ];
        for event in &events {
            assert_eq!(from_irc(event, &c), None, "{:?}", event);
        }
    }

    #[test]
    fn test_command_chat_is_not_relayed() {
        let mut c = cfg();
        let event = IrcEvent::Chat { sender: "a".into(), text: "!PLAYERS".into() };
        assert_eq!(from_irc(&event, &c), None);

        c.players_command = false;
        assert!(from_irc(&event, &c).is_some());
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("!players"), Some(ChatCommand::Players));
        assert_eq!(parse_command("!Players please"), Some(ChatCommand::Players));
        assert_eq!(parse_command("!play"), None);
        assert_eq!(parse_command("hey !players"), None);
        assert_eq!(parse_command("ünïcødé"), None);
    }

    #[test]
    fn test_players_reply_forms() {
        assert_eq!(players_reply(&[]), "There are 0 players connected.");
        assert_eq!(players_reply(&names(&["Steve"])), "There is 1 player connected: Steve");
        assert_eq!(
            players_reply(&names(&["Steve", "Alex", "Herobrine"])),
            "There are 3 players connected: Steve Alex Herobrine"
        );
    }

    #[test]
    fn test_command_notice_follows_chat_flag() {
        let mut c = cfg();
        assert_eq!(
            command_notice("a", ChatCommand::Players, &c),
            sys("a", "asked for the player list")
        );
        c.events.chat = false;
        assert_eq!(command_notice("a", ChatCommand::Players, &c), None);
    }

    #[test]
    fn test_to_irc_is_idempotent() {
        for line in ["", "<Steve> hi", "\u{a7}cred text"] {
            assert_eq!(to_irc(&to_irc(line)), to_irc(line));
        }
    }

    #[test]
    fn test_user_list_limit() {
        assert_eq!(format_user_list(&[], "#game"), "#game:");
        assert_eq!(format_user_list(&names(&["a", "b"]), "#game"), "#game: a b");

        let full: Vec<String> = (0..MAX_LISTED).map(|i| format!("u{}", i)).collect();
        let listed = format_user_list(&full, "#game");
        assert_eq!(listed.split(' ').count(), MAX_LISTED + 1);

        let over: Vec<String> = (0..=MAX_LISTED).map(|i| format!("u{}", i)).collect();
        assert_eq!(
            format_user_list(&over, "#game"),
            "#game: Too many to list! You will have to look at #game yourself to see who's on."
        );
    }
}
