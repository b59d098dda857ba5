/// A channel event reported by the transport, already stripped of IRC
/// protocol details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    Chat {
        sender: String,
        text: String,
    },
    /// CTCP ACTION (`/me`) sent to the channel.
    Action {
        sender: String,
        text: String,
    },
    Join {
        sender: String,
    },
    Part {
        sender: String,
    },
    Quit {
        sender: String,
        reason: String,
    },
    Kick {
        actor: String,
        target: String,
        reason: String,
    },
    NickChange {
        old_nick: String,
        new_nick: String,
    },
    /// `changed` is false for the topic reported on join (RPL_TOPIC) and
    /// true for a live TOPIC change.
    Topic {
        setter: String,
        text: String,
        changed: bool,
    },
    Mode {
        setter: String,
        modes: String,
    },
}

/// What the transport pushes to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Irc(IrcEvent),
    /// A registered connection was lost or closed.
    Disconnected,
}
