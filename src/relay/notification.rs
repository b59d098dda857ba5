//! What the relay hands to the game side, and what it asks of it.

/// A game-bound notification. Bodies are already rendered; no IRC types
/// leak through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundNotification {
    ChatLine { actor: String, text: String },
    ActionLine { actor: String, text: String },
    SystemEvent { actor: String, text: String },
    /// `actor` is the user who was kicked.
    KickEvent { actor: String, text: String },
}

impl OutboundNotification {
    pub fn actor(&self) -> &str {
        match self {
            Self::ChatLine { actor, .. }
            | Self::ActionLine { actor, .. }
            | Self::SystemEvent { actor, .. }
            | Self::KickEvent { actor, .. } => actor,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::ChatLine { text, .. }
            | Self::ActionLine { text, .. }
            | Self::SystemEvent { text, .. }
            | Self::KickEvent { text, .. } => text,
        }
    }
}

/// Delivers notifications to game-side users.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: OutboundNotification);
}

/// Who is playing right now, in display order.
pub trait PresenceProvider: Send + Sync {
    fn online_players(&self) -> Vec<String>;
}
