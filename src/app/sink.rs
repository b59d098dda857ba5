//! Prints relayed IRC activity on stdout using the
//! `line_formatting.to_minecraft` templates.

use chrono::Local;
use ircrelay::config::ConfigStore;
use ircrelay::relay::format;
use ircrelay::relay::{NotificationSink, OutboundNotification};
use std::sync::Arc;

pub struct ConsoleSink {
    config: Arc<ConfigStore>,
}

impl ConsoleSink {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }

    pub fn render(&self, notification: &OutboundNotification) -> String {
        let (key, fallback) = match notification {
            OutboundNotification::ChatLine { .. } => ("chat", format::GAME_CHAT),
            OutboundNotification::ActionLine { .. } => ("action", format::GAME_ACTION),
            OutboundNotification::SystemEvent { .. } => ("event", format::GAME_EVENT),
            OutboundNotification::KickEvent { .. } => ("kick", format::GAME_KICK),
        };
        let template = self
            .config
            .get_string(&format!("line_formatting.to_minecraft.{}", key));
        format::render(&template, fallback, notification.actor(), notification.text())
    }
}

impl NotificationSink for ConsoleSink {
    fn deliver(&self, notification: OutboundNotification) {
        println!(
            "[{}] {}",
            Local::now().format("%H:%M:%S"),
            self.render(&notification)
        );
    }
}
