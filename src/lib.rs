//! Relay between one IRC channel and a game server's chat.
//!
//! [`relay::RelaySession`] is the entry point: give it a
//! [`Transport`](crate::irc::Transport), a [`config::ConfigStore`], a notification sink and a
//! presence provider, feed it transport events and game events.

pub mod config;
pub mod error;
pub mod irc;
pub mod relay;
