//! The capability set the relay needs from an IRC client.
//!
//! [`IrcClientTransport`](super::connection::IrcClientTransport) implements
//! it on top of the `irc` crate. Inbound traffic is not part of the trait:
//! implementations push [`TransportEvent`](super::event::TransportEvent)s into
//! the channel they were built with.

use async_trait::async_trait;

use crate::error::TransportError;

pub const NICKSERV: &str = "NickServ";

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a connection and complete registration. Resolves once the server
    /// has welcomed us, possibly under an alternate nickname.
    async fn connect(
        &self,
        host: &str,
        port: u16,
        password: Option<&str>,
        nickname: &str,
    ) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// The nickname the server currently knows us by.
    fn live_nickname(&self) -> Option<String>;

    fn change_nick(&self, nickname: &str) -> Result<(), TransportError>;

    /// Identify to NickServ.
    fn identify(&self, password: &str) -> Result<(), TransportError> {
        self.send_message(NICKSERV, &format!("IDENTIFY {}", password))
    }

    fn send_message(&self, target: &str, text: &str) -> Result<(), TransportError>;

    fn join_channel(&self, channel: &str, key: Option<&str>) -> Result<(), TransportError>;

    /// Nicknames currently in `channel`, without mode prefixes.
    fn channel_members(&self, channel: &str) -> Vec<String>;

    fn disconnect(&self, message: &str) -> Result<(), TransportError>;
}
