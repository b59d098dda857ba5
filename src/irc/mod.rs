//! IRC side of the relay: the transport seam, its `irc`-crate adapter and
//! the connection lifecycle manager.

pub mod connection;
pub mod event;
pub mod manager;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use connection::IrcClientTransport;
pub use event::{IrcEvent, TransportEvent};
pub use manager::{ConnectionManager, ConnectionState, NickStatus};
pub use transport::Transport;
