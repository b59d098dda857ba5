//! Bridge between IRC events and the game side.

pub mod format;
pub mod notification;
pub mod session;
pub mod translator;

pub use notification::{NotificationSink, OutboundNotification, PresenceProvider};
pub use session::{GameEvent, RelaySession};
