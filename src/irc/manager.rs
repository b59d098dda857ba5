//! Connection lifecycle: bounded connect retries, nickname recovery, channel
//! join and reconnect-after-drop.

use crate::config::{ConfigStore, ConnectionConfig};
use crate::error::{ConnectError, TransportError};
use crate::irc::transport::{Transport, NICKSERV};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    /// We sent QUIT ourselves; the coming disconnect must not reconnect.
    ShuttingDown,
}

/// How the nickname check after registration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NickStatus {
    /// Got the desired nick and identified to NickServ.
    Identified,
    /// Got the desired nick, no password configured.
    Unprotected,
    /// Desired nick taken and no password to reclaim it; keeping `live`.
    Adopted { live: String },
    Reclaimed,
    ReclaimFailed { live: String },
}

/// A nick the server gave us in place of the configured one, kept for later
/// connect cycles while the configured nick stays the same.
#[derive(Debug, Clone)]
struct AdoptedNick {
    configured: String,
    live: String,
}

struct Status {
    state: ConnectionState,
    /// Quit message of a disconnect requested while connecting. The connect
    /// routine picks it up at its next step.
    pending_quit: Option<String>,
}

struct Inner<T: Transport> {
    transport: Arc<T>,
    config: Arc<ConfigStore>,
    status: Mutex<Status>,
    connecting: Arc<AtomicBool>,
    /// Serializes the connect routine with `on_disconnect`.
    lifecycle: tokio::sync::Mutex<()>,
    adopted: Mutex<Option<AdoptedNick>>,
}

/// Clears the exclusive-run flag however the routine exits.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ConnectionManager<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for ConnectionManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: Arc<T>, config: Arc<ConfigStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                status: Mutex::new(Status {
                    state: ConnectionState::Idle,
                    pending_quit: None,
                }),
                connecting: Arc::new(AtomicBool::new(false)),
                lifecycle: tokio::sync::Mutex::new(()),
                adopted: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.status.lock().state
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.inner.transport
    }

    #[cfg(test)]
    fn is_connecting(&self) -> bool {
        self.inner.connecting.load(Ordering::Acquire)
    }

    /// Start the connect routine in the background. Returns `None` without
    /// doing anything if a routine is already running.
    pub fn request_connect(&self) -> Option<JoinHandle<Result<String, ConnectError>>> {
        if self
            .inner
            .connecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("connect already in progress");
            return None;
        }
        let guard = RunGuard(self.inner.connecting.clone());
        let previous = {
            let mut status = self.inner.status.lock();
            status.pending_quit = None;
            std::mem::replace(&mut status.state, ConnectionState::Connecting)
        };
        let inner = self.inner.clone();

        Some(tokio::spawn(async move {
            let lifecycle = inner.lifecycle.lock().await;
            let result = inner.connect_routine(previous).await;
            // Clear the flag before `on_disconnect` can get the lock.
            drop(guard);
            drop(lifecycle);
            result
        }))
    }

    /// Join the configured channel on the current connection.
    pub fn join_channel(&self) -> Result<(), TransportError> {
        let cfg = self
            .inner
            .config
            .connection()
            .ok_or(TransportError::NotConnected)?;
        self.inner.join(&cfg)
    }

    /// Quit on purpose. The disconnect that follows will not reconnect.
    ///
    /// While a connect routine runs, the quit is handed to it: the routine
    /// stops retrying and quits the link if it already came up.
    pub fn disconnect(&self, message: &str) -> Result<(), TransportError> {
        let mut status = self.inner.status.lock();
        if status.state == ConnectionState::Connecting {
            status.pending_quit = Some(message.to_string());
            info!("Cancelling the connect in progress.");
            return Ok(());
        }
        if self.inner.transport.is_connected() {
            status.state = ConnectionState::ShuttingDown;
            drop(status);
            self.inner.transport.disconnect(message)
        } else {
            status.state = ConnectionState::Disconnected;
            Ok(())
        }
    }

    /// React to the transport losing its connection. Returns the handle of
    /// the reconnect routine if one was started.
    pub async fn on_disconnect(&self) -> Option<JoinHandle<Result<String, ConnectError>>> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        {
            let mut status = self.inner.status.lock();
            match status.state {
                ConnectionState::Connected => status.state = ConnectionState::Disconnected,
                ConnectionState::ShuttingDown => {
                    status.state = ConnectionState::Disconnected;
                    info!("Disconnected from IRC.");
                    return None;
                }
                // A routine is queued and will connect anyway.
                ConnectionState::Connecting => return None,
                // Stale: the link was already given up on.
                ConnectionState::Idle | ConnectionState::Disconnected => {
                    debug!("disconnect event while not connected");
                    return None;
                }
            }
        }

        let auto_reconnect = self
            .inner
            .config
            .connection()
            .map(|c| c.auto_reconnect)
            .unwrap_or(false);
        if !auto_reconnect {
            warn!("Lost connection to IRC. Enter '/irc connect' to reconnect.");
            return None;
        }
        warn!("Lost connection to IRC. Reconnecting...");
        self.request_connect()
    }

    #[cfg(test)]
    fn adopted_nick(&self) -> Option<String> {
        self.inner.adopted.lock().as_ref().map(|a| a.live.clone())
    }
}

impl<T: Transport> Inner<T> {
    async fn connect_routine(&self, previous: ConnectionState) -> Result<String, ConnectError> {
        let Some(cfg) = self.config.connection() else {
            error!("No valid configuration is loaded; not connecting.");
            let mut status = self.status.lock();
            status.state = match status.pending_quit.take() {
                Some(_) => ConnectionState::Disconnected,
                None => previous,
            };
            return Err(ConnectError::NotConfigured);
        };

        let nickname = self.desired_nick(&cfg);
        let attempts = cfg.attempts.max(1);

        for attempt in 1..=attempts {
            if self.cancel_requested() {
                return Err(self.abandon());
            }
            if self.transport.is_connected() {
                return self.finish(&nickname);
            }
            info!(
                "Connecting to {}:{} (attempt {}/{})",
                cfg.host, cfg.port, attempt, attempts
            );

            let result = self
                .transport
                .connect(
                    &cfg.host,
                    cfg.port,
                    cfg.server_password.as_deref(),
                    &nickname,
                )
                .await;

            match result {
                Ok(()) => {}
                Err(TransportError::NickCollision) if self.transport.is_connected() => {
                    debug!("nickname in use, registered under an alternate");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Connect attempt failed");
                    self.retry_pause(&cfg, attempt, attempts).await;
                    continue;
                }
            }

            if self.cancel_requested() {
                return Err(self.abandon());
            }
            let status = self.reclaim_nick(&cfg, &nickname).await;
            debug!(?status, "nickname check done");
            if self.cancel_requested() {
                return Err(self.abandon());
            }
            if !self.transport.is_connected() {
                warn!(attempt, "Connection lost during registration");
                self.retry_pause(&cfg, attempt, attempts).await;
                continue;
            }
            if let Err(e) = self.join(&cfg) {
                warn!(channel = %cfg.channel, error = %e, "Failed to join channel");
            }
            return self.finish(&nickname);
        }

        {
            let mut status = self.status.lock();
            status.pending_quit = None;
            status.state = ConnectionState::Disconnected;
        }
        error!(
            "Failed to connect to IRC after {} attempts. Enter '/irc connect' to try again.",
            attempts
        );
        Err(ConnectError::RetriesExhausted { attempts })
    }

    async fn retry_pause(&self, cfg: &ConnectionConfig, attempt: u32, attempts: u32) {
        if attempt < attempts && !cfg.retry_delay.is_zero() && !self.cancel_requested() {
            tokio::time::sleep(cfg.retry_delay).await;
        }
    }

    fn cancel_requested(&self) -> bool {
        self.status.lock().pending_quit.is_some()
    }

    /// Stop connecting on behalf of `disconnect`, quitting a link that is up.
    fn abandon(&self) -> ConnectError {
        let mut status = self.status.lock();
        let message = status.pending_quit.take().unwrap_or_default();
        self.abandon_locked(&mut status, &message)
    }

    fn abandon_locked(&self, status: &mut Status, message: &str) -> ConnectError {
        if self.transport.is_connected() {
            status.state = ConnectionState::ShuttingDown;
            if let Err(e) = self.transport.disconnect(message) {
                warn!(error = %e, "Failed to send QUIT");
            }
        } else {
            status.state = ConnectionState::Disconnected;
        }
        info!("Connect cancelled.");
        ConnectError::Cancelled
    }

    /// Mark the link connected unless a disconnect arrived in the meantime.
    /// Runs under the status lock so a concurrent `disconnect` sees either
    /// `Connecting` with its quit pending here, or `Connected`.
    fn finish(&self, fallback_nick: &str) -> Result<String, ConnectError> {
        let mut status = self.status.lock();
        if let Some(message) = status.pending_quit.take() {
            return Err(self.abandon_locked(&mut status, &message));
        }
        status.state = ConnectionState::Connected;
        let live = self
            .transport
            .live_nickname()
            .unwrap_or_else(|| fallback_nick.to_string());
        info!(nick = %live, "Connected to IRC");
        Ok(live)
    }

    fn desired_nick(&self, cfg: &ConnectionConfig) -> String {
        match &*self.adopted.lock() {
            Some(a) if a.configured == cfg.nickname && cfg.nick_password.is_none() => {
                a.live.clone()
            }
            _ => cfg.nickname.clone(),
        }
    }

    async fn reclaim_nick(&self, cfg: &ConnectionConfig, desired: &str) -> NickStatus {
        let live = self
            .transport
            .live_nickname()
            .unwrap_or_else(|| desired.to_string());

        if live.eq_ignore_ascii_case(desired) {
            return match &cfg.nick_password {
                Some(pass) => {
                    if let Err(e) = self.transport.identify(pass) {
                        warn!(error = %e, "Failed to identify to NickServ");
                    }
                    NickStatus::Identified
                }
                None => NickStatus::Unprotected,
            };
        }

        let Some(pass) = &cfg.nick_password else {
            info!(
                "The nick {} appears to be taken. Using {} instead.",
                desired, live
            );
            *self.adopted.lock() = Some(AdoptedNick {
                configured: cfg.nickname.clone(),
                live: live.clone(),
            });
            return NickStatus::Adopted { live };
        };

        info!("The nick {} is taken. Asking NickServ to release it.", desired);
        if let Err(e) = self
            .transport
            .send_message(NICKSERV, &format!("GHOST {} {}", desired, pass))
        {
            warn!(error = %e, "Failed to send GHOST");
        }
        tokio::time::sleep(cfg.nick_settle_delay).await;
        if let Err(e) = self.transport.change_nick(desired) {
            warn!(error = %e, "Failed to change nick");
        }
        tokio::time::sleep(cfg.nick_settle_delay).await;

        match self.transport.live_nickname() {
            Some(now) if now.eq_ignore_ascii_case(desired) => {
                debug!(nick = %now, "nickname reclaimed");
                NickStatus::Reclaimed
            }
            now => {
                let live = now.unwrap_or(live);
                warn!(
                    "Failed to reclaim the nick {}. Continuing as {}.",
                    desired, live
                );
                NickStatus::ReclaimFailed { live }
            }
        }
    }

    fn join(&self, cfg: &ConnectionConfig) -> Result<(), TransportError> {
        self.transport
            .join_channel(&cfg.channel, cfg.channel_key.as_deref())
    }
}
