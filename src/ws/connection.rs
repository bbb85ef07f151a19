#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt;
use std::time::{Duration, Instant};

use backoff::backoff::Backoff;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;

use super::config::Config;
use super::error::WsError;
use super::hooks::Hooks;
use super::transport::{CloseEvent, Connector, Inbound, Transport, TungsteniteConnector};
use crate::Result;
use crate::error::Error;

/// Lifecycle state of a [`ChannelManager`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// A connection attempt is in flight
    Connecting,
    /// Connected; liveness probes and outbound sends are active
    Open {
        /// When the connection was established
        since: Instant,
    },
    /// The last connection ended and no retry has been scheduled yet
    Closed,
    /// Waiting out the retry delay before the next attempt
    Reconnecting {
        /// Attempt number since the last successful open, starting at 1
        attempt: u32,
    },
    /// The reconnection budget is spent; nothing happens until the manager is closed
    Exhausted,
    /// [`ChannelManager::close`] was called; terminal
    Disposed,
}

impl ChannelState {
    /// Check if the connection is currently open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Check if the manager will never connect again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Disposed)
    }
}

/// Liveness probe written on the wire while the connection is open.
#[derive(Debug, Serialize)]
struct Heartbeat {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: i64,
}

impl Heartbeat {
    fn now() -> Self {
        Self {
            kind: "heartbeat",
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Keeps one logical subscription to a server-pushed WebSocket feed alive.
///
/// The manager connects as soon as it is constructed, sends a heartbeat probe every
/// [`Config::liveness_interval`] while open, and reconnects after every close, waiting
/// [`Config::retry_delay`] in between, until [`Config::max_retry_attempts`] consecutive
/// attempts have been spent. A successful open restores the full budget.
///
/// Every reaction (connecting, dispatching a frame, probing, waiting, writing) runs on a single
/// background task per manager, so hooks of one manager never overlap and messages are delivered
/// in arrival order. Independent managers share nothing.
///
/// Dropping the manager is equivalent to calling [`ChannelManager::close`].
///
/// # Example
///
/// ```rust, no_run
/// use ath_realtime::ws::config::Config;
/// use ath_realtime::ws::{ChannelManager, Hooks};
///
/// # async fn run() -> ath_realtime::Result<()> {
/// let hooks = Hooks::new().on_message(|text| println!("agent update: {text}"));
/// let agents = ChannelManager::connect("wss://example.com/api/ws/agents", Config::default(), hooks)?;
///
/// // ...
///
/// agents.close();
/// # Ok(())
/// # }
/// ```
pub struct ChannelManager {
    endpoint: String,
    /// Shared with the session task; transitions are refused once `Disposed`
    state_tx: watch::Sender<ChannelState>,
    /// Outgoing payloads, only fed while open
    sender_tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl ChannelManager {
    /// Create a manager backed by `tokio-tungstenite` and start connecting to `endpoint`.
    ///
    /// Must be called from within a tokio runtime. Connection failures, including a malformed
    /// endpoint, are reported through [`Hooks::on_error`] rather than returned.
    pub fn connect(endpoint: &str, config: Config, hooks: Hooks) -> Result<Self> {
        Self::with_connector(TungsteniteConnector, endpoint, config, hooks)
    }

    /// Create a manager that opens its transports through `connector`.
    pub fn with_connector<C: Connector>(
        connector: C,
        endpoint: &str,
        config: Config,
        hooks: Hooks,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            Error::validation(format!("ChannelManager requires a tokio runtime: {e}"))
        })?;

        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ChannelState::Connecting);
        let cancel = CancellationToken::new();

        let session = Session {
            connector,
            endpoint: endpoint.to_owned(),
            backoff: config.retry_delay.backoff(),
            config,
            hooks,
            state_tx: state_tx.clone(),
            sender_rx,
            cancel: cancel.clone(),
            attempt: 0,
        };

        runtime.spawn(session.run());

        Ok(Self {
            endpoint: endpoint.to_owned(),
            state_tx,
            sender_tx,
            cancel,
        })
    }

    /// Serialize `payload` as JSON and send it if the connection is open.
    ///
    /// When the connection is not open the payload is dropped: nothing is queued and no error is
    /// returned. The only error is a payload that fails to serialize.
    pub fn send<R: Serialize>(&self, payload: &R) -> Result<()> {
        let json = serde_json::to_string(payload)?;
        self.send_raw(json);
        Ok(())
    }

    /// Send pre-serialized text if the connection is open; dropped otherwise.
    pub fn send_raw(&self, text: String) {
        if self.state().is_open() {
            // A send racing with a disconnect is discarded by the session
            _ = self.sender_tx.send(text);
        } else {
            #[cfg(feature = "tracing")]
            tracing::trace!(endpoint = %self.endpoint, "Dropping send, channel is not open");
        }
    }

    /// Shut the manager down for good.
    ///
    /// Cancels any pending retry and the liveness timer and closes the open connection. Once this
    /// returns, no connection attempt, probe, or hook invocation is started. Calling it again is a
    /// no-op.
    pub fn close(&self) {
        let previous = self.state_tx.send_replace(ChannelState::Disposed);
        self.cancel.cancel();

        #[cfg(feature = "tracing")]
        {
            if previous != ChannelState::Disposed {
                tracing::debug!(endpoint = %self.endpoint, ?previous, "Channel disposed");
            }
        }
        #[cfg(not(feature = "tracing"))]
        let _ = &previous;
    }

    /// Get the current channel state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.state_tx.borrow()
    }

    /// Subscribe to channel state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// The endpoint this manager connects to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelManager")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Why a connected session stopped.
enum Ended {
    Closed(CloseEvent),
    Disposed,
}

/// Connection loop state, owned by the background task.
struct Session<C: Connector> {
    connector: C,
    endpoint: String,
    config: Config,
    hooks: Hooks,
    state_tx: watch::Sender<ChannelState>,
    sender_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    /// Reconnection attempts since the last successful open
    attempt: u32,
    backoff: Box<dyn Backoff + Send>,
}

impl<C: Connector> Session<C> {
    /// Move to `next` unless the manager has been disposed.
    fn transition(&self, next: ChannelState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if *state == ChannelState::Disposed {
                return false;
            }
            *state = next;
            true
        })
    }

    /// Main connection loop with automatic reconnection.
    async fn run(mut self) {
        loop {
            if !self.transition(ChannelState::Connecting) {
                break;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(endpoint = %self.endpoint, attempt = self.attempt, "Connecting");

            let connected = tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,
                result = self.connector.connect(&self.endpoint) => result,
            };

            let event = match connected {
                Ok(mut transport) => {
                    if !self.transition(ChannelState::Open {
                        since: Instant::now(),
                    }) {
                        transport.close().await;
                        break;
                    }

                    self.attempt = 0;
                    self.backoff.reset();

                    #[cfg(feature = "tracing")]
                    tracing::debug!(endpoint = %self.endpoint, "Channel open");

                    self.hooks.open();
                    let ended = self.drive(&mut transport).await;

                    // Closed before the next attempt so two transports never coexist
                    transport.close().await;
                    drop(transport);
                    self.discard_pending_sends();

                    match ended {
                        Ended::Closed(event) => event,
                        Ended::Disposed => break,
                    }
                }
                Err(e) => {
                    if self.is_disposed() {
                        break;
                    }

                    #[cfg(feature = "tracing")]
                    tracing::warn!(endpoint = %self.endpoint, error = %e, "Unable to connect");

                    self.hooks.error(&e);
                    CloseEvent::abnormal()
                }
            };

            if !self.transition(ChannelState::Closed) {
                break;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                endpoint = %self.endpoint,
                code = event.code,
                reason = %event.reason,
                was_clean = event.was_clean,
                "Channel closed"
            );

            self.hooks.close(&event);

            if !self.wait_for_retry().await {
                break;
            }
        }
    }

    /// Pump an open transport until it closes, fails, or the manager is disposed.
    async fn drive(&mut self, transport: &mut C::Transport) -> Ended {
        let period = self.config.effective_liveness_interval();
        let mut liveness = interval_at(tokio::time::Instant::now() + period, period);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => return Ended::Disposed,

                inbound = transport.recv() => match inbound {
                    Some(Ok(Inbound::Text(text))) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(%text, "Received WebSocket text message");

                        self.hooks.message(&text);
                    }
                    Some(Ok(Inbound::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => self.hooks.message(&text),
                        Err(e) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(error = %e, "Dropping non UTF-8 binary frame");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &e;
                        }
                    },
                    Some(Ok(Inbound::Close(event))) => return Ended::Closed(event),
                    Some(Err(e)) => return self.fail(transport, &e).await,
                    None => return Ended::Closed(CloseEvent::abnormal()),
                },

                Some(text) = self.sender_rx.recv() => {
                    if let Err(e) = transport.send(text).await {
                        return self.fail(transport, &e).await;
                    }
                }

                _ = liveness.tick() => {
                    if !self.state_tx.borrow().is_open() {
                        continue;
                    }

                    let probe = match serde_json::to_string(&Heartbeat::now()) {
                        Ok(probe) => probe,
                        Err(e) => {
                            #[cfg(feature = "tracing")]
                            tracing::error!(error = %e, "Unable to serialize heartbeat");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &e;
                            continue;
                        }
                    };

                    if let Err(e) = transport.send(probe).await {
                        return self.fail(transport, &e).await;
                    }
                }
            }
        }
    }

    /// Whether [`ChannelManager::close`] has been called.
    fn is_disposed(&self) -> bool {
        *self.state_tx.borrow() == ChannelState::Disposed
    }

    /// Close the transport first so the close path always runs, then report the error.
    async fn fail(&mut self, transport: &mut C::Transport, error: &WsError) -> Ended {
        transport.close().await;

        // Closing can take a while; the manager may have been disposed meanwhile
        if self.is_disposed() {
            return Ended::Disposed;
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(endpoint = %self.endpoint, %error, "WebSocket transport error");

        self.hooks.error(error);
        Ended::Closed(CloseEvent::abnormal())
    }

    /// Payloads accepted while open are never replayed on a later connection.
    fn discard_pending_sends(&mut self) {
        while self.sender_rx.try_recv().is_ok() {}
    }

    /// Wait out the retry delay. Returns `false` if the manager should stop for good.
    async fn wait_for_retry(&mut self) -> bool {
        if self.attempt >= self.config.max_retry_attempts {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                endpoint = %self.endpoint,
                max_attempts = self.config.max_retry_attempts,
                "Reconnection attempts exhausted, channel is idle"
            );

            if self.transition(ChannelState::Exhausted) {
                self.hooks.exhausted();
            }
            return false;
        }

        self.attempt = self.attempt.saturating_add(1);
        if !self.transition(ChannelState::Reconnecting {
            attempt: self.attempt,
        }) {
            return false;
        }

        let delay = self.backoff.next_backoff().unwrap_or(Duration::ZERO);

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %self.endpoint, attempt = self.attempt, ?delay, "Scheduling reconnect");

        tokio::select! {
            biased;

            () = self.cancel.cancelled() => false,
            () = sleep(delay) => true,
        }
    }
}
