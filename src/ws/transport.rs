//! Transport seam between the channel manager and the socket it drives.
//!
//! [`Connector`] opens one [`Transport`] per connection attempt. The default implementation
//! is backed by `tokio-tungstenite`; tests substitute a scripted in-memory transport.

use async_trait::async_trait;
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::error::WsError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code used when the peer disappears without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code used when a close frame carries no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Close code used for an orderly shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Describes how a connection ended.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// WebSocket close code
    pub code: u16,
    /// Close reason sent by the peer, empty if none
    pub reason: String,
    /// Whether the closing handshake completed
    pub was_clean: bool,
}

impl CloseEvent {
    #[must_use]
    pub fn new(code: u16, reason: String, was_clean: bool) -> Self {
        Self {
            code,
            reason,
            was_clean,
        }
    }

    /// Close event for a connection that dropped, failed, or errored.
    #[must_use]
    pub fn abnormal() -> Self {
        Self::new(ABNORMAL_CLOSURE, String::new(), false)
    }
}

/// A frame received from a [`Transport`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    /// The peer started or completed the closing handshake
    Close(CloseEvent),
}

/// One open, bidirectional connection.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Wait for the next frame. `None` means the connection ended without a close frame.
    ///
    /// Must be cancel-safe: the manager polls it inside `tokio::select!`.
    async fn recv(&mut self) -> Option<Result<Inbound, WsError>>;

    /// Write one text frame.
    async fn send(&mut self, text: String) -> Result<(), WsError>;

    /// Close the connection. Closing an already closed transport is a no-op.
    async fn close(&mut self);
}

/// Opens transports to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, endpoint: &str) -> Result<Self::Transport, WsError>;
}

/// [`Connector`] backed by `tokio-tungstenite`, with TLS for `wss://` endpoints.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    type Transport = TungsteniteTransport;

    async fn connect(&self, endpoint: &str) -> Result<Self::Transport, WsError> {
        let (stream, _response) = connect_async(endpoint).await?;

        Ok(TungsteniteTransport {
            stream,
            closed: false,
        })
    }
}

pub struct TungsteniteTransport {
    stream: WsStream,
    closed: bool,
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn recv(&mut self) -> Option<Result<Inbound, WsError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };

            match message {
                Message::Text(text) => return Some(Ok(Inbound::Text(text.as_str().to_owned()))),
                Message::Binary(bytes) => return Some(Ok(Inbound::Binary(bytes.to_vec()))),
                Message::Close(frame) => {
                    let event = frame.map_or_else(
                        || CloseEvent::new(NO_STATUS_RECEIVED, String::new(), true),
                        |frame| {
                            CloseEvent::new(
                                u16::from(frame.code),
                                frame.reason.as_str().to_owned(),
                                true,
                            )
                        },
                    );
                    return Some(Ok(Inbound::Close(event)));
                }
                // Ping replies are queued by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), WsError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.stream.close(None).await {
            #[cfg(feature = "tracing")]
            tracing::trace!(error = %e, "Closing WebSocket stream failed");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abnormal_close_is_not_clean() {
        let event = CloseEvent::abnormal();

        assert_eq!(event.code, ABNORMAL_CLOSURE);
        assert!(!event.was_clean, "abnormal closes are never clean");
        assert!(event.reason.is_empty(), "abnormal closes carry no reason");
    }
}
