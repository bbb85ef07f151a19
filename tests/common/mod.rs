#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Each test binary only uses a subset of these helpers"
)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ath_realtime::ws::{CloseEvent, Connector, Hooks, Inbound, Transport, WsError};
use tokio::sync::mpsc;

/// What the fake server does with one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Accept,
    Refuse,
}

#[derive(Debug)]
struct Shared {
    script: VecDeque<Attempt>,
    fallback: Attempt,
    attempts: usize,
    open: usize,
    max_open: usize,
    /// How long closing a transport takes
    close_delay: Duration,
    /// Frames written by the client, tagged with the connection they were written on
    sent: Vec<(usize, String)>,
}

/// Scripted in-memory [`Connector`]. Attempts follow the script, then the fallback.
pub struct FakeConnector {
    shared: Arc<Mutex<Shared>>,
    peers_tx: mpsc::UnboundedSender<Peer>,
}

/// Test-side view of a [`FakeConnector`] after it moved into a manager.
pub struct Harness {
    shared: Arc<Mutex<Shared>>,
    peers_rx: mpsc::UnboundedReceiver<Peer>,
}

pub fn fake<I>(script: I, fallback: Attempt) -> (FakeConnector, Harness)
where
    I: IntoIterator<Item = Attempt>,
{
    let shared = Arc::new(Mutex::new(Shared {
        script: script.into_iter().collect(),
        fallback,
        attempts: 0,
        open: 0,
        max_open: 0,
        close_delay: Duration::ZERO,
        sent: Vec::new(),
    }));
    let (peers_tx, peers_rx) = mpsc::unbounded_channel();

    (
        FakeConnector {
            shared: Arc::clone(&shared),
            peers_tx,
        },
        Harness { shared, peers_rx },
    )
}

impl Harness {
    /// Connection attempts made so far, accepted or refused.
    pub fn attempts(&self) -> usize {
        self.shared.lock().unwrap().attempts
    }

    /// Transports currently open.
    pub fn open(&self) -> usize {
        self.shared.lock().unwrap().open
    }

    /// Highest number of simultaneously open transports seen.
    pub fn max_open(&self) -> usize {
        self.shared.lock().unwrap().max_open
    }

    /// Make every later transport take `delay` to close, like a socket flushing its close frame.
    pub fn set_close_delay(&self, delay: Duration) {
        self.shared.lock().unwrap().close_delay = delay;
    }

    pub fn sent(&self) -> Vec<String> {
        self.shared
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn sent_on(&self, connection: usize) -> Vec<String> {
        self.shared
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(id, _)| *id == connection)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Server side of the next accepted connection.
    pub async fn next_peer(&mut self) -> Peer {
        self.peers_rx.recv().await.unwrap()
    }
}

/// Server side of one accepted fake connection. Dropping it ends the stream without a close frame.
pub struct Peer {
    pub id: usize,
    inbound_tx: mpsc::UnboundedSender<Result<Inbound, WsError>>,
}

impl Peer {
    pub fn text(&self, text: &str) {
        drop(self.inbound_tx.send(Ok(Inbound::Text(text.to_owned()))));
    }

    pub fn binary(&self, bytes: &[u8]) {
        drop(self.inbound_tx.send(Ok(Inbound::Binary(bytes.to_vec()))));
    }

    pub fn close(&self, code: u16, reason: &str) {
        drop(self.inbound_tx.send(Ok(Inbound::Close(CloseEvent::new(
            code,
            reason.to_owned(),
            true,
        )))));
    }

    pub fn error(&self, reason: &str) {
        drop(
            self.inbound_tx
                .send(Err(WsError::Transport(reason.to_owned()))),
        );
    }
}

pub struct FakeTransport {
    id: usize,
    shared: Arc<Mutex<Shared>>,
    inbound_rx: mpsc::UnboundedReceiver<Result<Inbound, WsError>>,
    closed: bool,
}

impl FakeTransport {
    fn mark_closed(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.lock().unwrap().open -= 1;
        }
    }
}

impl Drop for FakeTransport {
    fn drop(&mut self) {
        self.mark_closed();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn recv(&mut self) -> Option<Result<Inbound, WsError>> {
        self.inbound_rx.recv().await
    }

    async fn send(&mut self, text: String) -> Result<(), WsError> {
        if self.closed {
            return Err(WsError::ConnectionClosed);
        }
        self.shared.lock().unwrap().sent.push((self.id, text));
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }

        let delay = self.shared.lock().unwrap().close_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.mark_closed();
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self, _endpoint: &str) -> Result<Self::Transport, WsError> {
        let (id, attempt) = {
            let mut shared = self.shared.lock().unwrap();
            shared.attempts += 1;
            let attempt = shared.script.pop_front().unwrap_or(shared.fallback);
            if attempt == Attempt::Accept {
                shared.open += 1;
                shared.max_open = shared.max_open.max(shared.open);
            }
            (shared.attempts, attempt)
        };

        match attempt {
            Attempt::Refuse => Err(WsError::Transport("connection refused".to_owned())),
            Attempt::Accept => {
                let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
                drop(self.peers_tx.send(Peer { id, inbound_tx }));

                Ok(FakeTransport {
                    id,
                    shared: Arc::clone(&self.shared),
                    inbound_rx,
                    closed: false,
                })
            }
        }
    }
}

/// Hook invocations in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Close(u16),
    Message(String),
    Error,
    Exhausted,
}

pub type Events = Arc<Mutex<Vec<Event>>>;

/// Hooks that record every invocation.
pub fn recording_hooks() -> (Hooks, Events) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));

    let on_open = Arc::clone(&events);
    let on_close = Arc::clone(&events);
    let on_message = Arc::clone(&events);
    let on_error = Arc::clone(&events);
    let on_exhausted = Arc::clone(&events);

    let hooks = Hooks::new()
        .on_open(move || on_open.lock().unwrap().push(Event::Open))
        .on_close(move |event| on_close.lock().unwrap().push(Event::Close(event.code)))
        .on_message(move |text| {
            on_message
                .lock()
                .unwrap()
                .push(Event::Message(text.to_owned()));
        })
        .on_error(move |_| on_error.lock().unwrap().push(Event::Error))
        .on_exhausted(move || on_exhausted.lock().unwrap().push(Event::Exhausted));

    (hooks, events)
}

pub fn snapshot(events: &Events) -> Vec<Event> {
    events.lock().unwrap().clone()
}
