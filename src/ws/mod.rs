//! Core WebSocket infrastructure.
//!
//! This module provides the reconnecting channel manager that keeps one server-pushed feed alive,
//! independent of what the feed carries.
//!
//! # Architecture
//!
//! - [`ChannelManager`]: Connection lifecycle with liveness probes and bounded reconnection
//! - [`Hooks`]: Named consumer callbacks, each defaulting to a no-op
//! - [`Connector`] / [`Transport`]: Socket seam, backed by `tokio-tungstenite` by default
//! - [`MessageParser`]: Trait for turning raw frames into typed messages
//!
//! # Example
//!
//! ```rust, no_run
//! use ath_realtime::ws::config::Config;
//! use ath_realtime::ws::{ChannelManager, Hooks};
//!
//! # async fn run() -> ath_realtime::Result<()> {
//! let hooks = Hooks::new()
//!     .on_message(|text| println!("battle: {text}"))
//!     .on_exhausted(|| eprintln!("battle feed gave up"));
//! let battles = ChannelManager::connect("ws://localhost:8080/api/ws/battle", Config::default(), hooks)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod hooks;
pub mod traits;
pub mod transport;

pub use connection::{ChannelManager, ChannelState};
pub use hooks::Hooks;
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use traits::*;
pub use transport::{CloseEvent, Connector, Inbound, Transport, TungsteniteConnector};
