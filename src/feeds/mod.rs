//! Typed layer over the two game feeds.
//!
//! The game server publishes newly created agents on `ws/agents` and battle results on
//! `ws/battle`, both under the HTTP API base. Each feed gets its own
//! [`ChannelManager`](crate::ws::ChannelManager); this module only derives the endpoints and
//! turns raw frames into typed values.
//!
//! # Example
//!
//! ```rust, no_run
//! use ath_realtime::feeds::{BattleMessage, BattleParser, Feed, message_hook};
//! use ath_realtime::ws::config::Config;
//! use ath_realtime::ws::{ChannelManager, Hooks};
//!
//! # async fn run() -> ath_realtime::Result<()> {
//! let endpoint = Feed::Battles.endpoint("https://example.com/api")?;
//! let hooks = Hooks::new().on_message(message_hook(BattleParser, |message: BattleMessage| {
//!     if let Some(battle) = message.as_battle_result() {
//!         println!("battle {} won by {:?}", battle.id, battle.winner_id());
//!     }
//! }));
//! let battles = ChannelManager::connect(endpoint.as_str(), Config::default(), hooks)?;
//! # Ok(())
//! # }
//! ```

pub mod types;

use serde::de::DeserializeOwned;
use url::Url;

pub use types::{AgentCreated, Battle, BattleMessage, BattleStats, Outcome};

use crate::Result;
use crate::error::Error;
use crate::ws::MessageParser;

/// The feeds published by the game server.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Feed {
    /// Newly created agents, as [`AgentCreated`]
    Agents,
    /// Battle results, as [`BattleMessage`]
    Battles,
}

impl Feed {
    /// Path of the feed relative to the API base.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Agents => "ws/agents",
            Self::Battles => "ws/battle",
        }
    }

    /// Derive the WebSocket endpoint of this feed from the HTTP API base URL.
    ///
    /// `http` becomes `ws` and `https` becomes `wss`; `ws` and `wss` bases are used as is.
    ///
    /// ```
    /// use ath_realtime::feeds::Feed;
    ///
    /// let endpoint = Feed::Agents.endpoint("https://example.com/api").unwrap();
    /// assert_eq!(endpoint.as_str(), "wss://example.com/api/ws/agents");
    /// ```
    pub fn endpoint(self, api_base: &str) -> Result<Url> {
        let mut base = Url::parse(api_base).map_err(|e| Error::endpoint(api_base, e.to_string()))?;

        let scheme = match base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(Error::endpoint(
                    api_base,
                    format!("unsupported scheme {other:?}, expected http(s) or ws(s)"),
                ));
            }
        };
        base.set_scheme(scheme)
            .map_err(|()| Error::endpoint(api_base, format!("unable to switch to {scheme}")))?;

        // Treat the base as a directory so `join` appends instead of replacing the last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(self.path())
            .map_err(|e| Error::endpoint(api_base, e.to_string()))
    }
}

/// Deserialize messages from the byte slice.
///
/// Handles both single objects and arrays of messages.
/// Returns an empty vector for empty or whitespace-only input.
pub fn parse_messages<M: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<M>> {
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&[][..], |start| &bytes[start..]);

    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.first() == Some(&b'[') {
        Ok(serde_json::from_slice(trimmed)?)
    } else {
        let msg: M = serde_json::from_slice(trimmed)?;
        Ok(vec![msg])
    }
}

/// Parser for the agents feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentParser;

impl MessageParser<AgentCreated> for AgentParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<AgentCreated>> {
        parse_messages(bytes)
    }
}

/// Parser for the battles feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BattleParser;

impl MessageParser<BattleMessage> for BattleParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<BattleMessage>> {
        parse_messages(bytes)
    }
}

/// Build an `on_message` hook that parses each frame with `parser` and hands every message to
/// `callback`. Frames that fail to parse are logged and skipped.
pub fn message_hook<M, P, F>(parser: P, mut callback: F) -> impl FnMut(&str) + Send + 'static
where
    M: DeserializeOwned + 'static,
    P: MessageParser<M>,
    F: FnMut(M) + Send + 'static,
{
    move |text: &str| match parser.parse(text.as_bytes()) {
        Ok(messages) => {
            for message in messages {
                callback(message);
            }
        }
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(%text, error = %e, "Failed to parse feed message");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }
}
