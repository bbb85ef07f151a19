//! Core traits for typed consumers of raw channel messages.

use serde::de::DeserializeOwned;

/// Message parser trait for converting raw frame bytes to messages.
///
/// The channel manager itself never parses frames; a parser is how a consumer turns the raw text
/// handed to [`Hooks::on_message`](super::Hooks::on_message) into typed values.
///
/// # Example
///
/// ```ignore
/// pub struct SimpleParser;
///
/// impl MessageParser<MyMessage> for SimpleParser {
///     fn parse(&self, bytes: &[u8]) -> ath_realtime::Result<Vec<MyMessage>> {
///         let msg: MyMessage = serde_json::from_slice(bytes)?;
///         Ok(vec![msg])
///     }
/// }
/// ```
pub trait MessageParser<M: DeserializeOwned>: Send + Sync + 'static {
    /// Parse incoming bytes into messages.
    ///
    /// May return an empty vec for keepalive or otherwise empty frames.
    /// Handles both single objects and arrays of messages.
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<M>>;
}
