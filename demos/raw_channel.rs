//! Connects a bare channel to any WebSocket endpoint and logs every lifecycle event.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example raw_channel -- wss://example.com/api/ws/agents
//! ```

use std::time::Duration;

use ath_realtime::ws::config::{Config, ExponentialDelay, RetryDelay};
use ath_realtime::ws::{ChannelManager, Hooks};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:8080/api/ws/agents".to_owned());

    let config = Config::builder()
        .liveness_interval(Duration::from_secs(10))
        .retry_delay(RetryDelay::Exponential(ExponentialDelay::default()))
        .max_retry_attempts(5)
        .build();

    let hooks = Hooks::new()
        .on_open(|| info!("Open"))
        .on_message(|text| info!(%text, "Message"))
        .on_close(|event| info!(code = event.code, was_clean = event.was_clean, "Close"))
        .on_error(|e| warn!(error = %e, "Error"));

    let channel = ChannelManager::connect(&endpoint, config, hooks)?;
    let mut state_rx = channel.state_receiver();

    while state_rx.changed().await.is_ok() {
        let state = *state_rx.borrow_and_update();
        info!(?state, "State changed");

        if state.is_terminal() {
            break;
        }
    }

    channel.close();
    Ok(())
}
