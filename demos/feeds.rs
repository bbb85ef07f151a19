//! Follows both game feeds until interrupted by the timeout.
//!
//! Keeps a running attack record for every attacker seen on the battles feed and logs each new
//! agent.
//!
//! Run with tracing enabled:
//! ```sh
//! ATH_API_URL=http://localhost:8080/api RUST_LOG=info,ath_realtime=debug cargo run --example feeds
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ath_realtime::API_URL_VAR;
use ath_realtime::feeds::{
    AgentCreated, AgentParser, BattleMessage, BattleParser, BattleStats, Feed, message_hook,
};
use ath_realtime::ws::config::Config;
use ath_realtime::ws::{ChannelManager, Hooks};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RUN_FOR: Duration = Duration::from_secs(120);

fn feed_hooks(feed: Feed) -> Hooks {
    Hooks::new()
        .on_open(move || info!(%feed, "Feed connected"))
        .on_close(move |event| {
            info!(%feed, code = event.code, reason = %event.reason, "Feed disconnected");
        })
        .on_error(move |e| warn!(%feed, error = %e, "Feed error"))
        .on_exhausted(move || warn!(%feed, "Feed gave up reconnecting"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let api_base =
        std::env::var(API_URL_VAR).unwrap_or_else(|_| "http://localhost:8080/api".to_owned());
    let config = Config::default();

    let agents_hooks = feed_hooks(Feed::Agents).on_message(message_hook(
        AgentParser,
        |agent: AgentCreated| {
            info!(
                id = agent.id,
                name = %agent.name,
                ticker = %agent.ticker,
                market_cap = %agent.market_cap,
                "New agent"
            );
        },
    ));

    let records: Arc<Mutex<HashMap<u64, BattleStats>>> = Arc::default();
    let battle_records = Arc::clone(&records);
    let battles_hooks = feed_hooks(Feed::Battles).on_message(message_hook(
        BattleParser,
        move |message: BattleMessage| {
            let Some(battle) = message.as_battle_result() else {
                info!(?message, "Ignoring battles feed message");
                return;
            };

            let Ok(mut records) = battle_records.lock() else {
                return;
            };
            let stats = records.entry(battle.attacker_id).or_default();
            stats.record(battle.attacker_id, battle);

            info!(
                id = battle.id,
                attacker = battle.attacker_id,
                defender = battle.defender_id,
                outcome = %battle.outcome,
                win_rate = %stats.win_rate().round_dp(1),
                "Battle resolved"
            );
        },
    ));

    let agents = ChannelManager::connect(
        Feed::Agents.endpoint(&api_base)?.as_str(),
        config.clone(),
        agents_hooks,
    )?;
    let battles = ChannelManager::connect(
        Feed::Battles.endpoint(&api_base)?.as_str(),
        config,
        battles_hooks,
    )?;

    tokio::time::sleep(RUN_FOR).await;

    agents.close();
    battles.close();

    if let Ok(records) = records.lock() {
        for (agent_id, stats) in records.iter() {
            info!(agent_id, wins = stats.wins, losses = stats.losses, "Final record");
        }
    }

    Ok(())
}
