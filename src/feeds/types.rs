use bon::Builder;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Agent record pushed on the agents feed whenever an agent is created.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct AgentCreated {
    pub id: u64,
    pub name: String,
    pub ticker: String,
    /// System prompt the agent battles with
    pub prompt: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    /// Address of the agent's token
    #[serde(default)]
    pub token_address: String,
    /// Server-local time, formatted `%Y-%m-%d %H:%M:%S`
    #[serde(with = "crate::serde_helpers::agent_timestamp")]
    pub created_at: NaiveDateTime,
    /// Token price times total supply at `market_cap_updated_at`
    pub market_cap: Decimal,
    #[serde(with = "crate::serde_helpers::agent_timestamp")]
    pub market_cap_updated_at: NaiveDateTime,
}

/// Envelope of every frame on the battles feed, `{"type": ..., "data": ...}`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawBattleMessage")]
pub enum BattleMessage {
    BattleResult(Battle),
    /// Any message type this client does not know about, with its raw `type`
    Unknown(String),
}

impl BattleMessage {
    /// Try to extract the battle result.
    #[must_use]
    pub fn as_battle_result(&self) -> Option<&Battle> {
        match self {
            Self::BattleResult(battle) => Some(battle),
            Self::Unknown(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct RawBattleMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl TryFrom<RawBattleMessage> for BattleMessage {
    type Error = serde_json::Error;

    fn try_from(raw: RawBattleMessage) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "BATTLE_RESULT" => Ok(Self::BattleResult(serde_json::from_value(raw.data)?)),
            _ => Ok(Self::Unknown(raw.kind)),
        }
    }
}

/// A resolved battle. The outcome is always from the attacker's point of view.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct Battle {
    pub id: u64,
    pub attacker_id: u64,
    pub defender_id: u64,
    pub created_at: DateTime<Utc>,
    pub outcome: Outcome,
    /// Narrative of the battle
    #[serde(default)]
    pub description: String,
}

impl Battle {
    /// The winning agent, if the outcome is known.
    #[must_use]
    pub fn winner_id(&self) -> Option<u64> {
        self.outcome.is_attacker_victory().map(|attacker_won| {
            if attacker_won {
                self.attacker_id
            } else {
                self.defender_id
            }
        })
    }

    #[must_use]
    pub fn involves(&self, agent_id: u64) -> bool {
        self.attacker_id == agent_id || self.defender_id == agent_id
    }
}

/// How a battle ended for the attacker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Outcome {
    TotalVictory,
    NarrowVictory,
    CrushingDefeat,
    NarrowDefeat,
    /// Unknown outcome from the server (captures the raw value for debugging).
    #[serde(untagged)]
    Unknown(String),
}

impl Outcome {
    /// `Some(true)` for victories, `Some(false)` for defeats, `None` when unknown.
    #[must_use]
    pub fn is_attacker_victory(&self) -> Option<bool> {
        match self {
            Self::TotalVictory | Self::NarrowVictory => Some(true),
            Self::CrushingDefeat | Self::NarrowDefeat => Some(false),
            Self::Unknown(_) => None,
        }
    }
}

/// Running attack record of one agent, updated from the battles feed.
///
/// Only battles the agent started count, matching the server's history endpoint.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BattleStats {
    pub wins: u32,
    pub losses: u32,
    pub total: u32,
}

impl BattleStats {
    /// Stats starting from a known record, e.g. one fetched over HTTP.
    #[must_use]
    pub fn new(wins: u32, losses: u32) -> Self {
        Self {
            wins,
            losses,
            total: wins.saturating_add(losses),
        }
    }

    /// Fold `battle` into the record if `agent_id` attacked. Returns whether it counted.
    ///
    /// Unknown outcomes count as losses.
    pub fn record(&mut self, agent_id: u64, battle: &Battle) -> bool {
        if battle.attacker_id != agent_id {
            return false;
        }

        if battle.outcome.is_attacker_victory() == Some(true) {
            self.wins = self.wins.saturating_add(1);
        } else {
            self.losses = self.losses.saturating_add(1);
        }
        self.total = self.total.saturating_add(1);
        true
    }

    /// Win rate in percent, zero before the first battle.
    #[must_use]
    pub fn win_rate(&self) -> Decimal {
        if self.total == 0 {
            return Decimal::ZERO;
        }

        Decimal::from(self.wins) * Decimal::ONE_HUNDRED / Decimal::from(self.total)
    }
}
