use serde::{Deserialize, Serialize};

use crate::{
    contract::ContractEvent,
    store::AgentAggregate,
    types::{AwardKey, Cents},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardCategory {
    LuckyNumber,
    Tiered,
    SelfReferral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAssignment {
    pub category: RewardCategory,
    pub name: String,
    /// Identity used for the at-most-once check against the awarded set.
    pub award_key: AwardKey,
    #[serde(default)]
    pub note: Option<String>,
}

/// Distance from the agent's current standing to the next tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextRewardGap {
    Contracts { missing: u64 },
    Amount { missing: Cents, tier: String },
    LadderComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardOutcome {
    pub rewards: Vec<RewardAssignment>,
    #[serde(default)]
    pub next_reward: Option<NextRewardGap>,
}

/// Input of every rule: the contract and the agent aggregate that already includes it.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub event: &'a ContractEvent,
    pub aggregate: &'a AgentAggregate,
}

pub fn tier_award_key(name: &str) -> AwardKey {
    format!("tier:{name}")
}

pub fn lucky_contract_award_key(contract_id: &str) -> AwardKey {
    format!("lucky:contract:{contract_id}")
}

pub fn lucky_sequence_award_key(ordinal: u64) -> AwardKey {
    format!("lucky:seq:{ordinal}")
}

pub fn self_referral_award_key(dedup_key: &str) -> AwardKey {
    format!("self_referral:{dedup_key}")
}
