use serde::{Deserialize, Serialize};

use crate::types::{Cents, OrderScope, OrderType};

/// How contracts are grouped into a per-agent aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKeyMode {
    #[default]
    Agent,
    AgentProvider,
}

/// Which sequence number message templates show for an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceDisplay {
    #[default]
    Global,
    Personal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum LuckyMode {
    /// Fires when the contract id ends with the lucky digit.
    LastDigit {
        #[serde(with = "crate::serde_yuan")]
        amount_threshold: Cents,
        high_reward: String,
        low_reward: String,
    },
    /// Fires on every `number`-th qualifying order of an agent.
    PersonalSequence { reward: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuckyNumberRule {
    pub number: u32,
    #[serde(flatten)]
    pub mode: LuckyMode,
    #[serde(default)]
    pub order_scope: OrderScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TierMetric {
    #[default]
    Performance,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTier {
    #[serde(with = "crate::serde_yuan")]
    pub threshold: Cents,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLadder {
    #[serde(default)]
    pub min_contract_count: u64,
    #[serde(default)]
    pub metric: TierMetric,
    #[serde(default)]
    pub order_scope: OrderScope,
    /// Sorted by ascending threshold once the activity is validated.
    pub ladder: Vec<RewardTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CapPolicy {
    #[serde(default, with = "crate::serde_yuan::option")]
    pub contract_cap: Option<Cents>,
    #[serde(default, with = "crate::serde_yuan::option")]
    pub self_referral_contract_cap: Option<Cents>,
    #[serde(default, with = "crate::serde_yuan::option")]
    pub project_cap: Option<Cents>,
    #[serde(default, with = "crate::serde_yuan::option")]
    pub self_referral_project_cap: Option<Cents>,
}

impl CapPolicy {
    pub fn contract_cap_for(&self, order_type: OrderType) -> Option<Cents> {
        match order_type {
            OrderType::Platform => self.contract_cap,
            OrderType::SelfReferred => self.self_referral_contract_cap.or(self.contract_cap),
        }
    }

    pub fn project_cap_for(&self, order_type: OrderType) -> Option<Cents> {
        match order_type {
            OrderType::Platform => self.project_cap,
            OrderType::SelfReferred => self.self_referral_project_cap.or(self.project_cap),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DedupKeyField {
    #[default]
    ProjectAddress,
    ProjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SelfReferralRule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub reward: String,
    #[serde(default)]
    pub dedup_key: DedupKeyField,
}

/// Message decoration switches. The engine copies them into notifications untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BadgeToggles {
    #[serde(default)]
    pub show_tier_badge: bool,
    #[serde(default)]
    pub show_lucky_badge: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Filled from the registry key when omitted.
    #[serde(default)]
    pub activity_code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub agent_key: AgentKeyMode,
    #[serde(default)]
    pub sequence_display: SequenceDisplay,
    #[serde(default)]
    pub lucky: Option<LuckyNumberRule>,
    #[serde(default)]
    pub tiers: Option<TierLadder>,
    #[serde(default)]
    pub caps: CapPolicy,
    #[serde(default)]
    pub self_referral: SelfReferralRule,
    #[serde(default)]
    pub badges: BadgeToggles,
}
