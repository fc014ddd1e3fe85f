mod caps;
mod pipeline;
mod rewards;

use std::sync::Arc;

use incentive::{
    activity::{
        ActivityConfig, AgentKeyMode, BadgeToggles, CapPolicy, LuckyMode, LuckyNumberRule,
        RewardTier, SelfReferralRule, SequenceDisplay, TierLadder, TierMetric, validate_activity,
    },
    pipeline::{BatchReport, IncentivePipeline},
    store::AggregateStore,
    types::{Cents, OrderScope},
};
use serde_json::{Value, json};

pub fn yuan(amount: i64) -> Cents {
    amount * 100
}

pub fn activity(code: &str) -> ActivityConfig {
    ActivityConfig {
        activity_code: code.to_string(),
        title: format!("{code} sprint"),
        agent_key: AgentKeyMode::Agent,
        sequence_display: SequenceDisplay::Global,
        lucky: None,
        tiers: None,
        caps: CapPolicy::default(),
        self_referral: SelfReferralRule::default(),
        badges: BadgeToggles::default(),
    }
}

pub fn personal_sequence(number: u32, scope: OrderScope) -> LuckyNumberRule {
    LuckyNumberRule {
        number,
        mode: LuckyMode::PersonalSequence {
            reward: "lucky gift".to_string(),
        },
        order_scope: scope,
    }
}

/// bronze 10k, silver 20k, gold 30k, platinum 50k
pub fn ladder(min_contract_count: u64) -> TierLadder {
    TierLadder {
        min_contract_count,
        metric: TierMetric::Performance,
        order_scope: OrderScope::All,
        ladder: [
            (50_000, "platinum"),
            (10_000, "bronze"),
            (30_000, "gold"),
            (20_000, "silver"),
        ]
        .into_iter()
        .map(|(threshold, name)| RewardTier {
            threshold: yuan(threshold),
            name: name.to_string(),
        })
        .collect(),
    }
}

pub fn self_referral_rule() -> SelfReferralRule {
    SelfReferralRule {
        enabled: true,
        reward: "referral bonus".to_string(),
        ..SelfReferralRule::default()
    }
}

pub fn platform(contract_id: &str, agent_id: &str, amount: i64) -> Value {
    json!({
        "contract_id": contract_id,
        "agent_id": agent_id,
        "agent_name": format!("housekeeper {agent_id}"),
        "raw_amount": amount,
        "paid_amount": amount,
        "order_type": "platform",
    })
}

pub fn self_referred(contract_id: &str, agent_id: &str, amount: i64, address: &str) -> Value {
    let mut contract = platform(contract_id, agent_id, amount);
    contract["order_type"] = json!("self_referred");
    contract["project_address"] = json!(address);
    contract
}

pub fn in_project(mut contract: Value, project_id: &str) -> Value {
    contract["project_id"] = json!(project_id);
    contract
}

pub fn historical(mut contract: Value) -> Value {
    contract["historical"] = json!(true);
    contract
}

pub fn run_batch<S: AggregateStore + ?Sized>(
    activity: &ActivityConfig,
    store: &mut S,
    contracts: &[Value],
) -> BatchReport {
    let activity = validate_activity(activity.clone()).expect("activity should validate");
    IncentivePipeline::with_activity(Arc::new(activity), store)
        .run(contracts)
        .expect("batch should run")
}
