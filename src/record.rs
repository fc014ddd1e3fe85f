use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    activity::{ActivityConfig, SequenceDisplay},
    caps::{CapAllocation, ProjectCharge},
    contract::ContractEvent,
    rewards::{NextRewardGap, RewardAssignment, RewardOutcome},
    store::AgentAggregate,
    types::{ActivityCode, AgentKey, Cents, format_yuan},
};

pub const HISTORICAL_REMARK: &str = "historical contract: performance only";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record_id: String,
    pub activity_code: ActivityCode,
    pub agent_key: AgentKey,
    pub contract: ContractEvent,
    /// Agent aggregate as of this contract. Historical records carry the prior aggregate.
    pub aggregate: AgentAggregate,
    pub performance_amount: Cents,
    #[serde(default)]
    pub project_charge: Option<ProjectCharge>,
    #[serde(default)]
    pub rewards: Vec<RewardAssignment>,
    pub global_sequence: u64,
    pub personal_sequence: u64,
    pub sequence_display: SequenceDisplay,
    #[serde(default)]
    pub next_reward: Option<NextRewardGap>,
    pub remark: String,
}

impl EnrichedRecord {
    pub fn display_sequence(&self) -> u64 {
        match self.sequence_display {
            SequenceDisplay::Global => self.global_sequence,
            SequenceDisplay::Personal => self.personal_sequence,
        }
    }

    pub fn reward_names(&self) -> Vec<&str> {
        self.rewards.iter().map(|reward| reward.name.as_str()).collect()
    }
}

pub struct RecordInput {
    pub event: ContractEvent,
    pub agent_key: AgentKey,
    pub aggregate: AgentAggregate,
    pub allocation: CapAllocation,
    pub outcome: RewardOutcome,
    /// Global position of this contract; ignored for historical contracts.
    pub global_sequence: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordBuilder<'a> {
    activity: &'a ActivityConfig,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(activity: &'a ActivityConfig) -> Self {
        Self { activity }
    }

    pub fn build(&self, input: RecordInput) -> EnrichedRecord {
        let RecordInput {
            event,
            agent_key,
            aggregate,
            allocation,
            outcome,
            global_sequence,
        } = input;

        let (global_sequence, personal_sequence, remark) = if event.historical {
            (0, 0, HISTORICAL_REMARK.to_string())
        } else {
            (
                global_sequence,
                aggregate.contract_count,
                compose_remark(&outcome.rewards, outcome.next_reward.as_ref()),
            )
        };

        EnrichedRecord {
            record_id: derive_record_id(&self.activity.activity_code, &event.contract_id),
            activity_code: self.activity.activity_code.clone(),
            agent_key,
            contract: event,
            aggregate,
            performance_amount: allocation.performance_amount,
            project_charge: allocation.project_charge,
            rewards: outcome.rewards,
            global_sequence,
            personal_sequence,
            sequence_display: self.activity.sequence_display,
            next_reward: outcome.next_reward,
            remark,
        }
    }
}

pub fn compose_remark(rewards: &[RewardAssignment], next: Option<&NextRewardGap>) -> String {
    let mut parts = Vec::new();
    if !rewards.is_empty() {
        let names: Vec<&str> = rewards.iter().map(|reward| reward.name.as_str()).collect();
        parts.push(format!("granted {}", names.join(", ")));
    }
    match next {
        Some(NextRewardGap::Contracts { missing }) => parts.push(format!(
            "{missing} more contract{} to unlock tiered rewards",
            if *missing == 1 { "" } else { "s" }
        )),
        Some(NextRewardGap::Amount { missing, tier }) => {
            parts.push(format!("{} more to reach {tier}", format_yuan(*missing)))
        }
        Some(NextRewardGap::LadderComplete) => parts.push("all reward tiers reached".to_string()),
        None => {}
    }
    parts.join("; ")
}

fn derive_record_id(activity_code: &str, contract_id: &str) -> String {
    let canonical = serde_json::json!({
        "activity_code": activity_code,
        "contract_id": contract_id,
    });
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex = format!("{:x}", digest);
    format!("rec:{}", &hex[..24])
}
