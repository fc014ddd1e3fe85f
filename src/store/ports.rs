use crate::{
    error::IncentiveError,
    record::EnrichedRecord,
    store::types::AgentAggregate,
    types::Cents,
};

/// Durable incentive state. Every operation is partitioned by activity code and reads
/// reflect all prior `save` calls of the same activity.
pub trait AggregateStore {
    fn exists(&self, activity: &str, contract_id: &str) -> Result<bool, IncentiveError>;

    /// Zero-valued aggregate for agents without contracts.
    fn aggregate(&self, activity: &str, agent_key: &str) -> Result<AgentAggregate, IncentiveError>;

    /// Running project total, charged with the raw amount of every saved contract.
    fn project_consumption(&self, activity: &str, project_id: &str)
    -> Result<Cents, IncentiveError>;

    /// Number of non-historical contracts saved so far.
    fn contract_sequence(&self, activity: &str) -> Result<u64, IncentiveError>;

    fn save(&mut self, record: &EnrichedRecord) -> Result<(), IncentiveError>;

    fn records(&self, activity: &str) -> Result<Vec<EnrichedRecord>, IncentiveError>;
}
