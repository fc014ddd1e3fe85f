use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::{IncentiveError, arithmetic_error, store_error},
    record::EnrichedRecord,
    store::{ports::AggregateStore, types::AgentAggregate},
    types::{ActivityCode, AgentKey, Cents, ContractId, ProjectId},
};

/// Everything stored for one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActivityPartition {
    pub contract_sequence: u64,
    #[serde(default)]
    pub contracts: BTreeSet<ContractId>,
    #[serde(default)]
    pub aggregates: BTreeMap<AgentKey, AgentAggregate>,
    #[serde(default)]
    pub projects: BTreeMap<ProjectId, Cents>,
    #[serde(default)]
    pub records: Vec<EnrichedRecord>,
}

impl ActivityPartition {
    fn apply(&mut self, record: &EnrichedRecord) -> Result<(), IncentiveError> {
        let contract_id = &record.contract.contract_id;
        if self.contracts.contains(contract_id) {
            return Err(store_error(format!(
                "contract '{}' is already recorded for activity '{}'",
                contract_id, record.activity_code
            )));
        }

        let mut next_sequence = self.contract_sequence;
        if !record.contract.historical {
            next_sequence = next_sequence
                .checked_add(1)
                .ok_or_else(|| arithmetic_error("contract sequence overflow"))?;
        }
        let next_project_total = match &record.project_charge {
            Some(charge) => {
                let used = self
                    .projects
                    .get(&charge.project_id)
                    .copied()
                    .unwrap_or_default();
                let total = used.checked_add(charge.charged).ok_or_else(|| {
                    arithmetic_error(format!(
                        "project '{}' consumption overflow",
                        charge.project_id
                    ))
                })?;
                Some((charge.project_id.clone(), total))
            }
            None => None,
        };

        self.contract_sequence = next_sequence;
        if !record.contract.historical {
            self.aggregates
                .insert(record.agent_key.clone(), record.aggregate.clone());
        }
        if let Some((project_id, total)) = next_project_total {
            self.projects.insert(project_id, total);
        }
        self.contracts.insert(contract_id.clone());
        self.records.push(record.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAggregateStore {
    activities: BTreeMap<ActivityCode, ActivityPartition>,
}

impl MemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_partitions(activities: BTreeMap<ActivityCode, ActivityPartition>) -> Self {
        Self { activities }
    }

    pub fn partitions(&self) -> &BTreeMap<ActivityCode, ActivityPartition> {
        &self.activities
    }
}

impl AggregateStore for MemoryAggregateStore {
    fn exists(&self, activity: &str, contract_id: &str) -> Result<bool, IncentiveError> {
        Ok(self
            .activities
            .get(activity)
            .is_some_and(|partition| partition.contracts.contains(contract_id)))
    }

    fn aggregate(&self, activity: &str, agent_key: &str) -> Result<AgentAggregate, IncentiveError> {
        Ok(self
            .activities
            .get(activity)
            .and_then(|partition| partition.aggregates.get(agent_key))
            .cloned()
            .unwrap_or_default())
    }

    fn project_consumption(
        &self,
        activity: &str,
        project_id: &str,
    ) -> Result<Cents, IncentiveError> {
        Ok(self
            .activities
            .get(activity)
            .and_then(|partition| partition.projects.get(project_id))
            .copied()
            .unwrap_or_default())
    }

    fn contract_sequence(&self, activity: &str) -> Result<u64, IncentiveError> {
        Ok(self
            .activities
            .get(activity)
            .map(|partition| partition.contract_sequence)
            .unwrap_or_default())
    }

    fn save(&mut self, record: &EnrichedRecord) -> Result<(), IncentiveError> {
        self.activities
            .entry(record.activity_code.clone())
            .or_default()
            .apply(record)
    }

    fn records(&self, activity: &str) -> Result<Vec<EnrichedRecord>, IncentiveError> {
        Ok(self
            .activities
            .get(activity)
            .map(|partition| partition.records.clone())
            .unwrap_or_default())
    }
}
