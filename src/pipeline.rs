use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    activity::{ActivityConfig, ActivityRegistry},
    caps::CapAllocator,
    contract::ContractEvent,
    error::IncentiveError,
    record::{EnrichedRecord, RecordBuilder, RecordInput},
    rewards::{RewardCalculator, RewardOutcome},
    store::AggregateStore,
    types::{AgentKey, AwardKey, ContractId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DuplicateContract,
    RepeatSelfReferral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedContract {
    pub index: usize,
    pub contract_id: ContractId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFailure {
    pub index: usize,
    #[serde(default)]
    pub contract_id: Option<ContractId>,
    pub error: IncentiveError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: String,
    pub activity_code: String,
    pub records: Vec<EnrichedRecord>,
    pub skipped: Vec<SkippedContract>,
    pub failures: Vec<ContractFailure>,
}

impl BatchReport {
    pub fn processed_count(&self) -> usize {
        self.records.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn errored_count(&self) -> usize {
        self.failures.len()
    }

    pub fn granted_reward_count(&self) -> usize {
        self.records.iter().map(|record| record.rewards.len()).sum()
    }
}

#[derive(Debug)]
enum ContractOutcome {
    Processed(EnrichedRecord),
    Skipped(ContractId, SkipReason),
}

/// State that lives for one batch only.
#[derive(Debug, Default)]
struct BatchState {
    global_sequence: u64,
    award_cache: BTreeMap<AgentKey, BTreeSet<AwardKey>>,
}

/// Runs contract batches of one activity against a store. Holding the store mutably for
/// the pipeline's lifetime keeps a single writer per process.
pub struct IncentivePipeline<'s, S: AggregateStore + ?Sized> {
    activity: Arc<ActivityConfig>,
    calculator: RewardCalculator,
    store: &'s mut S,
}

impl<'s, S: AggregateStore + ?Sized> IncentivePipeline<'s, S> {
    /// Fails before touching the store if the activity code is unknown.
    pub fn new(
        registry: &ActivityRegistry,
        activity_code: &str,
        store: &'s mut S,
    ) -> Result<Self, IncentiveError> {
        let activity = registry.resolve(activity_code)?;
        Ok(Self::with_activity(activity, store))
    }

    /// `activity` must already be validated, see [`crate::activity::validate_activity`].
    pub fn with_activity(activity: Arc<ActivityConfig>, store: &'s mut S) -> Self {
        let calculator = RewardCalculator::new(&activity);
        Self {
            activity,
            calculator,
            store,
        }
    }

    pub fn activity(&self) -> &ActivityConfig {
        &self.activity
    }

    pub fn store(&self) -> &S {
        &*self.store
    }

    #[tracing::instrument(
        name = "pipeline_run",
        target = "pipeline",
        skip(self, contracts),
        fields(activity_code = %self.activity.activity_code, contracts = contracts.len())
    )]
    pub fn run(&mut self, contracts: &[Value]) -> Result<BatchReport, IncentiveError> {
        let run_id = Uuid::now_v7().to_string();
        let mut state = BatchState {
            global_sequence: self
                .store
                .contract_sequence(&self.activity.activity_code)?,
            award_cache: BTreeMap::new(),
        };
        let mut report = BatchReport {
            run_id,
            activity_code: self.activity.activity_code.clone(),
            records: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        };

        for (index, value) in contracts.iter().enumerate() {
            match self.process_contract(&mut state, value) {
                Ok(ContractOutcome::Processed(record)) => {
                    tracing::debug!(
                        target: "pipeline",
                        index = index,
                        contract_id = %record.contract.contract_id,
                        agent_key = %record.agent_key,
                        performance_amount = record.performance_amount,
                        rewards = record.rewards.len(),
                        global_sequence = record.global_sequence,
                        "contract_processed"
                    );
                    report.records.push(record);
                }
                Ok(ContractOutcome::Skipped(contract_id, reason)) => {
                    tracing::debug!(
                        target: "pipeline",
                        index = index,
                        contract_id = %contract_id,
                        reason = ?reason,
                        "contract_skipped"
                    );
                    report.skipped.push(SkippedContract {
                        index,
                        contract_id,
                        reason,
                    });
                }
                Err(error) => {
                    let contract_id = value
                        .get("contract_id")
                        .and_then(|id| match id {
                            Value::String(text) => Some(text.clone()),
                            Value::Number(number) => Some(number.to_string()),
                            _ => None,
                        });
                    tracing::warn!(
                        target: "pipeline",
                        index = index,
                        contract_id = ?contract_id,
                        error_kind = ?error.kind,
                        error = %error,
                        "contract_failed"
                    );
                    report.failures.push(ContractFailure {
                        index,
                        contract_id,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            target: "pipeline",
            run_id = %report.run_id,
            activity_code = %report.activity_code,
            processed = report.processed_count(),
            skipped = report.skipped_count(),
            errored = report.errored_count(),
            rewards = report.granted_reward_count(),
            "batch_completed"
        );
        Ok(report)
    }

    #[tracing::instrument(
        name = "process_contract",
        target = "pipeline",
        level = "debug",
        skip_all
    )]
    fn process_contract(
        &mut self,
        state: &mut BatchState,
        value: &Value,
    ) -> Result<ContractOutcome, IncentiveError> {
        let event = ContractEvent::from_value(value)?;
        let activity_code = self.activity.activity_code.as_str();

        if self.store.exists(activity_code, &event.contract_id)? {
            return Ok(ContractOutcome::Skipped(
                event.contract_id,
                SkipReason::DuplicateContract,
            ));
        }

        let agent_key = event.agent_key(self.activity.agent_key)?;
        let durable = self.store.aggregate(activity_code, &agent_key)?;
        let prior = match state.award_cache.get(&agent_key) {
            Some(cached) => durable.with_awards(cached),
            None => durable,
        };

        let consumed_before = match event.project_id.as_deref() {
            Some(project_id) => self.store.project_consumption(activity_code, project_id)?,
            None => 0,
        };
        let allocation = CapAllocator::new(&self.activity.caps).allocate(&event, consumed_before)?;

        let (aggregate, outcome, global_sequence) = if event.historical {
            (prior, RewardOutcome::default(), 0)
        } else {
            let mut working = prior;
            if let Some(dedup_key) = self
                .calculator
                .self_referral()
                .and_then(|rule| rule.dedup_key(&event))
            {
                if working.self_referral_keys.contains(dedup_key) {
                    return Ok(ContractOutcome::Skipped(
                        event.contract_id,
                        SkipReason::RepeatSelfReferral,
                    ));
                }
                working = working.with_self_referral_key(dedup_key);
            }

            let updated = working.including(&event, allocation.performance_amount)?;
            let outcome = self.calculator.evaluate(&event, &updated);
            let aggregate =
                updated.with_awards(outcome.rewards.iter().map(|reward| &reward.award_key));
            (aggregate, outcome, state.global_sequence + 1)
        };

        let staged: Vec<AwardKey> = outcome
            .rewards
            .iter()
            .map(|reward| reward.award_key.clone())
            .collect();
        let historical = event.historical;

        let record = RecordBuilder::new(&self.activity).build(RecordInput {
            event,
            agent_key,
            aggregate,
            allocation,
            outcome,
            global_sequence,
        });
        self.store.save(&record)?;

        if !staged.is_empty() {
            state
                .award_cache
                .entry(record.agent_key.clone())
                .or_default()
                .extend(staged);
        }
        if !historical {
            state.global_sequence += 1;
        }
        Ok(ContractOutcome::Processed(record))
    }
}
