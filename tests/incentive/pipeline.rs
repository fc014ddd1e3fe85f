use incentive::{
    activity::{ActivityRegistry, AgentKeyMode, SequenceDisplay},
    error::{IncentiveError, IncentiveErrorKind, store_error},
    pipeline::{IncentivePipeline, SkipReason},
    record::EnrichedRecord,
    store::{AgentAggregate, AggregateStore, MemoryAggregateStore},
    types::{Cents, OrderScope},
};
use serde_json::json;

use crate::{
    activity, ladder, personal_sequence, platform, run_batch, self_referral_rule, self_referred,
    yuan,
};

/// Fails `save` for one contract id and delegates everything else.
struct FailingStore {
    inner: MemoryAggregateStore,
    fail_on: &'static str,
}

impl AggregateStore for FailingStore {
    fn exists(&self, activity: &str, contract_id: &str) -> Result<bool, IncentiveError> {
        self.inner.exists(activity, contract_id)
    }

    fn aggregate(&self, activity: &str, agent_key: &str) -> Result<AgentAggregate, IncentiveError> {
        self.inner.aggregate(activity, agent_key)
    }

    fn project_consumption(
        &self,
        activity: &str,
        project_id: &str,
    ) -> Result<Cents, IncentiveError> {
        self.inner.project_consumption(activity, project_id)
    }

    fn contract_sequence(&self, activity: &str) -> Result<u64, IncentiveError> {
        self.inner.contract_sequence(activity)
    }

    fn save(&mut self, record: &EnrichedRecord) -> Result<(), IncentiveError> {
        if record.contract.contract_id == self.fail_on {
            return Err(store_error("disk full"));
        }
        self.inner.save(record)
    }

    fn records(&self, activity: &str) -> Result<Vec<EnrichedRecord>, IncentiveError> {
        self.inner.records(activity)
    }
}

/// Serves aggregates from a snapshot taken before the batch, like a lagging replica.
struct LaggingStore {
    inner: MemoryAggregateStore,
    snapshot: MemoryAggregateStore,
}

impl AggregateStore for LaggingStore {
    fn exists(&self, activity: &str, contract_id: &str) -> Result<bool, IncentiveError> {
        self.inner.exists(activity, contract_id)
    }

    fn aggregate(&self, activity: &str, agent_key: &str) -> Result<AgentAggregate, IncentiveError> {
        self.snapshot.aggregate(activity, agent_key)
    }

    fn project_consumption(
        &self,
        activity: &str,
        project_id: &str,
    ) -> Result<Cents, IncentiveError> {
        self.inner.project_consumption(activity, project_id)
    }

    fn contract_sequence(&self, activity: &str) -> Result<u64, IncentiveError> {
        self.inner.contract_sequence(activity)
    }

    fn save(&mut self, record: &EnrichedRecord) -> Result<(), IncentiveError> {
        self.inner.save(record)
    }

    fn records(&self, activity: &str) -> Result<Vec<EnrichedRecord>, IncentiveError> {
        self.inner.records(activity)
    }
}

#[test]
fn given_same_batch_twice_when_rerun_then_every_contract_is_skipped() {
    let mut campaign = activity("RERUN");
    campaign.tiers = Some(ladder(0));
    let mut store = MemoryAggregateStore::new();
    let contracts = [platform("C-1", "a", 12_000), platform("C-2", "b", 3_000)];

    let first = run_batch(&campaign, &mut store, &contracts);
    let before = store.aggregate("RERUN", "a").expect("aggregate should read");
    let second = run_batch(&campaign, &mut store, &contracts);

    assert_eq!(first.processed_count(), 2);
    assert_eq!(second.processed_count(), 0);
    assert_eq!(second.skipped_count(), 2);
    assert!(
        second
            .skipped
            .iter()
            .all(|skipped| skipped.reason == SkipReason::DuplicateContract)
    );
    assert_eq!(
        store.aggregate("RERUN", "a").expect("aggregate should read"),
        before
    );
    assert_eq!(store.contract_sequence("RERUN").expect("sequence"), 2);
}

#[test]
fn tiers_are_granted_at_most_once_across_runs() {
    let mut campaign = activity("ONCE");
    campaign.tiers = Some(ladder(0));
    let mut store = MemoryAggregateStore::new();

    let first = run_batch(&campaign, &mut store, &[platform("C-1", "a", 12_000)]);
    let second = run_batch(&campaign, &mut store, &[platform("C-2", "a", 1_000)]);

    assert_eq!(first.records[0].reward_names(), vec!["bronze"]);
    assert!(second.records[0].rewards.is_empty());
    let aggregate = store.aggregate("ONCE", "a").expect("aggregate should read");
    assert_eq!(aggregate.awarded.len(), 1);
    assert!(aggregate.has_award("tier:bronze"));
}

#[test]
fn given_lagging_aggregate_reads_when_batch_runs_then_award_cache_prevents_regrant() {
    let mut campaign = activity("CACHE");
    campaign.tiers = Some(ladder(0));
    let mut store = LaggingStore {
        inner: MemoryAggregateStore::new(),
        snapshot: MemoryAggregateStore::new(),
    };

    let report = run_batch(
        &campaign,
        &mut store,
        &[platform("C-1", "a", 12_000), platform("C-2", "a", 15_000)],
    );

    assert_eq!(report.records[0].reward_names(), vec!["bronze"]);
    assert!(report.records[1].rewards.is_empty());
}

#[test]
fn given_shared_dedup_key_when_self_referred_twice_then_second_contract_is_excluded() {
    let mut campaign = activity("SELF");
    campaign.self_referral = self_referral_rule();
    let mut store = MemoryAggregateStore::new();

    let report = run_batch(
        &campaign,
        &mut store,
        &[
            self_referred("S-1", "a", 8_000, "Room 301, Building 4"),
            self_referred("S-2", "a", 9_000, "Room 301, Building 4"),
            self_referred("S-3", "a", 2_000, "Room 502, Building 1"),
        ],
    );

    assert_eq!(report.granted_reward_count(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].contract_id, "S-2");
    assert_eq!(report.skipped[0].reason, SkipReason::RepeatSelfReferral);

    let aggregate = store.aggregate("SELF", "a").expect("aggregate should read");
    assert_eq!(aggregate.contract_count, 2);
    assert_eq!(aggregate.self_referred.raw_amount, yuan(10_000));
    assert!(!store.exists("SELF", "S-2").expect("exists should read"));
}

#[test]
fn invalid_contract_is_reported_and_the_batch_continues() {
    let campaign = activity("ERR");
    let mut store = MemoryAggregateStore::new();

    let report = run_batch(
        &campaign,
        &mut store,
        &[
            platform("C-1", "a", 1_000),
            json!({ "contract_id": "C-2", "raw_amount": 10, "paid_amount": 10, "order_type": "platform" }),
            json!({ "contract_id": "C-3", "agent_id": "a", "raw_amount": -5, "paid_amount": 0, "order_type": "platform" }),
            platform("C-4", "a", 1_000),
        ],
    );

    assert_eq!(report.processed_count(), 2);
    assert_eq!(report.errored_count(), 2);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].contract_id.as_deref(), Some("C-2"));
    assert_eq!(report.failures[0].error.kind, IncentiveErrorKind::InvalidContract);
    assert_eq!(report.records[1].global_sequence, 2);
}

#[test]
fn given_failed_save_when_batch_continues_then_nothing_of_that_contract_is_committed() {
    let mut campaign = activity("FAIL");
    campaign.lucky = Some(personal_sequence(2, OrderScope::All));
    let mut store = FailingStore {
        inner: MemoryAggregateStore::new(),
        fail_on: "C-2",
    };

    let report = run_batch(
        &campaign,
        &mut store,
        &[
            platform("C-1", "a", 1_000),
            platform("C-2", "a", 1_000),
            platform("C-3", "a", 1_000),
        ],
    );

    assert_eq!(report.processed_count(), 2);
    assert_eq!(report.failures[0].error.kind, IncentiveErrorKind::Store);
    assert_eq!(report.records[1].contract.contract_id, "C-3");
    assert_eq!(report.records[1].global_sequence, 2);
    assert_eq!(report.records[1].reward_names(), vec!["lucky gift"]);
    assert_eq!(
        store
            .aggregate("FAIL", "a")
            .expect("aggregate should read")
            .contract_count,
        2
    );
}

#[test]
fn unknown_activity_fails_before_any_contract_is_read() {
    let registry = ActivityRegistry::new([("KNOWN".to_string(), activity("KNOWN"))])
        .expect("registry should build");
    let mut store = MemoryAggregateStore::new();

    let Err(err) = IncentivePipeline::new(&registry, "MISSING", &mut store) else {
        panic!("unknown activity must be rejected");
    };
    assert_eq!(err.kind, IncentiveErrorKind::Configuration);
    assert!(err.message.contains("KNOWN"), "unexpected error: {err}");
    assert!(store.partitions().is_empty());
}

#[test]
fn global_and_personal_sequences_advance_independently() {
    let mut campaign = activity("SEQ");
    campaign.sequence_display = SequenceDisplay::Personal;
    let mut store = MemoryAggregateStore::new();

    let first = run_batch(
        &campaign,
        &mut store,
        &[
            platform("C-1", "a", 1_000),
            platform("C-2", "b", 1_000),
            platform("C-3", "a", 1_000),
        ],
    );
    let second = run_batch(&campaign, &mut store, &[platform("C-4", "b", 1_000)]);

    let global: Vec<u64> = first.records.iter().map(|r| r.global_sequence).collect();
    let personal: Vec<u64> = first.records.iter().map(|r| r.personal_sequence).collect();
    assert_eq!(global, vec![1, 2, 3]);
    assert_eq!(personal, vec![1, 1, 2]);
    assert_eq!(first.records[2].display_sequence(), 2);
    assert_eq!(second.records[0].global_sequence, 4);
    assert_eq!(second.records[0].personal_sequence, 2);
}

#[test]
fn agent_provider_mode_keeps_separate_aggregates_per_provider() {
    let mut campaign = activity("PROV");
    campaign.agent_key = AgentKeyMode::AgentProvider;
    let mut store = MemoryAggregateStore::new();

    let mut first = platform("C-1", "a", 1_000);
    first["provider_id"] = json!("p-1");
    let mut second = platform("C-2", "a", 2_000);
    second["provider_id"] = json!("p-2");
    let missing = platform("C-3", "a", 3_000);

    let report = run_batch(&campaign, &mut store, &[first, second, missing]);

    assert_eq!(report.records[0].agent_key, "a:p-1");
    assert_eq!(report.records[1].agent_key, "a:p-2");
    assert_eq!(report.failures[0].contract_id.as_deref(), Some("C-3"));
    assert_eq!(
        store.aggregate("PROV", "a:p-2").expect("aggregate").raw_amount,
        yuan(2_000)
    );
    assert_eq!(
        store.aggregate("PROV", "a").expect("aggregate"),
        AgentAggregate::default()
    );
}
