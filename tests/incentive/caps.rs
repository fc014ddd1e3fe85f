use incentive::{
    activity::CapPolicy,
    caps::{CapAllocator, remaining_quota},
    contract::ContractEvent,
    store::{AggregateStore, MemoryAggregateStore},
};

use crate::{activity, historical, in_project, platform, run_batch, self_referred, yuan};

fn event(contract: serde_json::Value) -> ContractEvent {
    ContractEvent::from_value(&contract).expect("contract should normalize")
}

fn policy() -> CapPolicy {
    CapPolicy {
        contract_cap: Some(yuan(50_000)),
        project_cap: Some(yuan(50_000)),
        ..CapPolicy::default()
    }
}

#[test]
fn given_partly_consumed_project_when_allocating_then_project_quota_wins() {
    let policy = policy();
    let allocation = CapAllocator::new(&policy)
        .allocate(
            &event(in_project(platform("C-1", "a", 30_000), "P-1")),
            yuan(40_000),
        )
        .expect("allocation should succeed");

    assert_eq!(allocation.performance_amount, yuan(10_000));
    assert_eq!(allocation.contract_capped, yuan(30_000));
    assert_eq!(allocation.project_capped, Some(yuan(10_000)));
    let charge = allocation.project_charge.expect("project charge");
    assert_eq!(charge.consumed_before, yuan(40_000));
    assert_eq!(charge.charged, yuan(30_000));
    assert_eq!(charge.consumed_after, yuan(70_000));
}

#[test]
fn given_standalone_contract_when_allocating_then_contract_cap_applies() {
    let policy = policy();
    let allocation = CapAllocator::new(&policy)
        .allocate(&event(platform("C-2", "a", 80_000)), yuan(99_000))
        .expect("allocation should succeed");

    assert_eq!(allocation.performance_amount, yuan(50_000));
    assert_eq!(allocation.project_capped, None);
    assert!(allocation.project_charge.is_none());
}

#[test]
fn exhausted_project_yields_zero_performance() {
    let policy = policy();
    let allocation = CapAllocator::new(&policy)
        .allocate(
            &event(in_project(platform("C-3", "a", 5_000), "P-1")),
            yuan(60_000),
        )
        .expect("allocation should succeed");

    assert_eq!(allocation.performance_amount, 0);
    assert_eq!(remaining_quota(yuan(50_000), yuan(60_000)), 0);
}

#[test]
fn self_referred_orders_use_their_own_caps_or_fall_back() {
    let fallback = policy();
    let allocation = CapAllocator::new(&fallback)
        .allocate(&event(self_referred("S-1", "a", 70_000, "Room 1")), 0)
        .expect("allocation should succeed");
    assert_eq!(allocation.performance_amount, yuan(50_000));

    let dedicated = CapPolicy {
        self_referral_contract_cap: Some(yuan(20_000)),
        ..policy()
    };
    let allocation = CapAllocator::new(&dedicated)
        .allocate(&event(self_referred("S-2", "a", 70_000, "Room 2")), 0)
        .expect("allocation should succeed");
    assert_eq!(allocation.performance_amount, yuan(20_000));
}

#[test]
fn project_consumption_tracks_raw_amounts_across_a_batch() {
    let mut campaign = activity("CAPS");
    campaign.caps = CapPolicy {
        project_cap: Some(yuan(50_000)),
        ..CapPolicy::default()
    };
    let mut store = MemoryAggregateStore::new();

    let report = run_batch(
        &campaign,
        &mut store,
        &[
            in_project(platform("C-1", "a", 30_000), "P-1"),
            in_project(platform("C-2", "b", 30_000), "P-1"),
            in_project(platform("C-3", "c", 30_000), "P-1"),
        ],
    );

    let performance: Vec<_> = report
        .records
        .iter()
        .map(|record| record.performance_amount)
        .collect();
    assert_eq!(performance, vec![yuan(30_000), yuan(20_000), 0]);
    assert_eq!(
        store
            .project_consumption("CAPS", "P-1")
            .expect("consumption should read"),
        yuan(90_000)
    );
    assert_eq!(
        store
            .aggregate("CAPS", "c")
            .expect("aggregate should read")
            .raw_amount,
        yuan(30_000)
    );
}

#[test]
fn given_historical_contract_in_capped_project_when_processed_then_it_consumes_project_quota() {
    let mut campaign = activity("CAPS-HIST");
    campaign.caps = CapPolicy {
        contract_cap: Some(yuan(50_000)),
        project_cap: Some(yuan(100_000)),
        ..CapPolicy::default()
    };
    let mut store = MemoryAggregateStore::new();

    let report = run_batch(
        &campaign,
        &mut store,
        &[
            historical(in_project(platform("H-1", "a", 80_000), "P-1")),
            in_project(platform("C-1", "b", 30_000), "P-1"),
        ],
    );

    let old = &report.records[0];
    assert_eq!(old.performance_amount, yuan(50_000));
    let charge = old.project_charge.as_ref().expect("historical contract is charged");
    assert_eq!(charge.charged, yuan(80_000));
    assert_eq!(charge.consumed_after, yuan(80_000));

    let fresh = &report.records[1];
    assert_eq!(fresh.performance_amount, yuan(20_000));
    assert_eq!(
        fresh.project_charge.as_ref().map(|charge| charge.consumed_before),
        Some(yuan(80_000))
    );
    assert_eq!(
        store
            .project_consumption("CAPS-HIST", "P-1")
            .expect("consumption should read"),
        yuan(110_000)
    );
}
