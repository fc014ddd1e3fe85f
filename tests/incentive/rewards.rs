use incentive::{
    activity::{LuckyMode, LuckyNumberRule},
    record::HISTORICAL_REMARK,
    rewards::{NextRewardGap, RewardCategory, TierScanner},
    store::{AgentAggregate, AggregateStore, MemoryAggregateStore},
    types::OrderScope,
};

use crate::{
    activity, historical, ladder, personal_sequence, platform, run_batch, self_referred, yuan,
};

#[test]
fn personal_sequence_fires_on_every_fifth_order_only() {
    let mut campaign = activity("SEQ");
    campaign.lucky = Some(personal_sequence(5, OrderScope::All));
    let contracts: Vec<_> = (1..=10)
        .map(|n| platform(&format!("C-{n}"), "a", 1_000))
        .collect();

    let report = run_batch(&campaign, &mut MemoryAggregateStore::new(), &contracts);

    let rewarded: Vec<u64> = report
        .records
        .iter()
        .filter(|record| !record.rewards.is_empty())
        .map(|record| record.personal_sequence)
        .collect();
    assert_eq!(rewarded, vec![5, 10]);
    assert!(report.records.iter().all(|record| record.rewards.len() <= 1));
    assert_eq!(report.records[4].rewards[0].category, RewardCategory::LuckyNumber);
}

#[test]
fn given_platform_only_sequence_when_self_referred_orders_arrive_then_they_never_count() {
    let mut campaign = activity("SEQ-P");
    campaign.lucky = Some(personal_sequence(5, OrderScope::Platform));
    let mut contracts = vec![self_referred("S-0", "a", 1_000, "Room 0")];
    contracts.extend((1..=4).map(|n| platform(&format!("C-{n}"), "a", 1_000)));
    contracts.push(self_referred("S-5", "a", 1_000, "Room 5"));
    contracts.push(platform("C-5", "a", 1_000));

    let report = run_batch(&campaign, &mut MemoryAggregateStore::new(), &contracts);

    let rewarded: Vec<&str> = report
        .records
        .iter()
        .filter(|record| !record.rewards.is_empty())
        .map(|record| record.contract.contract_id.as_str())
        .collect();
    assert_eq!(rewarded, vec!["C-5"]);
}

#[test]
fn last_digit_picks_reward_by_amount_threshold() {
    let mut campaign = activity("DIGIT");
    campaign.lucky = Some(LuckyNumberRule {
        number: 8,
        mode: LuckyMode::LastDigit {
            amount_threshold: yuan(10_000),
            high_reward: "big red envelope".to_string(),
            low_reward: "small red envelope".to_string(),
        },
        order_scope: OrderScope::All,
    });

    let report = run_batch(
        &campaign,
        &mut MemoryAggregateStore::new(),
        &[
            platform("C-108", "a", 20_000),
            platform("C-208", "b", 5_000),
            platform("C-109", "c", 90_000),
        ],
    );

    assert_eq!(report.records[0].reward_names(), vec!["big red envelope"]);
    assert_eq!(report.records[1].reward_names(), vec!["small red envelope"]);
    assert!(report.records[2].rewards.is_empty());
}

#[test]
fn last_digit_zero_matches_contracts_ending_in_zero() {
    let mut campaign = activity("DIGIT-0");
    campaign.lucky = Some(LuckyNumberRule {
        number: 0,
        mode: LuckyMode::LastDigit {
            amount_threshold: yuan(10_000),
            high_reward: "big red envelope".to_string(),
            low_reward: "small red envelope".to_string(),
        },
        order_scope: OrderScope::All,
    });

    let report = run_batch(
        &campaign,
        &mut MemoryAggregateStore::new(),
        &[platform("C-110", "a", 12_000), platform("C-111", "b", 12_000)],
    );

    assert_eq!(report.records[0].reward_names(), vec!["big red envelope"]);
    assert!(report.records[1].rewards.is_empty());
}

#[test]
fn given_jump_over_three_thresholds_when_processed_then_all_three_tiers_are_granted() {
    let mut campaign = activity("TIER");
    campaign.tiers = Some(ladder(0));

    let report = run_batch(
        &campaign,
        &mut MemoryAggregateStore::new(),
        &[platform("C-1", "a", 35_000)],
    );

    let record = &report.records[0];
    assert_eq!(record.reward_names(), vec!["gold", "silver", "bronze"]);
    assert_eq!(
        record.next_reward,
        Some(NextRewardGap::Amount {
            missing: yuan(15_000),
            tier: "platinum".to_string(),
        })
    );
    assert_eq!(
        record.remark,
        "granted gold, silver, bronze; 15000.00 more to reach platinum"
    );
}

#[test]
fn minimum_contract_count_gates_tiers() {
    let mut campaign = activity("TIER-MIN");
    campaign.tiers = Some(ladder(2));

    let report = run_batch(
        &campaign,
        &mut MemoryAggregateStore::new(),
        &[platform("C-1", "a", 60_000), platform("C-2", "a", 1_000)],
    );

    assert!(report.records[0].rewards.is_empty());
    assert_eq!(
        report.records[0].next_reward,
        Some(NextRewardGap::Contracts { missing: 1 })
    );
    assert_eq!(
        report.records[0].remark,
        "1 more contract to unlock tiered rewards"
    );
    assert_eq!(report.records[1].rewards.len(), 4);
    assert_eq!(
        report.records[1].next_reward,
        Some(NextRewardGap::LadderComplete)
    );
}

#[test]
fn given_historical_contract_when_processed_then_it_never_reaches_tier_checks() {
    let mut campaign = activity("HIST");
    campaign.tiers = Some(ladder(0));
    let mut store = MemoryAggregateStore::new();

    let report = run_batch(
        &campaign,
        &mut store,
        &[
            historical(platform("H-1", "a", 100_000)),
            platform("C-1", "a", 5_000),
        ],
    );

    let old = &report.records[0];
    assert!(old.rewards.is_empty());
    assert_eq!(old.remark, HISTORICAL_REMARK);
    assert_eq!(old.global_sequence, 0);
    assert_eq!(old.personal_sequence, 0);
    assert_eq!(old.aggregate, AgentAggregate::default());

    let fresh = &report.records[1];
    assert!(fresh.rewards.is_empty());
    assert_eq!(fresh.global_sequence, 1);
    assert_eq!(fresh.aggregate.contract_count, 1);
    assert_eq!(fresh.aggregate.performance_amount, yuan(5_000));

    let aggregate = store.aggregate("HIST", "a").expect("aggregate should read");
    assert!(aggregate.awarded.is_empty());
    assert_eq!(store.contract_sequence("HIST").expect("sequence"), 1);
}

#[test]
fn tier_scanner_skips_tiers_already_awarded() {
    let mut tiers = ladder(0);
    tiers.ladder.sort_by_key(|tier| tier.threshold);
    let scanner = TierScanner::new(tiers);
    let aggregate = AgentAggregate {
        contract_count: 3,
        raw_amount: yuan(25_000),
        performance_amount: yuan(25_000),
        ..AgentAggregate::default()
    }
    .with_awards([&"tier:bronze".to_string()]);

    let (granted, next) = scanner.scan(&aggregate);

    let names: Vec<&str> = granted.iter().map(|reward| reward.name.as_str()).collect();
    assert_eq!(names, vec!["silver"]);
    assert_eq!(
        next,
        NextRewardGap::Amount {
            missing: yuan(5_000),
            tier: "gold".to_string(),
        }
    );
}
