use crate::{
    activity::{TierLadder, TierMetric},
    rewards::types::{NextRewardGap, RewardAssignment, RewardCategory, tier_award_key},
    store::AgentAggregate,
    types::{Cents, format_yuan},
};

#[derive(Debug, Clone)]
pub struct TierScanner {
    ladder: TierLadder,
}

impl TierScanner {
    /// `ladder.ladder` must be sorted by ascending threshold.
    pub fn new(ladder: TierLadder) -> Self {
        Self { ladder }
    }

    pub fn metric_amount(&self, aggregate: &AgentAggregate) -> Cents {
        let totals = aggregate.totals(self.ladder.order_scope);
        match self.ladder.metric {
            TierMetric::Performance => totals.performance_amount,
            TierMetric::Raw => totals.raw_amount,
        }
    }

    /// Grants every reached tier that is not yet awarded, highest first, and reports the
    /// gap to the next one.
    pub fn scan(&self, aggregate: &AgentAggregate) -> (Vec<RewardAssignment>, NextRewardGap) {
        let qualifying = aggregate.totals(self.ladder.order_scope).count;
        if qualifying < self.ladder.min_contract_count {
            return (
                Vec::new(),
                NextRewardGap::Contracts {
                    missing: self.ladder.min_contract_count - qualifying,
                },
            );
        }

        let amount = self.metric_amount(aggregate);
        let granted: Vec<RewardAssignment> = self
            .ladder
            .ladder
            .iter()
            .rev()
            .filter(|tier| tier.threshold <= amount)
            .filter_map(|tier| {
                let award_key = tier_award_key(&tier.name);
                (!aggregate.has_award(&award_key)).then(|| RewardAssignment {
                    category: RewardCategory::Tiered,
                    name: tier.name.clone(),
                    award_key,
                    note: Some(format!(
                        "cumulative {} reached {}",
                        format_yuan(amount),
                        format_yuan(tier.threshold)
                    )),
                })
            })
            .collect();

        let next = self
            .ladder
            .ladder
            .iter()
            .find(|tier| {
                tier.threshold > amount && !aggregate.has_award(&tier_award_key(&tier.name))
            })
            .map_or(NextRewardGap::LadderComplete, |tier| NextRewardGap::Amount {
                missing: tier.threshold - amount,
                tier: tier.name.clone(),
            });

        (granted, next)
    }
}
