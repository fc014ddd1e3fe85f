use crate::{
    activity::ActivityConfig,
    contract::ContractEvent,
    rewards::{
        lucky::{LuckyMatcher, matcher_for},
        self_referral::SelfReferralMatcher,
        tiers::TierScanner,
        types::{RewardOutcome, RuleContext},
    },
    store::AgentAggregate,
};

/// One evaluator per activity. Rule strategies are picked from the config once, at
/// construction.
pub struct RewardCalculator {
    lucky: Option<Box<dyn LuckyMatcher>>,
    tiers: Option<TierScanner>,
    self_referral: Option<SelfReferralMatcher>,
}

impl RewardCalculator {
    pub fn new(activity: &ActivityConfig) -> Self {
        Self {
            lucky: activity.lucky.as_ref().map(matcher_for),
            tiers: activity.tiers.clone().map(TierScanner::new),
            self_referral: SelfReferralMatcher::new(activity.self_referral.clone()),
        }
    }

    pub fn self_referral(&self) -> Option<&SelfReferralMatcher> {
        self.self_referral.as_ref()
    }

    /// `aggregate` must already include `event`. Historical contracts never earn rewards.
    pub fn evaluate(&self, event: &ContractEvent, aggregate: &AgentAggregate) -> RewardOutcome {
        if event.historical {
            return RewardOutcome::default();
        }

        let ctx = RuleContext { event, aggregate };
        let mut outcome = RewardOutcome::default();

        if let Some(reward) = self.lucky.as_ref().and_then(|lucky| lucky.matches(&ctx)) {
            outcome.rewards.push(reward);
        }
        if let Some(scanner) = &self.tiers {
            let (granted, next) = scanner.scan(aggregate);
            outcome.rewards.extend(granted);
            outcome.next_reward = Some(next);
        }
        if let Some(reward) = self
            .self_referral
            .as_ref()
            .and_then(|rule| rule.matches(&ctx))
        {
            outcome.rewards.push(reward);
        }

        outcome
    }
}
