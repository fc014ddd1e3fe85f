use crate::{
    activity::SelfReferralRule,
    contract::ContractEvent,
    rewards::types::{RewardAssignment, RewardCategory, RuleContext, self_referral_award_key},
    types::OrderType,
};

#[derive(Debug, Clone)]
pub struct SelfReferralMatcher {
    rule: SelfReferralRule,
}

impl SelfReferralMatcher {
    pub fn new(rule: SelfReferralRule) -> Option<Self> {
        rule.enabled.then_some(Self { rule })
    }

    pub fn rule(&self) -> &SelfReferralRule {
        &self.rule
    }

    /// Dedup key of `event` if the order is subject to this rule.
    pub fn dedup_key<'e>(&self, event: &'e ContractEvent) -> Option<&'e str> {
        if event.order_type != OrderType::SelfReferred {
            return None;
        }
        event.dedup_key(self.rule.dedup_key)
    }

    pub fn matches(&self, ctx: &RuleContext<'_>) -> Option<RewardAssignment> {
        let dedup_key = self.dedup_key(ctx.event)?;
        let award_key = self_referral_award_key(dedup_key);
        if ctx.aggregate.has_award(&award_key) {
            return None;
        }
        Some(RewardAssignment {
            category: RewardCategory::SelfReferral,
            name: self.rule.reward.clone(),
            award_key,
            note: Some(format!("first self-referred order for {dedup_key}")),
        })
    }
}
