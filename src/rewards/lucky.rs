use crate::{
    activity::{LuckyMode, LuckyNumberRule},
    rewards::types::{
        RewardAssignment, RewardCategory, RuleContext, lucky_contract_award_key,
        lucky_sequence_award_key,
    },
    types::{Cents, OrderScope},
};

pub trait LuckyMatcher: Send + Sync {
    fn matches(&self, ctx: &RuleContext<'_>) -> Option<RewardAssignment>;
}

#[derive(Debug, Clone)]
pub struct LastDigitMatcher {
    pub digit: u32,
    pub amount_threshold: Cents,
    pub high_reward: String,
    pub low_reward: String,
    pub order_scope: OrderScope,
}

impl LuckyMatcher for LastDigitMatcher {
    fn matches(&self, ctx: &RuleContext<'_>) -> Option<RewardAssignment> {
        let event = ctx.event;
        if !self.order_scope.includes(event.order_type) {
            return None;
        }
        let trailing = event.contract_id.chars().last()?.to_digit(10)?;
        if trailing != self.digit {
            return None;
        }

        let award_key = lucky_contract_award_key(&event.contract_id);
        if ctx.aggregate.has_award(&award_key) {
            return None;
        }
        let name = if event.raw_amount >= self.amount_threshold {
            &self.high_reward
        } else {
            &self.low_reward
        };
        Some(RewardAssignment {
            category: RewardCategory::LuckyNumber,
            name: name.clone(),
            award_key,
            note: Some(format!("contract id ends with {}", self.digit)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PersonalSequenceMatcher {
    pub multiple: u64,
    pub reward: String,
    pub order_scope: OrderScope,
}

impl LuckyMatcher for PersonalSequenceMatcher {
    fn matches(&self, ctx: &RuleContext<'_>) -> Option<RewardAssignment> {
        if !self.order_scope.includes(ctx.event.order_type) || self.multiple == 0 {
            return None;
        }
        let ordinal = ctx.aggregate.totals(self.order_scope).count;
        if ordinal == 0 || ordinal % self.multiple != 0 {
            return None;
        }

        let award_key = lucky_sequence_award_key(ordinal);
        if ctx.aggregate.has_award(&award_key) {
            return None;
        }
        Some(RewardAssignment {
            category: RewardCategory::LuckyNumber,
            name: self.reward.clone(),
            award_key,
            note: Some(format!("qualifying order #{ordinal}")),
        })
    }
}

pub fn matcher_for(rule: &LuckyNumberRule) -> Box<dyn LuckyMatcher> {
    match &rule.mode {
        LuckyMode::LastDigit {
            amount_threshold,
            high_reward,
            low_reward,
        } => Box::new(LastDigitMatcher {
            digit: rule.number,
            amount_threshold: *amount_threshold,
            high_reward: high_reward.clone(),
            low_reward: low_reward.clone(),
            order_scope: rule.order_scope,
        }),
        LuckyMode::PersonalSequence { reward } => Box::new(PersonalSequenceMatcher {
            multiple: u64::from(rule.number),
            reward: reward.clone(),
            order_scope: rule.order_scope,
        }),
    }
}
