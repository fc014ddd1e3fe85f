use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    contract::ContractEvent,
    error::{IncentiveError, arithmetic_error},
    types::{AwardKey, Cents, OrderScope, OrderType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderTypeTotals {
    pub count: u64,
    pub raw_amount: Cents,
    pub performance_amount: Cents,
}

impl OrderTypeTotals {
    fn checked_add(self, other: Self) -> Option<Self> {
        Some(Self {
            count: self.count.checked_add(other.count)?,
            raw_amount: self.raw_amount.checked_add(other.raw_amount)?,
            performance_amount: self
                .performance_amount
                .checked_add(other.performance_amount)?,
        })
    }
}

/// Running totals of one agent within one activity. Snapshots are immutable values:
/// every mutation returns a new aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentAggregate {
    pub contract_count: u64,
    pub raw_amount: Cents,
    pub performance_amount: Cents,
    #[serde(default)]
    pub platform: OrderTypeTotals,
    #[serde(default)]
    pub self_referred: OrderTypeTotals,
    #[serde(default)]
    pub awarded: BTreeSet<AwardKey>,
    #[serde(default)]
    pub self_referral_keys: BTreeSet<String>,
}

impl AgentAggregate {
    pub fn totals_for(&self, order_type: OrderType) -> OrderTypeTotals {
        match order_type {
            OrderType::Platform => self.platform,
            OrderType::SelfReferred => self.self_referred,
        }
    }

    pub fn totals(&self, scope: OrderScope) -> OrderTypeTotals {
        match scope {
            OrderScope::Platform => self.platform,
            OrderScope::All => OrderTypeTotals {
                count: self.contract_count,
                raw_amount: self.raw_amount,
                performance_amount: self.performance_amount,
            },
        }
    }

    pub fn has_award(&self, key: &str) -> bool {
        self.awarded.contains(key)
    }

    /// Aggregate after counting `event` with its capped `performance_amount`.
    pub fn including(
        &self,
        event: &ContractEvent,
        performance_amount: Cents,
    ) -> Result<Self, IncentiveError> {
        let delta = OrderTypeTotals {
            count: 1,
            raw_amount: event.raw_amount,
            performance_amount,
        };
        let overflow = || {
            arithmetic_error(format!(
                "aggregate overflow while including contract '{}'",
                event.contract_id
            ))
        };

        let mut next = self.clone();
        next.contract_count = next.contract_count.checked_add(1).ok_or_else(overflow)?;
        next.raw_amount = next
            .raw_amount
            .checked_add(event.raw_amount)
            .ok_or_else(overflow)?;
        next.performance_amount = next
            .performance_amount
            .checked_add(performance_amount)
            .ok_or_else(overflow)?;
        match event.order_type {
            OrderType::Platform => {
                next.platform = next.platform.checked_add(delta).ok_or_else(overflow)?;
            }
            OrderType::SelfReferred => {
                next.self_referred = next.self_referred.checked_add(delta).ok_or_else(overflow)?;
            }
        }
        Ok(next)
    }

    pub fn with_awards<'a>(&self, keys: impl IntoIterator<Item = &'a AwardKey>) -> Self {
        let mut next = self.clone();
        next.awarded.extend(keys.into_iter().cloned());
        next
    }

    pub fn with_self_referral_key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.self_referral_keys.insert(key.to_string());
        next
    }
}
