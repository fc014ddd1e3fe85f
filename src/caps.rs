use serde::{Deserialize, Serialize};

use crate::{
    activity::CapPolicy,
    contract::ContractEvent,
    error::{IncentiveError, arithmetic_error},
    types::{Cents, ProjectId},
};

/// Charge a contract adds to its project's running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCharge {
    pub project_id: ProjectId,
    pub consumed_before: Cents,
    /// Raw contract amount, not the clipped amount.
    pub charged: Cents,
    pub consumed_after: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapAllocation {
    pub performance_amount: Cents,
    pub contract_capped: Cents,
    #[serde(default)]
    pub project_capped: Option<Cents>,
    #[serde(default)]
    pub project_charge: Option<ProjectCharge>,
}

#[derive(Debug, Clone, Copy)]
pub struct CapAllocator<'a> {
    policy: &'a CapPolicy,
}

impl<'a> CapAllocator<'a> {
    pub fn new(policy: &'a CapPolicy) -> Self {
        Self { policy }
    }

    /// `consumed_before` is the project's running total before this contract; it is
    /// ignored for contracts without a project id.
    pub fn allocate(
        &self,
        event: &ContractEvent,
        consumed_before: Cents,
    ) -> Result<CapAllocation, IncentiveError> {
        let raw = event.raw_amount.max(0);
        let contract_capped = match self.policy.contract_cap_for(event.order_type) {
            Some(cap) => raw.min(cap.max(0)),
            None => raw,
        };

        let Some(project_id) = event.project_id.as_ref() else {
            return Ok(CapAllocation {
                performance_amount: contract_capped,
                contract_capped,
                project_capped: None,
                project_charge: None,
            });
        };

        let consumed_before = consumed_before.max(0);
        let project_capped = self
            .policy
            .project_cap_for(event.order_type)
            .map(|cap| raw.min(remaining_quota(cap, consumed_before)));
        let consumed_after = consumed_before.checked_add(raw).ok_or_else(|| {
            arithmetic_error(format!("project '{project_id}' consumption overflow"))
        })?;

        Ok(CapAllocation {
            performance_amount: project_capped.map_or(contract_capped, |project_capped| {
                contract_capped.min(project_capped)
            }),
            contract_capped,
            project_capped,
            project_charge: Some(ProjectCharge {
                project_id: project_id.clone(),
                consumed_before,
                charged: raw,
                consumed_after,
            }),
        })
    }
}

pub fn remaining_quota(cap: Cents, used: Cents) -> Cents {
    cap.saturating_sub(used).max(0)
}
