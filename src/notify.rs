use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{
    activity::{ActivityConfig, BadgeToggles},
    error::{IncentiveError, internal_error},
    record::EnrichedRecord,
    store::OrderTypeTotals,
    types::{Cents, ContractId},
};

/// Structured fields the group broadcast template consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastPayload {
    pub activity_code: String,
    pub activity_title: String,
    pub agent_name: String,
    pub contract_id: ContractId,
    pub sequence: u64,
    pub performance_amount: Cents,
    pub cumulative_performance: Cents,
    pub platform: OrderTypeTotals,
    pub self_referred: OrderTypeTotals,
    pub reward_names: Vec<String>,
    pub remark: String,
    pub badges: BadgeToggles,
}

/// Sent to the agent only when the contract earned something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalRewardPayload {
    pub activity_code: String,
    pub agent_key: String,
    pub agent_name: String,
    pub contract_id: ContractId,
    pub reward_names: Vec<String>,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub record_id: String,
    pub broadcast: BroadcastPayload,
    #[serde(default)]
    pub personal: Option<PersonalRewardPayload>,
}

impl NotificationPayload {
    /// Historical records are never announced.
    pub fn from_record(activity: &ActivityConfig, record: &EnrichedRecord) -> Option<Self> {
        if record.contract.historical {
            return None;
        }

        let agent_name = record.contract.display_name().to_string();
        let reward_names: Vec<String> = record
            .rewards
            .iter()
            .map(|reward| reward.name.clone())
            .collect();
        let personal = (!reward_names.is_empty()).then(|| PersonalRewardPayload {
            activity_code: record.activity_code.clone(),
            agent_key: record.agent_key.clone(),
            agent_name: agent_name.clone(),
            contract_id: record.contract.contract_id.clone(),
            reward_names: reward_names.clone(),
            remark: record.remark.clone(),
        });

        Some(Self {
            record_id: record.record_id.clone(),
            broadcast: BroadcastPayload {
                activity_code: record.activity_code.clone(),
                activity_title: activity.title.clone(),
                agent_name,
                contract_id: record.contract.contract_id.clone(),
                sequence: record.display_sequence(),
                performance_amount: record.performance_amount,
                cumulative_performance: record.aggregate.performance_amount,
                platform: record.aggregate.platform,
                self_referred: record.aggregate.self_referred,
                reward_names,
                remark: record.remark.clone(),
                badges: activity.badges,
            },
            personal,
        })
    }
}

pub trait NotificationSink {
    fn deliver(&mut self, payload: &NotificationPayload) -> Result<(), IncentiveError>;
}

#[derive(Debug, Clone, Default)]
pub struct NoopNotificationSink;

impl NotificationSink for NoopNotificationSink {
    fn deliver(&mut self, _payload: &NotificationPayload) -> Result<(), IncentiveError> {
        Ok(())
    }
}

/// Writes one JSON document per line.
#[derive(Debug)]
pub struct NdjsonNotificationSink<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonNotificationSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> NotificationSink for NdjsonNotificationSink<W> {
    fn deliver(&mut self, payload: &NotificationPayload) -> Result<(), IncentiveError> {
        serde_json::to_writer(&mut self.writer, payload)
            .map_err(|err| internal_error(format!("failed to encode notification: {err}")))?;
        self.writer
            .write_all(b"\n")
            .map_err(|err| internal_error(format!("failed to write notification: {err}")))
    }
}

/// Derives and delivers payloads for `records`, returning how many were delivered.
pub fn dispatch_notifications(
    activity: &ActivityConfig,
    records: &[EnrichedRecord],
    sink: &mut dyn NotificationSink,
) -> Result<usize, IncentiveError> {
    let mut delivered = 0;
    for payload in records
        .iter()
        .filter_map(|record| NotificationPayload::from_record(activity, record))
    {
        sink.deliver(&payload)?;
        delivered += 1;
    }
    Ok(delivered)
}
