use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    activity::{AgentKeyMode, DedupKeyField},
    error::{IncentiveError, invalid_contract},
    types::{AgentKey, Cents, ContractId, OrderType, ProjectId, cents_from_yuan, parse_yuan},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("contract input must be a JSON object")]
    NotAnObject,
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl From<NormalizeError> for IncentiveError {
    fn from(err: NormalizeError) -> Self {
        invalid_contract(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub contract_id: ContractId,
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    pub raw_amount: Cents,
    pub paid_amount: Cents,
    pub order_type: OrderType,
    #[serde(default)]
    pub historical: bool,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub project_address: Option<String>,
}

impl ContractEvent {
    /// Normalizes one contract dictionary as delivered by the data-fetch collaborator.
    pub fn from_value(value: &Value) -> Result<Self, NormalizeError> {
        let object = value.as_object().ok_or(NormalizeError::NotAnObject)?;

        let raw_amount = required_amount(object, "raw_amount")?;
        if raw_amount < 0 {
            return Err(NormalizeError::InvalidField {
                field: "raw_amount",
                reason: "amount cannot be negative".to_string(),
            });
        }

        let order_type = match object.get("order_type") {
            None | Some(Value::Null) => return Err(NormalizeError::MissingField("order_type")),
            Some(Value::String(raw)) => {
                OrderType::parse(raw).ok_or_else(|| NormalizeError::InvalidField {
                    field: "order_type",
                    reason: format!("unknown order type '{raw}'"),
                })?
            }
            Some(other) => {
                return Err(NormalizeError::InvalidField {
                    field: "order_type",
                    reason: format!("expected a string, got {other}"),
                });
            }
        };

        Ok(Self {
            contract_id: required_id(object, "contract_id")?,
            agent_id: required_id(object, "agent_id")?,
            agent_name: optional_id(object, "agent_name")?,
            provider_id: optional_id(object, "provider_id")?,
            raw_amount,
            paid_amount: required_amount(object, "paid_amount")?,
            order_type,
            historical: optional_flag(object, "historical")?.unwrap_or(false),
            project_id: optional_id(object, "project_id")?,
            project_address: optional_id(object, "project_address")?,
        })
    }

    pub fn agent_key(&self, mode: AgentKeyMode) -> Result<AgentKey, IncentiveError> {
        match mode {
            AgentKeyMode::Agent => Ok(self.agent_id.clone()),
            AgentKeyMode::AgentProvider => {
                let provider = self.provider_id.as_deref().ok_or_else(|| {
                    invalid_contract(format!(
                        "contract '{}' has no provider_id but the activity keys agents by provider",
                        self.contract_id
                    ))
                })?;
                Ok(format!(
                    "{}:{}",
                    escape_key_part(&self.agent_id),
                    escape_key_part(provider)
                ))
            }
        }
    }

    pub fn dedup_key(&self, field: DedupKeyField) -> Option<&str> {
        match field {
            DedupKeyField::ProjectAddress => self.project_address.as_deref(),
            DedupKeyField::ProjectId => self.project_id.as_deref(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.agent_name.as_deref().unwrap_or(&self.agent_id)
    }
}

/// Escapes `\` and `:` so the composite `agent:provider` key stays unambiguous.
fn escape_key_part(part: &str) -> Cow<'_, str> {
    if !part.contains(['\\', ':']) {
        return Cow::Borrowed(part);
    }
    let mut escaped = String::with_capacity(part.len() + 2);
    for ch in part.chars() {
        if ch == '\\' || ch == ':' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}

fn id_text(field: &'static str, value: &Value) -> Result<Option<String>, NormalizeError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => {
            let trimmed = text.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Value::Number(number) => Ok(Some(number.to_string())),
        other => Err(NormalizeError::InvalidField {
            field,
            reason: format!("expected a string or number, got {other}"),
        }),
    }
}

fn required_id(object: &Map<String, Value>, field: &'static str) -> Result<String, NormalizeError> {
    optional_id(object, field)?.ok_or(NormalizeError::MissingField(field))
}

fn optional_id(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, NormalizeError> {
    match object.get(field) {
        Some(value) => id_text(field, value),
        None => Ok(None),
    }
}

fn required_amount(object: &Map<String, Value>, field: &'static str) -> Result<Cents, NormalizeError> {
    let invalid = |reason: String| NormalizeError::InvalidField { field, reason };
    match object.get(field) {
        None | Some(Value::Null) => Err(NormalizeError::MissingField(field)),
        Some(Value::String(raw)) if raw.trim().is_empty() => Err(NormalizeError::MissingField(field)),
        Some(Value::String(raw)) => parse_yuan(raw).map_err(invalid),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(whole) => whole
                .checked_mul(100)
                .ok_or_else(|| invalid(format!("{whole} is out of range"))),
            None => number
                .as_f64()
                .ok_or_else(|| invalid(format!("{number} is not representable")))
                .and_then(|value| cents_from_yuan(value).map_err(invalid)),
        },
        Some(other) => Err(invalid(format!("expected an amount, got {other}"))),
    }
}

fn optional_flag(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<bool>, NormalizeError> {
    let invalid = |value: &Value| NormalizeError::InvalidField {
        field,
        reason: format!("expected a boolean marker, got {value}"),
    };
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(value @ Value::Number(number)) => match number.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(invalid(value)),
        },
        Some(value @ Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" => Ok(Some(false)),
            "1" | "true" | "yes" => Ok(Some(true)),
            _ => Err(invalid(value)),
        },
        Some(other) => Err(invalid(other)),
    }
}
