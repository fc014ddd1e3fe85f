//! Serde adapter for amounts written in yuan (number or decimal string) and held as cents.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

use crate::types::{Cents, cents_from_yuan, parse_yuan, yuan_from_cents};

#[derive(Deserialize)]
#[serde(untagged)]
enum YuanInput {
    String(String),
    Integer(i64),
    Float(f64),
}

fn decode<E: Error>(input: YuanInput) -> Result<Cents, E> {
    match input {
        YuanInput::String(raw) => parse_yuan(&raw).map_err(E::custom),
        YuanInput::Integer(value) => value
            .checked_mul(100)
            .ok_or_else(|| E::custom(format!("{value} is out of range"))),
        YuanInput::Float(value) => cents_from_yuan(value).map_err(E::custom),
    }
}

pub fn serialize<S>(value: &Cents, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(yuan_from_cents(*value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Cents, D::Error>
where
    D: Deserializer<'de>,
{
    decode(YuanInput::deserialize(deserializer)?)
}

pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{YuanInput, decode};
    use crate::types::{Cents, yuan_from_cents};

    pub fn serialize<S>(value: &Option<Cents>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(cents) => serializer.serialize_some(&yuan_from_cents(*cents)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Cents>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<YuanInput>::deserialize(deserializer)?
            .map(decode)
            .transpose()
    }
}
