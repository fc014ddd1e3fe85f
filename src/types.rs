use serde::{Deserialize, Serialize};

/// Minor currency units (fen). All arithmetic in the engine happens on this type.
pub type Cents = i64;
pub type ActivityCode = String;
pub type ContractId = String;
pub type AgentKey = String;
pub type ProjectId = String;
pub type AwardKey = String;

const CENTS_PER_YUAN: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Platform,
    #[serde(alias = "self-referred", alias = "self")]
    SelfReferred,
}

impl OrderType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "platform" => Some(Self::Platform),
            "self_referred" | "self-referred" | "self" => Some(Self::SelfReferred),
            _ => None,
        }
    }
}

/// Which orders count toward a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderScope {
    Platform,
    #[default]
    All,
}

impl OrderScope {
    pub fn includes(self, order_type: OrderType) -> bool {
        match self {
            Self::All => true,
            Self::Platform => order_type == OrderType::Platform,
        }
    }
}

/// Parses a yuan amount such as `"30000"`, `"1,250.5"` or `"99.99"` into cents.
pub fn parse_yuan(raw: &str) -> Result<Cents, String> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',').collect();
    if cleaned.is_empty() {
        return Err("amount is empty".to_string());
    }

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(format!("'{raw}' is not a decimal amount"));
    }
    if !whole.chars().all(|ch| ch.is_ascii_digit())
        || !fraction.chars().all(|ch| ch.is_ascii_digit())
    {
        return Err(format!("'{raw}' is not a decimal amount"));
    }
    if fraction.len() > 2 && fraction[2..].chars().any(|ch| ch != '0') {
        return Err(format!("'{raw}' has sub-cent precision"));
    }

    let whole_cents = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<i64>()
            .ok()
            .and_then(|value| value.checked_mul(CENTS_PER_YUAN))
            .ok_or_else(|| format!("'{raw}' is out of range"))?
    };
    let fraction_cents = match fraction.len() {
        0 => 0,
        1 => fraction[..1].parse::<i64>().unwrap_or(0) * 10,
        _ => fraction[..2].parse::<i64>().unwrap_or(0),
    };
    let cents = whole_cents
        .checked_add(fraction_cents)
        .ok_or_else(|| format!("'{raw}' is out of range"))?;

    Ok(if negative { -cents } else { cents })
}

pub fn cents_from_yuan(value: f64) -> Result<Cents, String> {
    if !value.is_finite() {
        return Err(format!("{value} is not a finite amount"));
    }
    let scaled = value * CENTS_PER_YUAN as f64;
    let rounded = scaled.round();
    if (scaled - rounded).abs() > 1e-6 {
        return Err(format!("{value} has sub-cent precision"));
    }
    if rounded.abs() > i64::MAX as f64 {
        return Err(format!("{value} is out of range"));
    }
    Ok(rounded as i64)
}

pub fn yuan_from_cents(cents: Cents) -> f64 {
    cents as f64 / CENTS_PER_YUAN as f64
}

/// Renders cents as a yuan string with two decimals, e.g. `12345` -> `"123.45"`.
pub fn format_yuan(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!(
        "{sign}{}.{:02}",
        abs / CENTS_PER_YUAN as u64,
        abs % CENTS_PER_YUAN as u64
    )
}
