use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    activity::types::{ActivityConfig, LuckyMode},
    error::{IncentiveError, configuration_error},
};

/// Validated activity configs keyed by activity code.
#[derive(Debug, Clone, Default)]
pub struct ActivityRegistry {
    activities: BTreeMap<String, Arc<ActivityConfig>>,
}

impl ActivityRegistry {
    pub fn new(
        activities: impl IntoIterator<Item = (String, ActivityConfig)>,
    ) -> Result<Self, IncentiveError> {
        let mut registry = Self::default();
        for (code, mut activity) in activities {
            if activity.activity_code.is_empty() {
                activity.activity_code = code.clone();
            }
            if activity.activity_code != code {
                return Err(configuration_error(format!(
                    "activity registered as '{}' declares activity_code '{}'",
                    code, activity.activity_code
                )));
            }
            registry.insert(activity)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, activity: ActivityConfig) -> Result<(), IncentiveError> {
        let activity = validate_activity(activity)?;
        if self.activities.contains_key(&activity.activity_code) {
            return Err(configuration_error(format!(
                "activity '{}' is registered twice",
                activity.activity_code
            )));
        }
        self.activities
            .insert(activity.activity_code.clone(), Arc::new(activity));
        Ok(())
    }

    pub fn resolve(&self, activity_code: &str) -> Result<Arc<ActivityConfig>, IncentiveError> {
        self.activities.get(activity_code).cloned().ok_or_else(|| {
            configuration_error(format!(
                "unknown activity '{}'; known activities: [{}]",
                activity_code,
                self.activities
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.activities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// Semantic checks the JSON schema cannot express. Returns the activity with its tier
/// ladder sorted by ascending threshold.
pub fn validate_activity(mut activity: ActivityConfig) -> Result<ActivityConfig, IncentiveError> {
    let code = activity.activity_code.trim();
    if code.is_empty() {
        return Err(configuration_error("activity_code cannot be empty"));
    }
    let code = code.to_string();

    if let Some(lucky) = &activity.lucky {
        match &lucky.mode {
            LuckyMode::LastDigit {
                amount_threshold,
                high_reward,
                low_reward,
            } => {
                if lucky.number > 9 {
                    return Err(configuration_error(format!(
                        "activity '{code}': last-digit lucky number must be a single digit, got {}",
                        lucky.number
                    )));
                }
                if *amount_threshold < 0 {
                    return Err(configuration_error(format!(
                        "activity '{code}': lucky.amount_threshold cannot be negative"
                    )));
                }
                if high_reward.trim().is_empty() || low_reward.trim().is_empty() {
                    return Err(configuration_error(format!(
                        "activity '{code}': last-digit lucky rule needs both reward names"
                    )));
                }
            }
            LuckyMode::PersonalSequence { reward } => {
                if lucky.number == 0 {
                    return Err(configuration_error(format!(
                        "activity '{code}': personal-sequence lucky.number must be positive"
                    )));
                }
                if reward.trim().is_empty() {
                    return Err(configuration_error(format!(
                        "activity '{code}': personal-sequence lucky rule needs a reward name"
                    )));
                }
            }
        }
    }

    if let Some(tiers) = &mut activity.tiers {
        if tiers.ladder.is_empty() {
            return Err(configuration_error(format!(
                "activity '{code}': tier ladder cannot be empty"
            )));
        }
        tiers.ladder.sort_by_key(|tier| tier.threshold);

        let mut names = BTreeSet::new();
        let mut previous = None;
        for tier in &tiers.ladder {
            if tier.threshold <= 0 {
                return Err(configuration_error(format!(
                    "activity '{code}': tier '{}' threshold must be positive",
                    tier.name
                )));
            }
            if previous == Some(tier.threshold) {
                return Err(configuration_error(format!(
                    "activity '{code}': duplicate tier threshold {}",
                    tier.threshold
                )));
            }
            if tier.name.trim().is_empty() || !names.insert(tier.name.clone()) {
                return Err(configuration_error(format!(
                    "activity '{code}': tier names must be unique and non-empty, got '{}'",
                    tier.name
                )));
            }
            previous = Some(tier.threshold);
        }
    }

    let caps = &activity.caps;
    for (field, value) in [
        ("contract_cap", caps.contract_cap),
        ("self_referral_contract_cap", caps.self_referral_contract_cap),
        ("project_cap", caps.project_cap),
        ("self_referral_project_cap", caps.self_referral_project_cap),
    ] {
        if value.is_some_and(|cap| cap < 0) {
            return Err(configuration_error(format!(
                "activity '{code}': caps.{field} cannot be negative"
            )));
        }
    }

    if activity.self_referral.enabled && activity.self_referral.reward.trim().is_empty() {
        return Err(configuration_error(format!(
            "activity '{code}': enabled self_referral rule needs a reward name"
        )));
    }

    activity.activity_code = code;
    Ok(activity)
}
