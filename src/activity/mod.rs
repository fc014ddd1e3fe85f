pub mod registry;
pub mod types;

pub use registry::{ActivityRegistry, validate_activity};
pub use types::{
    ActivityConfig, AgentKeyMode, BadgeToggles, CapPolicy, DedupKeyField, LuckyMode,
    LuckyNumberRule, RewardTier, SelfReferralRule, SequenceDisplay, TierLadder, TierMetric,
};
