pub mod calculator;
pub mod lucky;
pub mod self_referral;
pub mod tiers;
pub mod types;

pub use calculator::RewardCalculator;
pub use lucky::{LastDigitMatcher, LuckyMatcher, PersonalSequenceMatcher};
pub use self_referral::SelfReferralMatcher;
pub use tiers::TierScanner;
pub use types::{NextRewardGap, RewardAssignment, RewardCategory, RewardOutcome, RuleContext};
