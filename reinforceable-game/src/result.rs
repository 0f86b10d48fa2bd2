//! End-of-mission scoring summary
use crate::constants::{
    DEFAULT_HIGH_MESSAGE, DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_MESSAGE, DEFAULT_MEDIUM_MESSAGE,
    DEFAULT_MEDIUM_THRESHOLD,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Percentage bands and the narrative shown for each
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(default = "TierConfig::default_high_threshold")]
    pub high_threshold: u8,
    #[serde(default = "TierConfig::default_medium_threshold")]
    pub medium_threshold: u8,
    #[serde(default = "TierConfig::default_high_message")]
    pub high_message: String,
    #[serde(default = "TierConfig::default_medium_message")]
    pub medium_message: String,
    #[serde(default = "TierConfig::default_low_message")]
    pub low_message: String,
}

impl TierConfig {
    const fn default_high_threshold() -> u8 {
        DEFAULT_HIGH_THRESHOLD
    }

    const fn default_medium_threshold() -> u8 {
        DEFAULT_MEDIUM_THRESHOLD
    }

    fn default_high_message() -> String {
        DEFAULT_HIGH_MESSAGE.to_string()
    }

    fn default_medium_message() -> String {
        DEFAULT_MEDIUM_MESSAGE.to_string()
    }

    fn default_low_message() -> String {
        DEFAULT_LOW_MESSAGE.to_string()
    }

    /// Check threshold bounds and ordering.
    ///
    /// # Errors
    ///
    /// Returns an error when a threshold exceeds 100 or high is below medium.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("tiers.high_threshold", self.high_threshold),
            ("tiers.medium_threshold", self.medium_threshold),
        ] {
            if value > 100 {
                return Err(ConfigError::RangeViolation {
                    field,
                    min: 0,
                    max: 100,
                    value: i64::from(value),
                });
            }
        }
        if self.high_threshold < self.medium_threshold {
            return Err(ConfigError::ThresholdOrder {
                high: self.high_threshold,
                medium: self.medium_threshold,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn tier_for(&self, percent: u8) -> Tier {
        if percent >= self.high_threshold {
            Tier::High
        } else if percent >= self.medium_threshold {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    #[must_use]
    pub fn message_for(&self, tier: Tier) -> &str {
        match tier {
            Tier::High => &self.high_message,
            Tier::Medium => &self.medium_message,
            Tier::Low => &self.low_message,
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            high_threshold: Self::default_high_threshold(),
            medium_threshold: Self::default_medium_threshold(),
            high_message: Self::default_high_message(),
            medium_message: Self::default_medium_message(),
            low_message: Self::default_low_message(),
        }
    }
}

/// Fidelity band for a finished mission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    #[must_use]
    pub const fn mood(self) -> WizardMood {
        match self {
            Self::High => WizardMood::Cheering,
            Self::Medium => WizardMood::Neutral,
            Self::Low => WizardMood::Concerned,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// The coaching wizard's reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardMood {
    Cheering,
    Neutral,
    Concerned,
}

impl WizardMood {
    /// Same scale as a single choice score.
    #[must_use]
    pub const fn delta(self) -> i32 {
        match self {
            Self::Cheering => 10,
            Self::Neutral => 0,
            Self::Concerned => -10,
        }
    }
}

/// Rounded share of `max_possible` earned, clamped to `0..=100`.
///
/// Negative totals display as zero; `max_possible == 0` yields zero.
#[must_use]
pub fn percent(points: i32, max_possible: i32) -> u8 {
    if max_possible <= 0 {
        return 0;
    }
    let earned = i64::from(points.clamp(0, max_possible));
    let max = i64::from(max_possible);
    let rounded = (earned * 200 + max) / (2 * max);
    u8::try_from(rounded).unwrap_or(100)
}

/// Complete summary of a finished mission for display and reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub scenario_id: String,
    pub ending_key: String,
    pub ending_title: String,
    pub ending_text: String,
    pub points: i32,
    pub max_possible: i32,
    pub percent: u8,
    pub tier: Tier,
    pub message: String,
    pub mood: WizardMood,
    pub decisions: usize,
}

/// Inputs for a result summary, borrowed from the finished run.
#[derive(Debug, Clone, Copy)]
pub struct ResultInputs<'a> {
    pub scenario_id: &'a str,
    pub ending_key: &'a str,
    pub ending_title: &'a str,
    pub ending_text: &'a str,
    pub points: i32,
    pub max_possible: i32,
    pub decisions: usize,
}

/// Build the summary shown on an ending node.
#[must_use]
pub fn result_summary(inputs: &ResultInputs<'_>, tiers: &TierConfig) -> ResultSummary {
    let pct = percent(inputs.points, inputs.max_possible);
    let tier = tiers.tier_for(pct);
    ResultSummary {
        scenario_id: inputs.scenario_id.to_string(),
        ending_key: inputs.ending_key.to_string(),
        ending_title: inputs.ending_title.to_string(),
        ending_text: inputs.ending_text.to_string(),
        points: inputs.points,
        max_possible: inputs.max_possible,
        percent: pct,
        tier,
        message: tiers.message_for(tier).to_string(),
        mood: tier.mood(),
        decisions: inputs.decisions,
    }
}
