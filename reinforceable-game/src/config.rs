//! Per-deployment mission configuration.
use crate::constants::{DEFAULT_PLAY_AGAIN_LABEL, DEFAULT_SCORE_STEP, MAX_SCORE_STEP};
use crate::error::ConfigError;
use crate::lineup::LineupPlan;
use crate::result::TierConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Added to `max_possible` for every scored decision.
    #[serde(default = "MissionConfig::default_score_step")]
    pub score_step: i32,
    #[serde(default)]
    pub tiers: TierConfig,
    #[serde(default)]
    pub lineup: LineupPlan,
    #[serde(default = "MissionConfig::default_play_again_label")]
    pub play_again_label: String,
}

impl MissionConfig {
    const fn default_score_step() -> i32 {
        DEFAULT_SCORE_STEP
    }

    fn default_play_again_label() -> String {
        DEFAULT_PLAY_AGAIN_LABEL.to_string()
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Returns an error when the score step is outside `1..=100` or tiers are
    /// invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SCORE_STEP).contains(&self.score_step) {
            return Err(ConfigError::RangeViolation {
                field: "score_step",
                min: 1,
                max: i64::from(MAX_SCORE_STEP),
                value: i64::from(self.score_step),
            });
        }
        self.tiers.validate()
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            score_step: Self::default_score_step(),
            tiers: TierConfig::default(),
            lineup: LineupPlan::default(),
            play_again_label: Self::default_play_again_label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let cfg = MissionConfig::from_json("{}").unwrap();
        assert_eq!(cfg, MissionConfig::default());
        assert_eq!(cfg.score_step, 10);
        assert_eq!(cfg.lineup.draws.len(), 3);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = MissionConfig::from_json(
            r#"{
                "score_step": 5,
                "tiers": { "high_threshold": 90, "high_message": "Stellar!" },
                "lineup": { "draws": [ { "category": "crisis", "count": 2 } ] },
                "play_again_label": "Try another"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.score_step, 5);
        assert_eq!(cfg.tiers.high_threshold, 90);
        assert_eq!(cfg.tiers.high_message, "Stellar!");
        assert_eq!(cfg.tiers.medium_threshold, 50);
        assert_eq!(cfg.lineup.draws[0].category, "crisis");
        assert_eq!(cfg.play_again_label, "Try another");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            MissionConfig::from_json(r#"{"score_step": 0}"#),
            Err(ConfigError::RangeViolation { field: "score_step", .. })
        ));
        assert!(matches!(
            MissionConfig::from_json(r#"{"score_step": 101}"#),
            Err(ConfigError::RangeViolation { field: "score_step", max: 100, .. })
        ));
        assert!(matches!(
            MissionConfig::from_json(r#"{"score_step": 2147483647}"#),
            Err(ConfigError::RangeViolation { field: "score_step", .. })
        ));
        assert_eq!(
            MissionConfig::from_json(r#"{"score_step": 100}"#)
                .unwrap()
                .score_step,
            100
        );
        assert!(matches!(
            MissionConfig::from_json(r#"{"tiers": {"high_threshold": 40}}"#),
            Err(ConfigError::ThresholdOrder { .. })
        ));
        assert!(matches!(
            MissionConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
