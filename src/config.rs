//! Engine configuration
//!
//! Every tunable of the engine lives here: the timezone that defines local
//! sleep days, the hour at which a sleep day starts, the consistency lookback
//! and the score weights. Defaults reproduce the product's scoring model.

use crate::error::ComputeError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Hour (local) at which a sleep day begins
pub const DEFAULT_DAY_BOUNDARY_HOUR: u32 = 17;

/// Number of preceding sleep days averaged for bedtime consistency
pub const DEFAULT_CONSISTENCY_WINDOW_DAYS: u32 = 6;

/// Bedtime drift at which consistency reaches 0
pub const DEFAULT_CONSISTENCY_TOLERANCE_MINUTES: u32 = 60;

const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Relative weight of each sub-score in the final score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub efficiency: f64,
    pub sleep_time: f64,
    pub deep_sleep: f64,
    pub rem_sleep: f64,
    pub consistency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            efficiency: 0.2,
            sleep_time: 0.4,
            deep_sleep: 0.2,
            rem_sleep: 0.1,
            consistency: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.efficiency + self.sleep_time + self.deep_sleep + self.rem_sleep + self.consistency
    }

    fn all(&self) -> [(&'static str, f64); 5] {
        [
            ("efficiency", self.efficiency),
            ("sleep_time", self.sleep_time),
            ("deep_sleep", self.deep_sleep),
            ("rem_sleep", self.rem_sleep),
            ("consistency", self.consistency),
        ]
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA timezone used for local sleep-day boundaries
    pub timezone: String,
    /// Local hour at which a sleep day starts (0-23)
    pub day_boundary_hour: u32,
    /// Preceding days used for bedtime consistency
    pub consistency_window_days: u32,
    /// Bedtime drift that zeroes the consistency sub-score
    pub consistency_tolerance_minutes: u32,
    /// Sub-score weights, must sum to 1
    pub weights: ScoreWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            day_boundary_hour: DEFAULT_DAY_BOUNDARY_HOUR,
            consistency_window_days: DEFAULT_CONSISTENCY_WINDOW_DAYS,
            consistency_tolerance_minutes: DEFAULT_CONSISTENCY_TOLERANCE_MINUTES,
            weights: ScoreWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Default configuration in the given timezone
    pub fn with_timezone(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
            ..Self::default()
        }
    }

    /// Resolve the configured timezone
    pub fn tz(&self) -> Result<Tz, ComputeError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ComputeError::InvalidTimezone(self.timezone.clone()))
    }

    /// Check every field, returning the first problem found
    pub fn validate(&self) -> Result<(), ComputeError> {
        self.tz()?;

        if self.day_boundary_hour > 23 {
            return Err(ComputeError::InvalidConfig(format!(
                "day_boundary_hour must be 0-23, got {}",
                self.day_boundary_hour
            )));
        }
        if self.consistency_window_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "consistency_window_days must be at least 1".to_string(),
            ));
        }
        if self.consistency_tolerance_minutes == 0 {
            return Err(ComputeError::InvalidConfig(
                "consistency_tolerance_minutes must be positive".to_string(),
            ));
        }

        for (name, weight) in self.weights.all() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ComputeError::InvalidConfig(format!(
                    "weight {name} must be a non-negative number, got {weight}"
                )));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ComputeError::InvalidConfig(format!(
                "weights must sum to 1, got {sum}"
            )));
        }

        Ok(())
    }

    /// Load and validate a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tz().unwrap(), Tz::UTC);
        assert!((config.weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = EngineConfig::from_json(r#"{"timezone": "America/New_York"}"#).unwrap();
        assert_eq!(config.timezone, "America/New_York");
        assert_eq!(config.day_boundary_hour, DEFAULT_DAY_BOUNDARY_HOUR);
        assert_eq!(config.weights, ScoreWeights::default());
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let config = EngineConfig::with_timezone("Mars/Olympus_Mons");
        assert!(matches!(
            config.validate(),
            Err(ComputeError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_rejects_weights_not_summing_to_one() {
        let json = r#"{"weights": {"efficiency": 0.5}}"#;
        assert!(matches!(
            EngineConfig::from_json(json),
            Err(ComputeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_bad_boundary_hour() {
        let config = EngineConfig {
            day_boundary_hour: 24,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::with_timezone("Europe/Berlin");
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
