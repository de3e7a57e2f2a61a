//! Tunable thresholds for the fuzzy match tiers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MusubiError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Tuning for the three fuzzy tiers of the match cascade.
///
/// The exact tiers have nothing to tune: they either match with 1.0 or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub loose: FuzzyTierConfig,
    pub last_resort: FuzzyTierConfig,
    pub fallback: FuzzyTierConfig,
}

/// One fuzzy tier's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyTierConfig {
    /// Title pairs scoring below this (before the bonus) are ignored.
    #[serde(default)]
    pub min_similarity: f64,
    /// Added to a pair's score when the formats are compatible, capped at 1.0.
    #[serde(default)]
    pub type_bonus: f64,
    /// The tier's best pair is returned only if its final score reaches this.
    #[serde(default)]
    pub accept_at: f64,
}

impl MatchConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, MusubiError> {
        let config: MatchConfig =
            toml::from_str(s).map_err(|e| MusubiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self, MusubiError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Every threshold and bonus must lie in [0, 1].
    pub fn validate(&self) -> Result<(), MusubiError> {
        for (name, tier) in [
            ("loose", &self.loose),
            ("last_resort", &self.last_resort),
            ("fallback", &self.fallback),
        ] {
            for (field, value) in [
                ("min_similarity", tier.min_similarity),
                ("type_bonus", tier.type_bonus),
                ("accept_at", tier.accept_at),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(MusubiError::Config(format!(
                        "{name}.{field} must be within [0, 1], got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, MusubiError> {
        toml::to_string_pretty(self).map_err(|e| MusubiError::Config(e.to_string()))
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}
