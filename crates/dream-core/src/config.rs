//! Tunable constants, deserialized once at startup and then immutable.
//!
//! Every field has a default so an absent or partial config file is fine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{DreamError, Result};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub confidence: ConfidenceConfig,
    pub symbol: SymbolConfig,
    pub engine: EngineConfig,
    pub lexicon: LexiconOverrides,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        self.confidence.validate()?;
        self.symbol.validate()?;
        self.lexicon.validate()
    }
}

/// Blend weights of one axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisBlend {
    pub sentiment_weight: f64,
    pub keyword_weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub valence: AxisBlend,
    pub energy: AxisBlend,
    pub keyword_share_cap: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            valence: AxisBlend {
                sentiment_weight: VALENCE_SENTIMENT_WEIGHT,
                keyword_weight: VALENCE_KEYWORD_WEIGHT,
            },
            energy: AxisBlend {
                sentiment_weight: ENERGY_SENTIMENT_WEIGHT,
                keyword_weight: ENERGY_KEYWORD_WEIGHT,
            },
            keyword_share_cap: KEYWORD_SHARE_CAP,
        }
    }
}

impl ClassifierConfig {
    fn validate(&self) -> Result<()> {
        unit("classifier.keyword_share_cap", self.keyword_share_cap)?;
        for (axis, blend) in [("valence", self.valence), ("energy", self.energy)] {
            unit(&format!("classifier.{axis}.sentiment_weight"), blend.sentiment_weight)?;
            unit(&format!("classifier.{axis}.keyword_weight"), blend.keyword_weight)?;
            if (blend.sentiment_weight + blend.keyword_weight - 1.0).abs() > EPSILON {
                return Err(DreamError::InvalidConfig(format!(
                    "classifier.{axis}: weights must sum to 1, got {}",
                    blend.sentiment_weight + blend.keyword_weight
                )));
            }
            if blend.keyword_weight > self.keyword_share_cap + EPSILON {
                return Err(DreamError::InvalidConfig(format!(
                    "classifier.{axis}.keyword_weight {} exceeds keyword_share_cap {}",
                    blend.keyword_weight, self.keyword_share_cap
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub base: f64,
    pub magnitude_weight: f64,
    pub keyword_weight: f64,
    pub keyword_saturation: usize,
    /// Off by default. Longer narratives earn extra confidence when set.
    pub length_weight: f64,
    pub length_saturation: usize,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: CONFIDENCE_BASE,
            magnitude_weight: CONFIDENCE_MAGNITUDE_WEIGHT,
            keyword_weight: CONFIDENCE_KEYWORD_WEIGHT,
            keyword_saturation: CONFIDENCE_KEYWORD_SATURATION,
            length_weight: 0.0,
            length_saturation: CONFIDENCE_LENGTH_SATURATION,
        }
    }
}

impl ConfidenceConfig {
    fn validate(&self) -> Result<()> {
        unit("confidence.base", self.base)?;
        unit("confidence.magnitude_weight", self.magnitude_weight)?;
        unit("confidence.keyword_weight", self.keyword_weight)?;
        unit("confidence.length_weight", self.length_weight)?;
        if self.keyword_saturation == 0 || self.length_saturation == 0 {
            return Err(DreamError::InvalidConfig(
                "confidence saturation values must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolConfig {
    pub max_complexity: u32,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            max_complexity: MAX_COMPLEXITY,
        }
    }
}

impl SymbolConfig {
    fn validate(&self) -> Result<()> {
        if self.max_complexity == 0 {
            return Err(DreamError::InvalidConfig(
                "symbol.max_complexity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: MAX_CONFLICT_RETRIES,
        }
    }
}

/// Extra or replacement lexicon entries. A weight of 0 removes a word.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconOverrides {
    pub valence: BTreeMap<String, f64>,
    pub energy: BTreeMap<String, f64>,
}

impl LexiconOverrides {
    fn validate(&self) -> Result<()> {
        let entries = [("valence", &self.valence), ("energy", &self.energy)];
        for (axis, table) in entries {
            for (word, weight) in table {
                if !weight.is_finite() || !(-1.0..=1.0).contains(weight) {
                    return Err(DreamError::InvalidConfig(format!(
                        "lexicon.{axis}.{word} must be within [-1, 1], got {weight}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DreamError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_keyword_weight_over_cap_rejected() {
        let mut cfg = Config::default();
        cfg.classifier.energy = AxisBlend {
            sentiment_weight: 0.2,
            keyword_weight: 0.8,
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("keyword_share_cap"), "{err}");
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut cfg = Config::default();
        cfg.classifier.valence.sentiment_weight = 0.9;
        assert!(matches!(cfg.validate(), Err(DreamError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_saturation_rejected() {
        let mut cfg = Config::default();
        cfg.confidence.keyword_saturation = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_max_complexity_rejected() {
        let mut cfg = Config::default();
        cfg.symbol.max_complexity = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_lexicon_override_weights_checked() {
        for bad in [f64::NAN, f64::INFINITY, 7.5, -1.5] {
            let mut cfg = Config::default();
            cfg.lexicon.valence.insert("hallway".to_string(), bad);
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains("lexicon.valence.hallway"), "{err}");
        }
        let mut cfg = Config::default();
        cfg.lexicon.energy.insert("hallway".to_string(), -1.0);
        cfg.lexicon.energy.insert("quiet".to_string(), 0.0);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"engine": {"max_conflict_retries": 9}}"#).unwrap();
        assert_eq!(cfg.engine.max_conflict_retries, 9);
        assert_eq!(cfg.classifier, ClassifierConfig::default());
    }
}
