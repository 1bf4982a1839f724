use std::collections::BTreeSet;
use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfidenceConfig};
use crate::error::Result;
use crate::extract::{DreamText, Extractor, Signal};
use crate::quadrant::{AxisScore, Quadrant};

/// One classified dream. Created once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedDream {
    pub axis_score: AxisScore,
    pub quadrant: Quadrant,
    pub confidence: f64,
    pub matched_keywords: BTreeSet<String>,
}

/// Immutable after construction; share it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Classifier {
    extractor: Extractor,
    confidence: ConfidenceConfig,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            extractor: Extractor::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

impl Classifier {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: Extractor::new(&config.classifier, &config.lexicon),
            confidence: config.confidence.clone(),
        })
    }

    /// Validate, extract and classify raw text.
    pub fn classify_dream(&self, text: &str) -> Result<ClassifiedDream> {
        let dream = DreamText::new(text)?;
        Ok(self.classify_text(&dream))
    }

    pub fn classify_text(&self, dream: &DreamText) -> ClassifiedDream {
        self.classify(&self.extractor.extract(dream))
    }

    /// Total over every signal: clamps, assigns the quadrant and scores
    /// confidence.
    pub fn classify(&self, signal: &Signal) -> ClassifiedDream {
        let axis_score = AxisScore::clamped(signal.valence_raw, signal.energy_raw);
        ClassifiedDream {
            axis_score,
            quadrant: Quadrant::from_axes(axis_score),
            confidence: self.confidence(axis_score, signal.keywords.len(), signal.word_count),
            matched_keywords: signal.keywords.clone(),
        }
    }

    fn confidence(&self, score: AxisScore, keywords: usize, words: usize) -> f64 {
        let c = &self.confidence;
        let magnitude = (score.magnitude() / SQRT_2).min(1.0);
        let keyword = (keywords as f64 / c.keyword_saturation as f64).min(1.0);
        let length = (words as f64 / c.length_saturation as f64).min(1.0);
        (c.base + c.magnitude_weight * magnitude + c.keyword_weight * keyword + c.length_weight * length)
            .clamp(0.0, 1.0)
    }
}
