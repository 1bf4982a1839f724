use std::collections::BTreeSet;

use crate::config::{AxisBlend, ClassifierConfig, LexiconOverrides};
use crate::error::{DreamError, Result};
use crate::lexicon::{AffectLexicon, Lexicon, default_affect, default_energy, default_valence};
use crate::sentiment::estimate;
use crate::tokenizer::tokenize;

/// Validated dream narrative plus optional keywords asserted by the dreamer.
#[derive(Clone, Debug, PartialEq)]
pub struct DreamText {
    text: String,
    keywords: Vec<String>,
}

impl DreamText {
    /// Rejects empty and whitespace-only text.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DreamError::InvalidInput(
                "dream text is empty".to_string(),
            ));
        }
        Ok(Self {
            text,
            keywords: Vec::new(),
        })
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = keywords
            .into_iter()
            .flat_map(|k| tokenize(k.as_ref()))
            .collect();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Raw extractor output, before clamping and quadrant assignment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signal {
    pub valence_raw: f64,
    pub energy_raw: f64,
    pub keywords: BTreeSet<String>,
    pub word_count: usize,
}

/// Lexical signal extractor: general affect estimate blended with
/// keyword evidence on each axis.
#[derive(Clone, Debug)]
pub struct Extractor {
    valence: Lexicon,
    energy: Lexicon,
    affect: AffectLexicon,
    valence_blend: AxisBlend,
    energy_blend: AxisBlend,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default(), &LexiconOverrides::default())
    }
}

impl Extractor {
    pub fn new(config: &ClassifierConfig, overrides: &LexiconOverrides) -> Self {
        let mut valence = default_valence().clone();
        valence.apply_overrides(&overrides.valence);
        let mut energy = default_energy().clone();
        energy.apply_overrides(&overrides.energy);
        Self {
            valence,
            energy,
            affect: default_affect().clone(),
            valence_blend: config.valence,
            energy_blend: config.energy,
        }
    }

    pub fn extract(&self, dream: &DreamText) -> Signal {
        let tokens = tokenize(dream.text());
        let sentiment = estimate(&tokens, &self.affect);

        // Distinct hits only: repeating a word adds no evidence.
        let mut candidates: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
        candidates.extend(dream.keywords().iter().map(String::as_str));

        let mut keywords = BTreeSet::new();
        let mut valence_hits = 0.0;
        let mut energy_hits = 0.0;
        for word in candidates {
            let v = self.valence.weight(word);
            let e = self.energy.weight(word);
            valence_hits += v.unwrap_or(0.0);
            energy_hits += e.unwrap_or(0.0);
            if v.is_some() || e.is_some() {
                keywords.insert(word.to_string());
            }
        }

        Signal {
            valence_raw: blend(self.valence_blend, sentiment.polarity, valence_hits),
            energy_raw: blend(self.energy_blend, sentiment.arousal, energy_hits),
            keywords,
            word_count: tokens.len(),
        }
    }
}

fn blend(weights: AxisBlend, sentiment: f64, keyword_hits: f64) -> f64 {
    let keyword = keyword_hits.clamp(-1.0, 1.0);
    weights.sentiment_weight * sentiment + weights.keyword_weight * keyword
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_text_rejected() {
        assert!(matches!(DreamText::new(""), Err(DreamError::InvalidInput(_))));
        assert!(matches!(
            DreamText::new(" \n\t "),
            Err(DreamError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_no_signal_is_exactly_zero() {
        let s = Extractor::default().extract(&DreamText::new("I was in a hallway").unwrap());
        assert_eq!(s.valence_raw, 0.0);
        assert_eq!(s.energy_raw, 0.0);
        assert!(s.keywords.is_empty());
        assert_eq!(s.word_count, 5);
    }

    #[test]
    fn test_repeated_keyword_counts_once() {
        let ex = Extractor::default();
        let once = ex.extract(&DreamText::new("falling").unwrap());
        let many = ex.extract(&DreamText::new("falling falling falling falling").unwrap());
        assert_eq!(once.valence_raw, many.valence_raw);
        assert_eq!(once.energy_raw, many.energy_raw);
    }

    #[test]
    fn test_keyword_share_bounded() {
        // Six Downer keywords and no affect words.
        let ex = Extractor::default();
        let s = ex.extract(&DreamText::new("falling death monster shadow blood drowning").unwrap());
        let cfg = ClassifierConfig::default();
        assert_relative_eq!(s.valence_raw, -cfg.valence.keyword_weight);
        assert!(s.valence_raw.abs() <= cfg.keyword_share_cap);
    }

    #[test]
    fn test_user_keywords_join_the_scan() {
        let ex = Extractor::default();
        let plain = ex.extract(&DreamText::new("a hallway").unwrap());
        let tagged =
            ex.extract(&DreamText::new("a hallway").unwrap().with_keywords(["Running"]));
        assert_eq!(plain.energy_raw, 0.0);
        assert!(tagged.energy_raw > 0.0);
        assert!(tagged.keywords.contains("running"));
    }

    #[test]
    fn test_overrides_applied() {
        let overrides = LexiconOverrides {
            valence: BTreeMap::from([("hallway".to_string(), -0.5)]),
            energy: BTreeMap::new(),
        };
        let ex = Extractor::new(&ClassifierConfig::default(), &overrides);
        let s = ex.extract(&DreamText::new("a hallway").unwrap());
        assert!(s.valence_raw < 0.0);
    }

    #[test]
    fn test_negated_sentiment_pulls_down() {
        let ex = Extractor::default();
        let s = ex.extract(&DreamText::new("I was not happy at all").unwrap());
        assert!(s.valence_raw < 0.0, "{}", s.valence_raw);
    }
}
