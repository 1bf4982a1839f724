use crate::constants::{INTENSIFIER_FACTOR, MODIFIER_WINDOW, NEGATION_FACTOR};
use crate::lexicon::{AffectLexicon, is_intensifier};
use crate::tokenizer::is_negator;

/// General affect estimate over a whole text.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SentimentEstimate {
    /// Mean polarity of matched affect words, in `[-1, 1]`.
    pub polarity: f64,
    /// Mean arousal of matched affect words, in `[-1, 1]`.
    pub arousal: f64,
    /// Number of affect words that contributed.
    pub matched: usize,
}

/// Average the affect of every matched word.
///
/// A negator within the preceding window flips polarity and halves it; an
/// intensifier directly before the word scales both components. Arousal
/// keeps its sign under negation ("not excited" is still about excitement,
/// only weaker).
pub fn estimate(tokens: &[String], affect: &AffectLexicon) -> SentimentEstimate {
    let mut polarity_sum = 0.0;
    let mut arousal_sum = 0.0;
    let mut matched = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        let Some(entry) = affect.get(token) else {
            continue;
        };

        let window = &tokens[i.saturating_sub(MODIFIER_WINDOW)..i];
        let negated = window.iter().any(|t| is_negator(t));
        let intensified = i > 0 && is_intensifier(&tokens[i - 1]);

        let mut polarity = entry.polarity;
        let mut arousal = entry.arousal;
        if intensified {
            polarity *= INTENSIFIER_FACTOR;
            arousal *= INTENSIFIER_FACTOR;
        }
        if negated {
            polarity *= NEGATION_FACTOR;
            arousal *= NEGATION_FACTOR.abs();
        }

        polarity_sum += polarity.clamp(-1.0, 1.0);
        arousal_sum += arousal.clamp(-1.0, 1.0);
        matched += 1;
    }

    if matched == 0 {
        return SentimentEstimate::default();
    }

    let n = matched as f64;
    SentimentEstimate {
        polarity: (polarity_sum / n).clamp(-1.0, 1.0),
        arousal: (arousal_sum / n).clamp(-1.0, 1.0),
        matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::default_affect;
    use crate::tokenizer::tokenize;
    use approx::assert_relative_eq;

    fn est(text: &str) -> SentimentEstimate {
        estimate(&tokenize(text), default_affect())
    }

    #[test]
    fn test_neutral_text_is_exactly_zero() {
        let e = est("I was in a hallway");
        assert_eq!(e, SentimentEstimate::default());
    }

    #[test]
    fn test_positive_text() {
        let e = est("a happy and wonderful day");
        assert_relative_eq!(e.polarity, (0.8 + 0.9) / 2.0);
        assert_eq!(e.matched, 2);
    }

    #[test]
    fn test_negation_flips_and_halves() {
        let plain = est("I was happy");
        let negated = est("I was not happy");
        assert_relative_eq!(negated.polarity, plain.polarity * NEGATION_FACTOR);
        assert!(negated.arousal > 0.0);
    }

    #[test]
    fn test_contraction_negates() {
        assert!(est("it wasn't good").polarity < 0.0);
    }

    #[test]
    fn test_curly_apostrophe_negates_like_straight() {
        let straight = est("I wasn't happy in the dream");
        let curly = est("I wasn\u{2019}t happy in the dream");
        assert!(curly.polarity < 0.0);
        assert_eq!(curly, straight);
    }

    #[test]
    fn test_intensifier_scales_but_stays_bounded() {
        let plain = est("wonderful");
        let strong = est("extremely wonderful");
        assert!(strong.polarity > plain.polarity);
        assert!(strong.polarity <= 1.0);
    }

    #[test]
    fn test_negator_outside_window_ignored() {
        let e = est("not that it was so very happy");
        // "not" is four tokens before "happy"
        assert!(e.polarity > 0.0);
    }
}
