/// Default share of the general sentiment estimate in the valence blend.
pub const VALENCE_SENTIMENT_WEIGHT: f64 = 0.6;

/// Default share of keyword evidence in the valence blend.
pub const VALENCE_KEYWORD_WEIGHT: f64 = 0.4;

/// Default share of the general arousal estimate in the energy blend.
pub const ENERGY_SENTIMENT_WEIGHT: f64 = 0.4;

/// Default share of keyword evidence in the energy blend.
pub const ENERGY_KEYWORD_WEIGHT: f64 = 0.6;

/// Upper bound on the keyword weight of any axis. Keyword evidence alone can
/// never move a raw score further than this from the sentiment estimate.
pub const KEYWORD_SHARE_CAP: f64 = 0.6;

/// Fixed increment contributed by one distinct lexicon hit.
pub const KEYWORD_INCREMENT: f64 = 0.5;

/// Multiplier applied to an affect word preceded by a negator.
pub const NEGATION_FACTOR: f64 = -0.5;

/// Multiplier applied to an affect word preceded by an intensifier.
pub const INTENSIFIER_FACTOR: f64 = 1.3;

/// How many tokens back a negator or intensifier still applies.
pub const MODIFIER_WINDOW: usize = 2;

/// Confidence floor for a dream with no signal at all.
pub const CONFIDENCE_BASE: f64 = 0.2;

/// Confidence share earned by a maximal axis vector.
pub const CONFIDENCE_MAGNITUDE_WEIGHT: f64 = 0.5;

/// Confidence share earned by keyword evidence.
pub const CONFIDENCE_KEYWORD_WEIGHT: f64 = 0.3;

/// Keyword count at which the keyword share saturates.
pub const CONFIDENCE_KEYWORD_SATURATION: usize = 5;

/// Word count at which the optional length share saturates.
pub const CONFIDENCE_LENGTH_SATURATION: usize = 50;

/// Default cap on symbol complexity.
pub const MAX_COMPLEXITY: u32 = 12;

/// Default number of read-update retries after a lost compare-and-store.
pub const MAX_CONFLICT_RETRIES: u32 = 5;

/// Numerical tolerance for invariant checks on floating-point sums.
pub const EPSILON: f64 = 1e-9;
