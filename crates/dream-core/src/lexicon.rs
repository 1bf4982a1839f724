//! Fixed keyword and affect dictionaries.
//!
//! Two keyword lexicons drive the axis evidence: valence (positive weight =
//! Upper, negative = Downer) and energy (positive = Dynamic, negative =
//! Static). A separate affect lexicon feeds the general sentiment estimate
//! with `(polarity, arousal)` pairs. All tables are built once and are
//! immutable afterwards; overrides come from configuration at startup.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use crate::constants::KEYWORD_INCREMENT;

const UPPER_WORDS: &[&str] = &[
    "flying", "fly", "flew", "soaring", "soar", "light", "bright", "laughing", "laughed",
    "happy", "happily", "joy", "joyful", "joyfully", "love", "loved", "celebration",
    "success", "winning", "won", "beautiful", "wonderful", "amazing", "peaceful", "calm",
    "serene", "blissful", "euphoric", "radiant", "golden", "warm", "sunny", "free",
    "smiling", "safe",
];

const DOWNER_WORDS: &[&str] = &[
    "falling", "fell", "dark", "darkness", "scary", "scared", "fear", "afraid", "nightmare",
    "death", "dead", "dying", "crying", "cried", "sad", "angry", "lost", "trapped",
    "drowning", "monster", "shadow", "shadows", "blood", "pain", "hurt", "broken", "empty",
    "alone", "hopeless", "terrified", "cold", "screaming",
];

const DYNAMIC_WORDS: &[&str] = &[
    "running", "ran", "run", "chasing", "chased", "moving", "racing", "jumping", "jumped",
    "dancing", "danced", "fighting", "fought", "flying", "fly", "flew", "swimming", "swam",
    "climbing", "rushing", "spinning", "whirling", "exploding", "crashing", "thundering",
    "storming", "vibrating", "shaking", "falling", "fell", "soaring", "screaming", "fleeing",
];

const STATIC_WORDS: &[&str] = &[
    "sitting", "sat", "sit", "standing", "stood", "waiting", "waited", "watching",
    "staring", "frozen", "froze", "still", "motionless", "calm", "peaceful", "quiet",
    "silent", "empty", "void", "meditation", "sleeping", "asleep", "resting", "lying",
    "contemplating", "observing", "stuck", "trapped",
];

/// `(word, polarity, arousal)`.
const AFFECT_WORDS: &[(&str, f64, f64)] = &[
    ("joy", 0.8, 0.6),
    ("joyful", 0.8, 0.6),
    ("joyfully", 0.8, 0.6),
    ("happy", 0.8, 0.5),
    ("happily", 0.8, 0.5),
    ("love", 0.7, 0.4),
    ("loved", 0.7, 0.4),
    ("wonderful", 0.9, 0.5),
    ("amazing", 0.8, 0.6),
    ("beautiful", 0.85, 0.3),
    ("bright", 0.6, 0.3),
    ("good", 0.6, 0.1),
    ("great", 0.8, 0.4),
    ("nice", 0.5, 0.0),
    ("excited", 0.7, 0.9),
    ("thrilled", 0.8, 0.9),
    ("calm", 0.3, -0.7),
    ("peaceful", 0.5, -0.7),
    ("serene", 0.5, -0.7),
    ("relaxed", 0.4, -0.6),
    ("safe", 0.5, -0.4),
    ("free", 0.5, 0.4),
    ("warm", 0.4, -0.2),
    ("funny", 0.4, 0.5),
    ("bad", -0.7, 0.1),
    ("awful", -0.9, 0.4),
    ("terrible", -0.9, 0.5),
    ("horrible", -0.9, 0.6),
    ("sad", -0.6, -0.4),
    ("lonely", -0.5, -0.5),
    ("alone", -0.3, -0.4),
    ("dark", -0.4, -0.2),
    ("empty", -0.4, -0.5),
    ("frozen", -0.3, -0.6),
    ("cold", -0.3, -0.3),
    ("hopeless", -0.8, -0.5),
    ("tired", -0.3, -0.7),
    ("bored", -0.4, -0.8),
    ("scared", -0.7, 0.8),
    ("afraid", -0.6, 0.7),
    ("terrified", -0.9, 0.9),
    ("angry", -0.6, 0.8),
    ("furious", -0.8, 0.9),
    ("anxious", -0.5, 0.7),
    ("panic", -0.7, 0.9),
    ("hurt", -0.6, 0.3),
    ("pain", -0.6, 0.4),
    ("strange", -0.1, 0.2),
    ("weird", -0.2, 0.3),
];

const INTENSIFIERS: &[&str] = &[
    "very", "so", "really", "extremely", "incredibly", "deeply", "totally", "utterly",
];

/// Typed word → weight table. Weights are clamped to `[-1, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lexicon {
    weights: HashMap<String, f64>,
}

impl Lexicon {
    /// Build a lexicon where `positive` words weigh `+increment` and
    /// `negative` words weigh `-increment`. A word listed on both sides
    /// cancels out and is dropped.
    pub fn polar(positive: &[&str], negative: &[&str], increment: f64) -> Self {
        let mut weights: HashMap<String, f64> = HashMap::new();
        for word in positive {
            *weights.entry((*word).to_string()).or_default() += increment;
        }
        for word in negative {
            *weights.entry((*word).to_string()).or_default() -= increment;
        }
        weights.retain(|_, w| *w != 0.0);
        for w in weights.values_mut() {
            *w = w.clamp(-1.0, 1.0);
        }
        Self { weights }
    }

    /// Insert or replace entries. A zero weight removes the word.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, f64>) {
        for (word, weight) in overrides {
            let word = word.to_lowercase();
            if *weight == 0.0 {
                self.weights.remove(&word);
            } else {
                self.weights.insert(word, weight.clamp(-1.0, 1.0));
            }
        }
    }

    pub fn weight(&self, token: &str) -> Option<f64> {
        self.weights.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Polarity and arousal of one affect word, both in `[-1, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affect {
    pub polarity: f64,
    pub arousal: f64,
}

#[derive(Clone, Debug, Default)]
pub struct AffectLexicon {
    entries: HashMap<String, Affect>,
}

impl AffectLexicon {
    pub fn get(&self, token: &str) -> Option<Affect> {
        self.entries.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static VALENCE: LazyLock<Lexicon> =
    LazyLock::new(|| Lexicon::polar(UPPER_WORDS, DOWNER_WORDS, KEYWORD_INCREMENT));

static ENERGY: LazyLock<Lexicon> =
    LazyLock::new(|| Lexicon::polar(DYNAMIC_WORDS, STATIC_WORDS, KEYWORD_INCREMENT));

static AFFECT: LazyLock<AffectLexicon> = LazyLock::new(|| AffectLexicon {
    entries: AFFECT_WORDS
        .iter()
        .map(|(word, polarity, arousal)| {
            (
                (*word).to_string(),
                Affect {
                    polarity: *polarity,
                    arousal: *arousal,
                },
            )
        })
        .collect(),
});

/// Built-in valence lexicon (Upper positive, Downer negative).
pub fn default_valence() -> &'static Lexicon {
    &VALENCE
}

/// Built-in energy lexicon (Dynamic positive, Static negative).
pub fn default_energy() -> &'static Lexicon {
    &ENERGY
}

pub fn default_affect() -> &'static AffectLexicon {
    &AFFECT
}

pub fn is_intensifier(token: &str) -> bool {
    INTENSIFIERS.contains(&token)
}
