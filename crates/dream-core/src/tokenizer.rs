use regex::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s']").unwrap());
static APOSTROPHE_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^'+|'+$").unwrap());

/// Tokenize dream text into lowercase words.
/// Keeps in-word apostrophes so negations like "didn't" survive intact.
/// Typographic apostrophes are folded to `'` first.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = fold_apostrophes(text);
    let cleaned = NON_WORD.replace_all(&folded, " ");
    cleaned
        .to_lowercase()
        .split_whitespace()
        .map(|t| APOSTROPHE_TRIM.replace_all(t, "").to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn fold_apostrophes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}', '\u{02BC}'], "'")
}

/// True for tokens that invert the affect of what follows.
pub fn is_negator(token: &str) -> bool {
    matches!(
        token,
        "not" | "no" | "never" | "nothing" | "nobody" | "without" | "hardly"
    ) || token.ends_with("n't")
}
