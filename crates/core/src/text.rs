//! Answer normalization shared by the drill engines.
//!
//! Every comparison in the engine is one of these folds followed by a plain
//! string equality or containment check. There is no fuzzy matching.

/// Trims and case-folds a value.
#[must_use]
pub fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Case-folds and collapses every run of whitespace into a single space.
///
/// Leading and trailing whitespace is dropped.
#[must_use]
pub fn fold_collapsed(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like [`fold_collapsed`] but removes punctuation first.
///
/// Punctuation is dropped rather than replaced, so `"left-side"` and
/// `"leftside"` compare equal.
#[must_use]
pub fn fold_without_punctuation(s: &str) -> String {
    let stripped: String = s.chars().filter(|c| !is_punctuation(*c)).collect();
    fold_collapsed(&stripped)
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '‘' | '’' | '“' | '”' | '–' | '—' | '…')
}
