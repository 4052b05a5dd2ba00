//! Turns step text into fill-in-the-blank lines.
//!
//! Tokens are matched case-insensitively and anchored on word boundaries.
//! When several tokens could match at the same position the longest one wins
//! (alternatives are tried longest first), and the scan is left to right
//! without overlaps, so a later token can never split an earlier blank.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::text::fold;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClozeError {
    #[error("blank pattern could not be compiled: {0}")]
    Pattern(#[from] regex::Error),
}

//
// ─── CLOZE LINE ────────────────────────────────────────────────────────────────
//

/// One piece of a blanked template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Segment {
    /// Text shown as-is.
    Literal { text: String },
    /// Input box; `index` points into [`ClozeLine::answers`].
    Blank { index: usize },
}

/// A step's text split into literal runs and blanks.
///
/// A line without blanks is valid: it is displayed as plain, ungraded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClozeLine {
    template: Vec<Segment>,
    answers: Vec<String>,
}

impl ClozeLine {
    /// A line with no blanks.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let template = if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Literal { text }]
        };
        Self {
            template,
            answers: Vec::new(),
        }
    }

    #[must_use]
    pub fn template(&self) -> &[Segment] {
        &self.template
    }

    /// Expected answers, in order of appearance in the text.
    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    #[must_use]
    pub fn blank_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn has_blanks(&self) -> bool {
        !self.answers.is_empty()
    }

    /// Fills every blank with the value at its index.
    ///
    /// Missing values leave the blank empty.
    #[must_use]
    pub fn reconstruct<S: AsRef<str>>(&self, fills: &[S]) -> String {
        let mut out = String::new();
        for segment in &self.template {
            match segment {
                Segment::Literal { text } => out.push_str(text),
                Segment::Blank { index } => {
                    if let Some(fill) = fills.get(*index) {
                        out.push_str(fill.as_ref());
                    }
                }
            }
        }
        out
    }

    /// Renders the line with every blank replaced by `placeholder`.
    #[must_use]
    pub fn masked(&self, placeholder: &str) -> String {
        let mut out = String::new();
        for segment in &self.template {
            match segment {
                Segment::Literal { text } => out.push_str(text),
                Segment::Blank { .. } => out.push_str(placeholder),
            }
        }
        out
    }

    /// Grades each blank: trimmed, case-folded equality with the answer.
    ///
    /// The result always has one entry per blank; a missing entry is wrong.
    #[must_use]
    pub fn grade<S: AsRef<str>>(&self, entries: &[S]) -> Vec<bool> {
        self.answers
            .iter()
            .enumerate()
            .map(|(i, answer)| {
                entries
                    .get(i)
                    .is_some_and(|entry| fold(entry.as_ref()) == fold(answer))
            })
            .collect()
    }
}

//
// ─── BUILDER ───────────────────────────────────────────────────────────────────
//

/// Replaces every match of `tokens` in `text` with a blank.
///
/// Blank tokens and case-insensitive duplicates are ignored. Answers hold the
/// matched text as it appears, so `reconstruct(answers())` yields `text`.
///
/// # Errors
///
/// Returns `ClozeError::Pattern` if the combined pattern exceeds the regex
/// size limits.
pub fn build_blanks<S: AsRef<str>>(text: &str, tokens: &[S]) -> Result<ClozeLine, ClozeError> {
    let Some(pattern) = token_pattern(tokens) else {
        return Ok(ClozeLine::plain(text));
    };
    let re = Regex::new(&pattern)?;

    let mut template = Vec::new();
    let mut answers = Vec::new();
    let mut cursor = 0;
    for m in re.find_iter(text) {
        if m.start() > cursor {
            template.push(Segment::Literal {
                text: text[cursor..m.start()].to_string(),
            });
        }
        template.push(Segment::Blank {
            index: answers.len(),
        });
        answers.push(m.as_str().to_string());
        cursor = m.end();
    }
    if cursor < text.len() {
        template.push(Segment::Literal {
            text: text[cursor..].to_string(),
        });
    }

    Ok(ClozeLine { template, answers })
}

/// Builds `(?i)(?:alt|alt|...)` with longest tokens first.
///
/// Returns `None` when no usable token remains.
fn token_pattern<S: AsRef<str>>(tokens: &[S]) -> Option<String> {
    let mut seen = HashSet::new();
    let mut unique: Vec<&str> = tokens
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect();
    if unique.is_empty() {
        return None;
    }
    unique.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));

    let alternatives: Vec<String> = unique.into_iter().map(anchored).collect();
    Some(format!("(?i)(?:{})", alternatives.join("|")))
}

// A boundary is only meaningful next to a word character; `\b(ABS)` would
// never match after a space.
fn anchored(token: &str) -> String {
    let starts_word = token.chars().next().is_some_and(is_word_char);
    let ends_word = token.chars().last().is_some_and(is_word_char);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(token),
        if ends_word { r"\b" } else { "" },
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

//
// ─── AUTO TOKENS ───────────────────────────────────────────────────────────────
//

const UNITS: &str = "psi|mph|inches|inch|feet|foot|ft|pounds|lbs|lb|degrees|seconds|minutes|quarts|quart|gallons|gallon|percent|volts|amps";

/// Phrases worth blanking even without a number next to them.
const VOCABULARY: &[&str] = &[
    // engine state
    "engine off",
    "engine on",
    "engine running",
    "engine idling",
    "key on",
    "key off",
    "ignition on",
    "ignition off",
    // brake types
    "air brakes",
    "air brake",
    "hydraulic brakes",
    "parking brake",
    "service brake",
    "spring brakes",
    "emergency brake",
    "trailer brakes",
    "low air warning",
];

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b\d+(?:\.\d+)?\s?(?:(?:{UNITS})\b|%)"))
        .expect("quantity pattern is valid")
});

static PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = token_pattern(VOCABULARY).unwrap_or_default();
    Regex::new(&pattern).expect("vocabulary pattern is valid")
});

/// Best-effort tokens for a step that has none: quantities with a unit and
/// known engine-state/brake phrases.
///
/// Ordered by position in the text, case-insensitive duplicates removed.
/// May be empty.
#[must_use]
pub fn auto_tokens(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = QUANTITY
        .find_iter(text)
        .chain(PHRASES.find_iter(text))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    found.sort_by_key(|(start, _)| *start);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(_, token)| seen.insert(token.to_lowercase()))
        .map(|(_, token)| token.to_string())
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
