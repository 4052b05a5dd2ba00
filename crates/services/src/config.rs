use std::env;
use std::time::Duration;

use walkthrough_core::drill::PhraseMatch;

const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_PERSIST_ATTEMPTS: u32 = 3;

/// Tunables for resolution, persistence and grading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound for one script resolution, both lookups included.
    pub resolve_timeout: Duration,
    /// Upper bound for a single persistence write.
    pub persist_timeout: Duration,
    /// Tries per write before giving up with a warning. At least 1.
    pub persist_attempts: u32,
    pub phrase_match: PhraseMatch,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolve_timeout: Duration::from_millis(DEFAULT_RESOLVE_TIMEOUT_MS),
            persist_timeout: Duration::from_millis(DEFAULT_PERSIST_TIMEOUT_MS),
            persist_attempts: DEFAULT_PERSIST_ATTEMPTS,
            phrase_match: PhraseMatch::default(),
        }
    }
}

impl EngineConfig {
    /// Reads `WALKTHROUGH_*` variables, keeping defaults for anything unset
    /// or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with a custom variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let resolve_timeout = parse_var(&lookup, "WALKTHROUGH_RESOLVE_TIMEOUT_MS")
            .map_or(defaults.resolve_timeout, Duration::from_millis);
        let persist_timeout = parse_var(&lookup, "WALKTHROUGH_PERSIST_TIMEOUT_MS")
            .map_or(defaults.persist_timeout, Duration::from_millis);
        let persist_attempts = parse_var::<u32>(&lookup, "WALKTHROUGH_PERSIST_ATTEMPTS")
            .map_or(defaults.persist_attempts, |n| n.max(1));
        let phrase_match =
            parse_var(&lookup, "WALKTHROUGH_PHRASE_MODE").unwrap_or(defaults.phrase_match);

        Self {
            resolve_timeout,
            persist_timeout,
            persist_attempts,
            phrase_match,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
