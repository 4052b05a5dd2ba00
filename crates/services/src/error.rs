//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use walkthrough_core::drill::DrillError;
use walkthrough_core::model::ScriptValidationError;

/// Errors emitted by `ScriptResolver`.
///
/// A missing script is not an error; `resolve` returns `Ok(None)` for it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// Storage failed or did not answer in time.
    #[error("script resolution failed: {0}")]
    ResolutionFailed(#[from] StorageError),
    /// The stored script is structurally broken.
    #[error("stored script is invalid: {0}")]
    Invalid(#[from] ScriptValidationError),
}

impl ResolveError {
    /// Whether asking again could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::ResolutionFailed(_))
    }

    /// Text for the learner. Never blames them.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            ResolveError::ResolutionFailed(_) => {
                "We couldn't load this walkthrough right now. Please try again in a moment."
            }
            ResolveError::Invalid(_) => {
                "This walkthrough isn't ready yet. Please check back later or contact your instructor."
            }
        }
    }
}

/// Errors emitted while loading progress.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        "We couldn't load your progress right now. Please try again in a moment."
    }
}

/// A completion that is kept locally but could not be written.
///
/// Never fatal: the aggregator keeps the record and retries on `flush`.
#[derive(Debug, Error)]
#[error("could not {operation} after {attempts} attempt(s): {source}")]
pub struct PersistenceWarning {
    pub operation: &'static str,
    pub attempts: u32,
    #[source]
    pub source: StorageError,
}

impl PersistenceWarning {
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        "Your progress is kept on this device and will be saved when the connection is back."
    }
}

/// Errors emitted by practice sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("section {index} does not exist (script has {count})")]
    NoSuchSection { index: usize, count: usize },
    #[error(transparent)]
    Drill(#[from] DrillError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
