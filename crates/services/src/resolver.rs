use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use storage::repository::{ScriptRepository, StorageError};
use walkthrough_core::model::{OrgId, Script, ScriptDraft, ScriptId};

use crate::error::ResolveError;

/// Where a resolved script came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptSource {
    Organization,
    Default,
}

/// A validated script plus its origin.
#[derive(Debug, Clone)]
pub struct ResolvedScript {
    pub script: Arc<Script>,
    pub source: ScriptSource,
}

/// Picks the script variant that applies to a learner.
///
/// An organization's script replaces the default for its class code as a
/// whole; fields are never merged. An organization script with no steps is
/// treated as absent.
#[derive(Clone)]
pub struct ScriptResolver {
    scripts: Arc<dyn ScriptRepository>,
    timeout: Duration,
}

impl ScriptResolver {
    #[must_use]
    pub fn new(scripts: Arc<dyn ScriptRepository>, timeout: Duration) -> Self {
        Self { scripts, timeout }
    }

    /// Resolves the script for `script_id`, preferring `org_id`'s variant.
    ///
    /// Returns `Ok(None)` when neither an organization nor a default script
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::ResolutionFailed` if storage fails or does not
    /// answer within the timeout, and `ResolveError::Invalid` if the chosen
    /// script does not validate.
    pub async fn resolve(
        &self,
        script_id: &ScriptId,
        org_id: Option<&OrgId>,
    ) -> Result<Option<ResolvedScript>, ResolveError> {
        let found = tokio::time::timeout(self.timeout, self.lookup(script_id, org_id))
            .await
            .map_err(|_| {
                tracing::warn!(script = %script_id, "script resolution timed out");
                StorageError::Timeout
            })??;

        let Some((draft, source)) = found else {
            tracing::debug!(script = %script_id, "no script for class code");
            return Ok(None);
        };

        let script = draft.validate().inspect_err(|e| {
            tracing::warn!(script = %script_id, ?source, error = %e, "stored script is invalid");
        })?;
        tracing::debug!(script = %script_id, ?source, "resolved script");
        Ok(Some(ResolvedScript {
            script: Arc::new(script),
            source,
        }))
    }

    async fn lookup(
        &self,
        script_id: &ScriptId,
        org_id: Option<&OrgId>,
    ) -> Result<Option<(ScriptDraft, ScriptSource)>, StorageError> {
        if let Some(org_id) = org_id {
            match self.scripts.org_script(org_id, script_id).await? {
                Some(draft) if !draft.is_empty() => {
                    return Ok(Some((draft, ScriptSource::Organization)));
                }
                Some(_) => {
                    tracing::debug!(
                        org = %org_id,
                        script = %script_id,
                        "ignoring empty org script"
                    );
                }
                None => {}
            }
        }

        Ok(self
            .scripts
            .default_script(script_id)
            .await?
            .map(|draft| (draft, ScriptSource::Default)))
    }
}
