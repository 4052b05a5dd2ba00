use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use walkthrough_core::model::{
    LearnerId, MasteredEvent, OrgId, ParseIdError, ProgressRecord, ScriptDraft, ScriptId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage did not answer in time")]
    Timeout,
}

/// Where scripts live: one default per class code, plus optional
/// per-organization replacements.
///
/// Returns raw drafts; validation belongs to the caller.
#[async_trait]
pub trait ScriptRepository: Send + Sync {
    /// Organization-specific script for a class code.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup itself fails.
    async fn org_script(
        &self,
        org_id: &OrgId,
        script_id: &ScriptId,
    ) -> Result<Option<ScriptDraft>, StorageError>;

    /// Global default script for a class code.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup itself fails.
    async fn default_script(&self, script_id: &ScriptId)
    -> Result<Option<ScriptDraft>, StorageError>;

    /// Stores or replaces an organization's script for `draft.class_code`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for a blank class code, or other
    /// storage errors.
    async fn upsert_org_script(
        &self,
        org_id: &OrgId,
        draft: &ScriptDraft,
    ) -> Result<(), StorageError>;

    /// Stores or replaces the default script for `draft.class_code`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for a blank class code, or other
    /// storage errors.
    async fn upsert_default_script(&self, draft: &ScriptDraft) -> Result<(), StorageError>;

    /// Class codes a learner of `org_id` can pick from, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn class_codes(&self, org_id: Option<&OrgId>) -> Result<Vec<ScriptId>, StorageError>;
}

/// Per-learner drill progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn load_progress(
        &self,
        learner_id: &LearnerId,
        script_id: &ScriptId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Persists the completions in `record`.
    ///
    /// Completions already stored keep their original timestamp; nothing is
    /// ever removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;

    /// Writes the mastery flag. A second write for the same pair is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn record_mastery(&self, event: &MasteredEvent) -> Result<(), StorageError>;
}

pub(crate) fn class_code_of(draft: &ScriptDraft) -> Result<ScriptId, StorageError> {
    draft
        .class_code
        .parse()
        .map_err(|e: ParseIdError| StorageError::Serialization(e.to_string()))
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    defaults: Arc<Mutex<HashMap<ScriptId, ScriptDraft>>>,
    overrides: Arc<Mutex<HashMap<(OrgId, ScriptId), ScriptDraft>>>,
    progress: Arc<Mutex<HashMap<(LearnerId, ScriptId), ProgressRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ScriptRepository for InMemoryRepository {
    async fn org_script(
        &self,
        org_id: &OrgId,
        script_id: &ScriptId,
    ) -> Result<Option<ScriptDraft>, StorageError> {
        let guard = self.overrides.lock().map_err(poisoned)?;
        Ok(guard.get(&(org_id.clone(), script_id.clone())).cloned())
    }

    async fn default_script(
        &self,
        script_id: &ScriptId,
    ) -> Result<Option<ScriptDraft>, StorageError> {
        let guard = self.defaults.lock().map_err(poisoned)?;
        Ok(guard.get(script_id).cloned())
    }

    async fn upsert_org_script(
        &self,
        org_id: &OrgId,
        draft: &ScriptDraft,
    ) -> Result<(), StorageError> {
        let key = (org_id.clone(), class_code_of(draft)?);
        let mut guard = self.overrides.lock().map_err(poisoned)?;
        guard.insert(key, draft.clone());
        Ok(())
    }

    async fn upsert_default_script(&self, draft: &ScriptDraft) -> Result<(), StorageError> {
        let key = class_code_of(draft)?;
        let mut guard = self.defaults.lock().map_err(poisoned)?;
        guard.insert(key, draft.clone());
        Ok(())
    }

    async fn class_codes(&self, org_id: Option<&OrgId>) -> Result<Vec<ScriptId>, StorageError> {
        let mut codes: Vec<ScriptId> = self
            .defaults
            .lock()
            .map_err(poisoned)?
            .keys()
            .cloned()
            .collect();
        if let Some(org_id) = org_id {
            let guard = self.overrides.lock().map_err(poisoned)?;
            codes.extend(
                guard
                    .keys()
                    .filter(|(org, _)| org == org_id)
                    .map(|(_, code)| code.clone()),
            );
        }
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(
        &self,
        learner_id: &LearnerId,
        script_id: &ScriptId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(learner_id.clone(), script_id.clone())).cloned())
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let key = (record.learner_id().clone(), record.script_id().clone());
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let stored = guard.entry(key).or_insert_with(|| {
            ProgressRecord::empty(record.learner_id().clone(), record.script_id().clone())
        });
        for (kind, at) in record.completions() {
            stored.mark_complete(kind, at);
        }
        Ok(())
    }

    async fn record_mastery(&self, event: &MasteredEvent) -> Result<(), StorageError> {
        let key = (event.learner_id.clone(), event.script_id.clone());
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let stored = guard.entry(key).or_insert_with(|| {
            ProgressRecord::empty(event.learner_id.clone(), event.script_id.clone())
        });
        if stored.mastered_at().is_none() {
            *stored = ProgressRecord::from_persisted(
                event.learner_id.clone(),
                event.script_id.clone(),
                stored.completions(),
                Some(event.mastered_at),
            );
        }
        Ok(())
    }
}

/// Aggregates script and progress repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub scripts: Arc<dyn ScriptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let scripts: Arc<dyn ScriptRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { scripts, progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkthrough_core::model::{DrillKind, SectionDraft, StepDraft};
    use walkthrough_core::time::fixed_now;

    fn draft(code: &str, text: &str) -> ScriptDraft {
        ScriptDraft {
            class_code: code.into(),
            sections: vec![SectionDraft {
                title: "Engine".into(),
                critical: false,
                steps: vec![StepDraft {
                    id: "e1".into(),
                    label: None,
                    text: text.into(),
                    must_say: false,
                    pass_fail: false,
                    tokens: None,
                }],
            }],
            recall_prompts: Vec::new(),
        }
    }

    #[tokio::test]
    async fn stores_defaults_and_overrides_separately() {
        let repo = InMemoryRepository::new();
        let org = OrgId::new("school");
        let code = ScriptId::new("A");
        repo.upsert_default_script(&draft("A", "default"))
            .await
            .unwrap();
        repo.upsert_org_script(&org, &draft("A", "override"))
            .await
            .unwrap();

        let default = repo.default_script(&code).await.unwrap().unwrap();
        let custom = repo.org_script(&org, &code).await.unwrap().unwrap();
        assert_eq!(default.sections[0].steps[0].text, "default");
        assert_eq!(custom.sections[0].steps[0].text, "override");
        assert!(
            repo.org_script(&OrgId::new("other"), &code)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn blank_class_code_is_rejected() {
        let repo = InMemoryRepository::new();
        let err = repo
            .upsert_default_script(&draft("  ", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn class_codes_merge_org_and_defaults() {
        let repo = InMemoryRepository::new();
        let org = OrgId::new("school");
        repo.upsert_default_script(&draft("A", "x")).await.unwrap();
        repo.upsert_default_script(&draft("B", "x")).await.unwrap();
        repo.upsert_org_script(&org, &draft("P", "x"))
            .await
            .unwrap();
        repo.upsert_org_script(&org, &draft("A", "x"))
            .await
            .unwrap();

        let codes = repo.class_codes(Some(&org)).await.unwrap();
        assert_eq!(
            codes,
            [ScriptId::new("A"), ScriptId::new("B"), ScriptId::new("P")]
        );
        assert_eq!(repo.class_codes(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn save_progress_keeps_first_completion_time() {
        let repo = InMemoryRepository::new();
        let learner = LearnerId::new("l1");
        let script = ScriptId::new("A");
        let now = fixed_now();

        let mut first = ProgressRecord::empty(learner.clone(), script.clone());
        first.mark_complete(DrillKind::FillCloze, now);
        repo.save_progress(&first).await.unwrap();

        let mut second = ProgressRecord::empty(learner.clone(), script.clone());
        second.mark_complete(DrillKind::FillCloze, now + chrono::Duration::hours(1));
        second.mark_complete(DrillKind::OrderSteps, now);
        repo.save_progress(&second).await.unwrap();

        let stored = repo
            .load_progress(&learner, &script)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.completed_at(DrillKind::FillCloze), Some(now));
        assert!(stored.is_complete(DrillKind::OrderSteps));
    }
}
