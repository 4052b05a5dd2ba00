use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use storage::repository::{ProgressRepository, StorageError};
use walkthrough_core::model::{
    DrillKind, LearnerId, MasteredEvent, ProgressRecord, ProgressSummary, ScriptId,
};

use crate::Clock;
use crate::config::EngineConfig;
use crate::error::{PersistenceWarning, ProgressError};

/// Result of marking a drill complete.
#[derive(Debug)]
pub struct Completion {
    /// `false` when the drill was already complete; nothing else happened.
    pub newly_completed: bool,
    /// Set exactly once per learner and script, on the last completion.
    pub mastered: Option<MasteredEvent>,
    /// Set when the write could not be persisted; the completion still counts.
    pub warning: Option<PersistenceWarning>,
}

/// Tracks drill completions for one learner and script.
///
/// The local record is authoritative for the session. Every first-time
/// completion is written through; writes that keep failing are held as
/// pending until `flush` succeeds.
pub struct ProgressAggregator {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    persist_timeout: Duration,
    persist_attempts: u32,
    record: ProgressRecord,
    unsaved: bool,
    unsaved_mastery: Option<MasteredEvent>,
}

impl ProgressAggregator {
    /// Loads the stored record, or starts an empty one.
    ///
    /// Loading never raises a mastered event, even for a record whose drills
    /// are all complete.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the read fails or times out.
    pub async fn load(
        config: &EngineConfig,
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        learner_id: LearnerId,
        script_id: ScriptId,
    ) -> Result<Self, ProgressError> {
        let stored = tokio::time::timeout(
            config.persist_timeout,
            progress.load_progress(&learner_id, &script_id),
        )
        .await
        .map_err(|_| StorageError::Timeout)??;

        let record = match stored {
            Some(record) => record,
            None => {
                tracing::debug!(
                    learner = %learner_id,
                    script = %script_id,
                    "starting new progress record"
                );
                ProgressRecord::empty(learner_id, script_id)
            }
        };

        Ok(Self {
            clock,
            progress,
            persist_timeout: config.persist_timeout,
            persist_attempts: config.persist_attempts.max(1),
            record,
            unsaved: false,
            unsaved_mastery: None,
        })
    }

    #[must_use]
    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        self.record.summary()
    }

    #[must_use]
    pub fn is_complete(&self, kind: DrillKind) -> bool {
        self.record.is_complete(kind)
    }

    #[must_use]
    pub fn all_complete(&self) -> bool {
        self.record.all_complete()
    }

    /// Whether some completion or the mastery flag still awaits a write.
    #[must_use]
    pub fn has_pending_writes(&self) -> bool {
        self.unsaved || self.unsaved_mastery.is_some()
    }

    /// Marks `kind` complete and persists it.
    ///
    /// Idempotent: a kind that is already complete changes nothing and
    /// writes nothing.
    pub async fn mark_complete(&mut self, kind: DrillKind) -> Completion {
        let now = self.clock.now();
        if !self.record.mark_complete(kind, now) {
            return Completion {
                newly_completed: false,
                mastered: None,
                warning: None,
            };
        }
        self.unsaved = true;
        tracing::info!(
            learner = %self.record.learner_id(),
            script = %self.record.script_id(),
            drill = %kind,
            "drill completed"
        );

        let mastered = if self.record.mark_mastered(now) {
            let event = MasteredEvent {
                learner_id: self.record.learner_id().clone(),
                script_id: self.record.script_id().clone(),
                mastered_at: now,
            };
            tracing::info!(
                learner = %event.learner_id,
                script = %event.script_id,
                "script mastered"
            );
            self.unsaved_mastery = Some(event.clone());
            Some(event)
        } else {
            None
        };

        let warning = self.flush().await.err();
        Completion {
            newly_completed: true,
            mastered,
            warning,
        }
    }

    /// Retries any writes that failed earlier.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceWarning` if a write still fails; the pending state
    /// is kept for the next call.
    pub async fn flush(&mut self) -> Result<(), PersistenceWarning> {
        let repo = self.progress.as_ref();

        // Each write stands alone: a stored mastery flag keeps the event from
        // firing again even when the completions could not be saved.
        let saved = if self.unsaved {
            let record = &self.record;
            with_retry(
                self.persist_timeout,
                self.persist_attempts,
                "save progress",
                move || repo.save_progress(record),
            )
            .await
        } else {
            Ok(())
        };
        if saved.is_ok() {
            self.unsaved = false;
        }

        let recorded = match &self.unsaved_mastery {
            Some(event) => {
                with_retry(
                    self.persist_timeout,
                    self.persist_attempts,
                    "record mastery",
                    move || repo.record_mastery(event),
                )
                .await
            }
            None => Ok(()),
        };
        if recorded.is_ok() {
            self.unsaved_mastery = None;
        }

        saved.and(recorded)
    }
}

async fn with_retry<F, Fut>(
    timeout: Duration,
    attempts: u32,
    operation: &'static str,
    mut write: F,
) -> Result<(), PersistenceWarning>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StorageError>>,
{
    let mut last = StorageError::Timeout;
    for attempt in 1..=attempts {
        last = match tokio::time::timeout(timeout, write()).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(_) => StorageError::Timeout,
        };
        tracing::warn!(operation, attempt, attempts, error = %last, "persistence write failed");
    }
    Err(PersistenceWarning {
        operation,
        attempts,
        source: last,
    })
}
