use std::sync::Arc;

use rand::Rng;
use storage::repository::{ProgressRepository, Storage};
use walkthrough_core::drill::{
    ActiveDrill, DrillAttempt, FillClozeDrill, OrderStepsDrill, TypePhraseDrill, Verdict,
    VisualRecallDrill,
};
use walkthrough_core::model::{
    DrillKind, LearnerId, MasteredEvent, OrgId, ProgressRecord, ProgressSummary, Script, ScriptId,
    Section,
};

use crate::Clock;
use crate::config::EngineConfig;
use crate::error::{PersistenceWarning, SessionError};
use crate::progress::ProgressAggregator;
use crate::resolver::{ResolvedScript, ScriptResolver, ScriptSource};

/// What one submission produced.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub verdict: Verdict,
    pub progress: ProgressSummary,
    pub mastered: Option<MasteredEvent>,
    pub warning: Option<PersistenceWarning>,
}

/// Starts practice sessions from storage.
#[derive(Clone)]
pub struct PracticeService {
    config: EngineConfig,
    clock: Clock,
    resolver: ScriptResolver,
    progress: Arc<dyn ProgressRepository>,
}

impl PracticeService {
    #[must_use]
    pub fn new(config: EngineConfig, clock: Clock, storage: &Storage) -> Self {
        let resolver = ScriptResolver::new(Arc::clone(&storage.scripts), config.resolve_timeout);
        Self {
            config,
            clock,
            resolver,
            progress: Arc::clone(&storage.progress),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &ScriptResolver {
        &self.resolver
    }

    /// Resolves the learner's script and loads their progress on it.
    ///
    /// Returns `Ok(None)` when no script exists for the class code.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Resolve` or `SessionError::Progress` when
    /// storage fails.
    pub async fn start(
        &self,
        learner_id: LearnerId,
        script_id: &ScriptId,
        org_id: Option<&OrgId>,
    ) -> Result<Option<PracticeSession>, SessionError> {
        let Some(resolved) = self.resolver.resolve(script_id, org_id).await? else {
            return Ok(None);
        };
        let session = self.start_with(learner_id, resolved).await?;
        Ok(Some(session))
    }

    /// Starts a session for an already resolved script.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Progress` if progress cannot be loaded.
    pub async fn start_with(
        &self,
        learner_id: LearnerId,
        resolved: ResolvedScript,
    ) -> Result<PracticeSession, SessionError> {
        let aggregator = ProgressAggregator::load(
            &self.config,
            self.clock,
            Arc::clone(&self.progress),
            learner_id,
            resolved.script.id().clone(),
        )
        .await?;
        Ok(PracticeSession {
            script: resolved.script,
            source: resolved.source,
            config: self.config.clone(),
            aggregator,
        })
    }
}

/// One learner practicing one script.
///
/// Builds drills for a focus section and forwards first-time completions to
/// the progress aggregator. Drills are owned by the caller; dropping one
/// discards its attempt.
pub struct PracticeSession {
    script: Arc<Script>,
    source: ScriptSource,
    config: EngineConfig,
    aggregator: ProgressAggregator,
}

impl PracticeSession {
    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    #[must_use]
    pub fn source(&self) -> ScriptSource {
        self.source
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressRecord {
        self.aggregator.record()
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        self.aggregator.summary()
    }

    /// Builds the drill of `kind` for the section at `focus`.
    ///
    /// Fill-in and ordering use the section's steps. The phrase drill uses
    /// the section's first pass/fail step, else its first step. Visual recall
    /// is script-wide.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSuchSection` for a bad index, or
    /// `SessionError::Drill` if the section has nothing to grade.
    pub fn drill(&self, kind: DrillKind, focus: usize) -> Result<ActiveDrill, SessionError> {
        self.drill_with_rng(kind, focus, &mut rand::rng())
    }

    /// Same as [`PracticeSession::drill`] with a caller-supplied RNG for the
    /// ordering drill's shuffle.
    ///
    /// # Errors
    ///
    /// See [`PracticeSession::drill`].
    pub fn drill_with_rng<R: Rng + ?Sized>(
        &self,
        kind: DrillKind,
        focus: usize,
        rng: &mut R,
    ) -> Result<ActiveDrill, SessionError> {
        let section = self.section(focus)?;
        let drill: ActiveDrill = match kind {
            DrillKind::FillCloze => FillClozeDrill::from_steps(section.steps())?.into(),
            DrillKind::OrderSteps => OrderStepsDrill::with_rng(
                section
                    .steps()
                    .iter()
                    .map(|s| s.text().to_string())
                    .collect(),
                rng,
            )?
            .into(),
            DrillKind::TypePhrase => {
                let step = section
                    .steps()
                    .iter()
                    .find(|s| s.pass_fail())
                    .or_else(|| section.steps().first());
                let phrase = match step {
                    Some(step) => TypePhraseDrill::new(step.text(), self.config.phrase_match)?,
                    None => TypePhraseDrill::from_script(&self.script, self.config.phrase_match)?,
                };
                phrase.into()
            }
            DrillKind::VisualRecall => VisualRecallDrill::from_script(&self.script)?.into(),
        };
        Ok(drill)
    }

    /// Grades `attempt` and records a first-time completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Drill` if the attempt does not fit the drill.
    /// Persistence problems are reported in `SubmitOutcome::warning`.
    pub async fn submit(
        &mut self,
        drill: &mut ActiveDrill,
        attempt: &DrillAttempt,
    ) -> Result<SubmitOutcome, SessionError> {
        let verdict = drill.submit(attempt)?;

        let (mastered, warning) = if verdict.newly_completed {
            let completion = self.aggregator.mark_complete(drill.kind()).await;
            (completion.mastered, completion.warning)
        } else {
            (None, None)
        };

        Ok(SubmitOutcome {
            verdict,
            progress: self.aggregator.summary(),
            mastered,
            warning,
        })
    }

    /// Retries progress writes that failed earlier.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceWarning` if a write still fails.
    pub async fn flush(&mut self) -> Result<(), PersistenceWarning> {
        self.aggregator.flush().await
    }

    #[must_use]
    pub fn has_pending_writes(&self) -> bool {
        self.aggregator.has_pending_writes()
    }

    fn section(&self, index: usize) -> Result<&Section, SessionError> {
        self.script
            .section(index)
            .ok_or(SessionError::NoSuchSection {
                index,
                count: self.script.sections().len(),
            })
    }
}
