//! Interactive memorization drills.
//!
//! Every drill runs the same state machine: it starts `Idle`, each submission
//! is graded, and the first fully correct submission moves it to `Complete`.
//! `Complete` is terminal. Later submissions are answered without grading and
//! never report a second completion; mutations of a drill's working state are
//! rejected with `DrillError::Completed`.

use thiserror::Error;

use crate::cloze::ClozeError;
use crate::model::DrillKind;

mod fill_cloze;
mod order_steps;
mod type_phrase;
mod visual_recall;

pub use fill_cloze::FillClozeDrill;
pub use order_steps::OrderStepsDrill;
pub use type_phrase::{PhraseMatch, TypePhraseDrill};
pub use visual_recall::VisualRecallDrill;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DrillError {
    #[error("drill is already complete")]
    Completed,

    #[error("nothing to grade for {0}")]
    NothingToGrade(DrillKind),

    #[error("position {index} is out of range for {len} steps")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("attempt does not belong to the {expected} drill")]
    AttemptMismatch { expected: DrillKind },

    #[error(transparent)]
    Cloze(#[from] ClozeError),
}

//
// ─── VERDICT ───────────────────────────────────────────────────────────────────
//

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    pub message: String,
    /// Set only on the submission that completed the drill.
    pub newly_completed: bool,
}

impl Verdict {
    fn already_complete() -> Self {
        Self {
            correct: true,
            message: "Already complete. Nice work.".into(),
            newly_completed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrillStatus {
    #[default]
    Idle,
    Complete,
}

/// Status bookkeeping shared by the four engines.
#[derive(Debug, Clone, Default)]
pub(crate) struct DrillState {
    status: DrillStatus,
    attempts: u32,
}

impl DrillState {
    pub(crate) fn is_complete(&self) -> bool {
        self.status == DrillStatus::Complete
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn ensure_open(&self) -> Result<(), DrillError> {
        if self.is_complete() {
            return Err(DrillError::Completed);
        }
        Ok(())
    }

    /// Grades once unless already complete.
    ///
    /// `grade` returns `None` when the attempt is correct, or the message to
    /// show otherwise.
    pub(crate) fn settle(
        &mut self,
        kind: DrillKind,
        grade: impl FnOnce() -> Option<String>,
    ) -> Verdict {
        if self.is_complete() {
            return Verdict::already_complete();
        }
        self.attempts = self.attempts.saturating_add(1);
        match grade() {
            None => {
                self.status = DrillStatus::Complete;
                Verdict {
                    correct: true,
                    message: format!("{} complete!", kind.title()),
                    newly_completed: true,
                }
            }
            Some(message) => Verdict {
                correct: false,
                message,
                newly_completed: false,
            },
        }
    }
}

//
// ─── DRILL INTERFACE ───────────────────────────────────────────────────────────
//

/// Common surface of the drill engines.
pub trait Drill {
    type Attempt: ?Sized;

    fn kind(&self) -> DrillKind;

    /// Grades an attempt and advances the state machine.
    fn submit(&mut self, attempt: &Self::Attempt) -> Verdict;

    fn is_complete(&self) -> bool;

    /// Number of graded submissions so far.
    fn attempts(&self) -> u32;
}

/// Learner input for whichever drill is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrillAttempt {
    /// One entry per blank, across all lines, in order.
    Blanks(Vec<String>),
    /// Check the order drill's current working copy.
    CheckOrder,
    Phrase(String),
    Answer(String),
}

/// The drill currently hosted by the presentation shell.
#[derive(Debug, Clone)]
pub enum ActiveDrill {
    FillCloze(FillClozeDrill),
    OrderSteps(OrderStepsDrill),
    TypePhrase(TypePhraseDrill),
    VisualRecall(VisualRecallDrill),
}

impl ActiveDrill {
    #[must_use]
    pub fn kind(&self) -> DrillKind {
        match self {
            ActiveDrill::FillCloze(d) => d.kind(),
            ActiveDrill::OrderSteps(d) => d.kind(),
            ActiveDrill::TypePhrase(d) => d.kind(),
            ActiveDrill::VisualRecall(d) => d.kind(),
        }
    }

    /// Dispatches the attempt to the wrapped engine.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::AttemptMismatch` if the attempt is for a
    /// different kind of drill.
    pub fn submit(&mut self, attempt: &DrillAttempt) -> Result<Verdict, DrillError> {
        match (self, attempt) {
            (ActiveDrill::FillCloze(d), DrillAttempt::Blanks(entries)) => Ok(d.submit(entries)),
            (ActiveDrill::OrderSteps(d), DrillAttempt::CheckOrder) => Ok(d.submit(&())),
            (ActiveDrill::TypePhrase(d), DrillAttempt::Phrase(input)) => Ok(d.submit(input)),
            (ActiveDrill::VisualRecall(d), DrillAttempt::Answer(input)) => Ok(d.submit(input)),
            (drill, _) => Err(DrillError::AttemptMismatch {
                expected: drill.kind(),
            }),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self {
            ActiveDrill::FillCloze(d) => d.is_complete(),
            ActiveDrill::OrderSteps(d) => d.is_complete(),
            ActiveDrill::TypePhrase(d) => d.is_complete(),
            ActiveDrill::VisualRecall(d) => d.is_complete(),
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            ActiveDrill::FillCloze(d) => d.attempts(),
            ActiveDrill::OrderSteps(d) => d.attempts(),
            ActiveDrill::TypePhrase(d) => d.attempts(),
            ActiveDrill::VisualRecall(d) => d.attempts(),
        }
    }
}

impl From<FillClozeDrill> for ActiveDrill {
    fn from(d: FillClozeDrill) -> Self {
        ActiveDrill::FillCloze(d)
    }
}

impl From<OrderStepsDrill> for ActiveDrill {
    fn from(d: OrderStepsDrill) -> Self {
        ActiveDrill::OrderSteps(d)
    }
}

impl From<TypePhraseDrill> for ActiveDrill {
    fn from(d: TypePhraseDrill) -> Self {
        ActiveDrill::TypePhrase(d)
    }
}

impl From<VisualRecallDrill> for ActiveDrill {
    fn from(d: VisualRecallDrill) -> Self {
        ActiveDrill::VisualRecall(d)
    }
}
