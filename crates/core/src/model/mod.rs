mod ids;
mod progress;
mod script;

pub use ids::{LearnerId, OrgId, ParseIdError, ScriptId, StepId};

pub use progress::{DrillKind, MasteredEvent, ProgressRecord, ProgressSummary, UnknownDrillKind};
pub use script::{
    RecallPrompt, Script, ScriptDraft, ScriptValidationError, Section, SectionDraft, Step,
    StepDraft,
};
