use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LearnerId, ScriptId};

//
// ─── DRILL KIND ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown drill kind: {0}")]
pub struct UnknownDrillKind(pub String);

/// The four memorization drills a script is practiced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DrillKind {
    FillCloze,
    OrderSteps,
    TypePhrase,
    VisualRecall,
}

impl DrillKind {
    pub const ALL: [DrillKind; 4] = [
        DrillKind::FillCloze,
        DrillKind::OrderSteps,
        DrillKind::TypePhrase,
        DrillKind::VisualRecall,
    ];

    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DrillKind::FillCloze => "fill_cloze",
            DrillKind::OrderSteps => "order_steps",
            DrillKind::TypePhrase => "type_phrase",
            DrillKind::VisualRecall => "visual_recall",
        }
    }

    /// Short human-readable name.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            DrillKind::FillCloze => "Fill in the blanks",
            DrillKind::OrderSteps => "Put the steps in order",
            DrillKind::TypePhrase => "Type the phrase",
            DrillKind::VisualRecall => "Visual recall",
        }
    }
}

impl fmt::Display for DrillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrillKind {
    type Err = UnknownDrillKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrillKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownDrillKind(s.to_string()))
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Which drills a learner has completed for one script.
///
/// Completion is append-only: once a kind is recorded its timestamp never
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    learner_id: LearnerId,
    script_id: ScriptId,
    completed: BTreeMap<DrillKind, DateTime<Utc>>,
    mastered_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Fresh record with nothing completed.
    #[must_use]
    pub fn empty(learner_id: LearnerId, script_id: ScriptId) -> Self {
        Self {
            learner_id,
            script_id,
            completed: BTreeMap::new(),
            mastered_at: None,
        }
    }

    /// Rebuilds a record from storage.
    #[must_use]
    pub fn from_persisted(
        learner_id: LearnerId,
        script_id: ScriptId,
        completed: impl IntoIterator<Item = (DrillKind, DateTime<Utc>)>,
        mastered_at: Option<DateTime<Utc>>,
    ) -> Self {
        let mut map = BTreeMap::new();
        for (kind, at) in completed {
            map.entry(kind).or_insert(at);
        }
        Self {
            learner_id,
            script_id,
            completed: map,
            mastered_at,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    #[must_use]
    pub fn script_id(&self) -> &ScriptId {
        &self.script_id
    }

    #[must_use]
    pub fn is_complete(&self, kind: DrillKind) -> bool {
        self.completed.contains_key(&kind)
    }

    #[must_use]
    pub fn completed_at(&self, kind: DrillKind) -> Option<DateTime<Utc>> {
        self.completed.get(&kind).copied()
    }

    /// Completed kinds with their timestamps, in `DrillKind` order.
    pub fn completions(&self) -> impl Iterator<Item = (DrillKind, DateTime<Utc>)> + '_ {
        self.completed.iter().map(|(kind, at)| (*kind, *at))
    }

    /// Kinds still to do, in `DrillKind` order.
    pub fn remaining(&self) -> impl Iterator<Item = DrillKind> + '_ {
        DrillKind::ALL
            .into_iter()
            .filter(|kind| !self.completed.contains_key(kind))
    }

    #[must_use]
    pub fn all_complete(&self) -> bool {
        DrillKind::ALL
            .iter()
            .all(|kind| self.completed.contains_key(kind))
    }

    #[must_use]
    pub fn mastered_at(&self) -> Option<DateTime<Utc>> {
        self.mastered_at
    }

    /// Records a completion.
    ///
    /// Returns `true` only the first time a kind is completed.
    pub fn mark_complete(&mut self, kind: DrillKind, at: DateTime<Utc>) -> bool {
        if self.completed.contains_key(&kind) {
            return false;
        }
        self.completed.insert(kind, at);
        true
    }

    /// Records mastery once every drill is complete.
    ///
    /// Returns `true` only on the first call that finds all four complete.
    pub fn mark_mastered(&mut self, at: DateTime<Utc>) -> bool {
        if self.mastered_at.is_some() || !self.all_complete() {
            return false;
        }
        self.mastered_at = Some(at);
        true
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::new(self.completed.len(), DrillKind::ALL.len())
    }
}

/// Completed/total counts for a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl ProgressSummary {
    #[must_use]
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            u8::try_from(completed.min(total) * 100 / total).unwrap_or(100)
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

//
// ─── MASTERY ───────────────────────────────────────────────────────────────────
//

/// Raised once per learner and script when the last drill is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteredEvent {
    pub learner_id: LearnerId,
    pub script_id: ScriptId,
    pub mastered_at: DateTime<Utc>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
