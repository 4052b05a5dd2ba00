use crate::cloze::{ClozeLine, build_blanks};
use crate::model::{DrillKind, Step};

use super::{Drill, DrillError, DrillState, Verdict};

/// Fill-in-the-blank drill over one or more step lines.
///
/// Complete only when every blank across every line is right; lines without
/// blanks are shown as plain text and ignored by grading.
#[derive(Debug, Clone)]
pub struct FillClozeDrill {
    lines: Vec<ClozeLine>,
    last_results: Vec<bool>,
    state: DrillState,
}

impl FillClozeDrill {
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if no line has a blank.
    pub fn new(lines: Vec<ClozeLine>) -> Result<Self, DrillError> {
        if !lines.iter().any(ClozeLine::has_blanks) {
            return Err(DrillError::NothingToGrade(DrillKind::FillCloze));
        }
        Ok(Self {
            lines,
            last_results: Vec::new(),
            state: DrillState::default(),
        })
    }

    /// Builds one line per step using its explicit or derived tokens.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if no step yields a blank, or
    /// `DrillError::Cloze` if a blank pattern cannot be compiled.
    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Result<Self, DrillError> {
        let lines = steps
            .into_iter()
            .map(|step| {
                let tokens = step.blank_tokens();
                build_blanks(step.text(), tokens.as_slice())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(lines)
    }

    #[must_use]
    pub fn lines(&self) -> &[ClozeLine] {
        &self.lines
    }

    /// Total number of blanks across all lines.
    #[must_use]
    pub fn blank_count(&self) -> usize {
        self.lines.iter().map(ClozeLine::blank_count).sum()
    }

    /// Per-blank results of the last graded submission, flattened like the
    /// attempt.
    #[must_use]
    pub fn last_results(&self) -> &[bool] {
        &self.last_results
    }

    fn grade(&self, entries: &[String]) -> Vec<bool> {
        let mut offset = 0;
        let mut results = Vec::with_capacity(self.blank_count());
        for line in &self.lines {
            let count = line.blank_count();
            let slice = entries.get(offset..).unwrap_or_default();
            results.extend(line.grade(&slice[..count.min(slice.len())]));
            offset += count;
        }
        results
    }
}

impl Drill for FillClozeDrill {
    type Attempt = [String];

    fn kind(&self) -> DrillKind {
        DrillKind::FillCloze
    }

    fn submit(&mut self, entries: &[String]) -> Verdict {
        if self.state.is_complete() {
            return self.state.settle(DrillKind::FillCloze, || None);
        }
        let results = self.grade(entries);
        let wrong = results.iter().filter(|ok| !**ok).count();
        self.last_results = results;
        let total = self.last_results.len();
        self.state.settle(DrillKind::FillCloze, || {
            (wrong > 0).then(|| format!("{wrong} of {total} blanks need another look. Try again."))
        })
    }

    fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    fn attempts(&self) -> u32 {
        self.state.attempts()
    }
}
