use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cloze::auto_tokens;
use crate::model::ids::{ScriptId, StepId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Structural problems found while turning a raw script into a `Script`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScriptValidationError {
    #[error("script class code cannot be empty")]
    EmptyClassCode,

    #[error("script has no steps")]
    Empty,

    #[error("step in section {section} has an empty id")]
    EmptyStepId { section: usize },

    #[error("step {step_id} has no text")]
    MissingStepText { step_id: String },

    #[error("step id {step_id} appears more than once")]
    DuplicateStepId { step_id: String },

    #[error("recall prompt {index} needs a question and at least one answer")]
    InvalidRecallPrompt { index: usize },
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// Script as stored by the repository, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDraft {
    pub class_code: String,
    #[serde(default)]
    pub sections: Vec<SectionDraft>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recall_prompts: Vec<RecallPrompt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDraft {
    pub title: String,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub steps: Vec<StepDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDraft {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub must_say: bool,
    #[serde(default)]
    pub pass_fail: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
}

/// Question shown next to an optional picture in the visual recall drill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallPrompt {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub answers: Vec<String>,
}

impl ScriptDraft {
    /// True when the draft has nothing to practice.
    ///
    /// Used by resolution: an empty organization script does not override
    /// the default one.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.steps.is_empty())
    }

    /// Validates structure and produces an immutable `Script`.
    ///
    /// # Errors
    ///
    /// Returns `ScriptValidationError` on an empty class code, a script with
    /// no steps, blank or duplicate step ids, blank step text, or an unusable
    /// recall prompt.
    pub fn validate(self) -> Result<Script, ScriptValidationError> {
        let class_code = self.class_code.trim();
        if class_code.is_empty() {
            return Err(ScriptValidationError::EmptyClassCode);
        }
        if self.is_empty() {
            return Err(ScriptValidationError::Empty);
        }

        let mut seen = HashSet::new();
        let mut sections = Vec::with_capacity(self.sections.len());
        for (section_index, section) in self.sections.into_iter().enumerate() {
            let mut steps = Vec::with_capacity(section.steps.len());
            for step in section.steps {
                let id = step.id.trim();
                if id.is_empty() {
                    return Err(ScriptValidationError::EmptyStepId {
                        section: section_index,
                    });
                }
                if step.text.trim().is_empty() {
                    return Err(ScriptValidationError::MissingStepText {
                        step_id: id.to_string(),
                    });
                }
                if !seen.insert(id.to_string()) {
                    return Err(ScriptValidationError::DuplicateStepId {
                        step_id: id.to_string(),
                    });
                }
                steps.push(Step {
                    id: StepId::new(id),
                    label: step.label.filter(|l| !l.trim().is_empty()),
                    text: step.text,
                    must_say: step.must_say,
                    pass_fail: step.pass_fail,
                    tokens: step.tokens,
                });
            }
            sections.push(Section {
                title: section.title,
                critical: section.critical,
                steps,
            });
        }

        for (index, prompt) in self.recall_prompts.iter().enumerate() {
            let has_answer = prompt.answers.iter().any(|a| !a.trim().is_empty());
            if prompt.question.trim().is_empty() || !has_answer {
                return Err(ScriptValidationError::InvalidRecallPrompt { index });
            }
        }

        Ok(Script {
            id: ScriptId::new(class_code),
            sections,
            recall_prompts: self.recall_prompts,
        })
    }
}

//
// ─── SCRIPT ────────────────────────────────────────────────────────────────────
//

/// One spoken or performed action of the walkthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    id: StepId,
    label: Option<String>,
    text: String,
    must_say: bool,
    pass_fail: bool,
    tokens: Option<Vec<String>>,
}

impl Step {
    #[must_use]
    pub fn id(&self) -> &StepId {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The phrase must be spoken verbatim during the exam.
    #[must_use]
    pub fn must_say(&self) -> bool {
        self.must_say
    }

    /// Failing this step fails the exam.
    #[must_use]
    pub fn pass_fail(&self) -> bool {
        self.pass_fail
    }

    /// Tokens authored with the step, if any.
    #[must_use]
    pub fn explicit_tokens(&self) -> Option<&[String]> {
        self.tokens.as_deref()
    }

    /// Tokens to blank in cloze drills.
    ///
    /// Authored tokens win when present and non-empty; otherwise they are
    /// derived from the text.
    #[must_use]
    pub fn blank_tokens(&self) -> Vec<String> {
        match self.tokens.as_deref() {
            Some(tokens) if tokens.iter().any(|t| !t.trim().is_empty()) => tokens.to_vec(),
            _ => auto_tokens(&self.text),
        }
    }
}

/// Named group of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    title: String,
    critical: bool,
    steps: Vec<Step>,
}

impl Section {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The section is a pass/fail graded portion of the exam.
    #[must_use]
    pub fn critical(&self) -> bool {
        self.critical
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Validated, immutable inspection walkthrough for one class code.
///
/// Section and step order are the canonical inspection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    id: ScriptId,
    sections: Vec<Section>,
    recall_prompts: Vec<RecallPrompt>,
}

impl Script {
    #[must_use]
    pub fn id(&self) -> &ScriptId {
        &self.id
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn recall_prompts(&self) -> &[RecallPrompt] {
        &self.recall_prompts
    }

    /// All steps in canonical order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.sections.iter().flat_map(|s| s.steps.iter())
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.sections.iter().map(|s| s.steps.len()).sum()
    }

    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps().find(|s| s.id() == id)
    }

    pub fn critical_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.critical)
    }

    pub fn must_say_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps().filter(|s| s.must_say)
    }

    pub fn pass_fail_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps().filter(|s| s.pass_fail)
    }

    /// Step whose text the type-phrase drill asks for.
    ///
    /// First pass/fail step, else the first step of the first critical
    /// section, else the first step.
    #[must_use]
    pub fn type_phrase_target(&self) -> Option<&Step> {
        self.pass_fail_steps()
            .next()
            .or_else(|| {
                self.critical_sections()
                    .find_map(|section| section.steps.first())
            })
            .or_else(|| self.steps().next())
    }

    /// Converts back into the storage shape.
    #[must_use]
    pub fn to_draft(&self) -> ScriptDraft {
        ScriptDraft {
            class_code: self.id.as_str().to_string(),
            sections: self
                .sections
                .iter()
                .map(|section| SectionDraft {
                    title: section.title.clone(),
                    critical: section.critical,
                    steps: section
                        .steps
                        .iter()
                        .map(|step| StepDraft {
                            id: step.id.as_str().to_string(),
                            label: step.label.clone(),
                            text: step.text.clone(),
                            must_say: step.must_say,
                            pass_fail: step.pass_fail,
                            tokens: step.tokens.clone(),
                        })
                        .collect(),
                })
                .collect(),
            recall_prompts: self.recall_prompts.clone(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
