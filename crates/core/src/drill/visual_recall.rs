use crate::model::{DrillKind, RecallPrompt, Script};
use crate::text::fold;

use super::{Drill, DrillError, DrillState, Verdict};

/// Picture-and-question drill.
///
/// Unlike the other drills this one grades by containment: an answer is
/// right when it contains any accepted answer, so "it's the slack adjuster"
/// passes for "slack adjuster".
#[derive(Debug, Clone)]
pub struct VisualRecallDrill {
    question: String,
    image: Option<String>,
    accepted: Vec<String>,
    state: DrillState,
}

impl VisualRecallDrill {
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if the question is blank or no
    /// accepted answer is left after trimming.
    pub fn new<I, S>(
        question: impl Into<String>,
        image: Option<String>,
        answers: I,
    ) -> Result<Self, DrillError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let question = question.into();
        let accepted: Vec<String> = answers
            .into_iter()
            .map(|a| fold(a.as_ref()))
            .filter(|a| !a.is_empty())
            .collect();
        if question.trim().is_empty() || accepted.is_empty() {
            return Err(DrillError::NothingToGrade(DrillKind::VisualRecall));
        }
        Ok(Self {
            question,
            image,
            accepted,
            state: DrillState::default(),
        })
    }

    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` for an unusable prompt.
    pub fn from_prompt(prompt: &RecallPrompt) -> Result<Self, DrillError> {
        Self::new(
            prompt.question.clone(),
            prompt.image.clone(),
            &prompt.answers,
        )
    }

    /// Uses the script's first recall prompt.
    ///
    /// Scripts authored without one get a question about their structure:
    /// which section is graded pass/fail, or failing that, which section the
    /// walkthrough opens with.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if no question can be formed.
    pub fn from_script(script: &Script) -> Result<Self, DrillError> {
        if let Some(prompt) = script.recall_prompts().first() {
            return Self::from_prompt(prompt);
        }
        if let Some(section) = script.critical_sections().next() {
            return Self::new(
                "Which part of the inspection is graded pass/fail?",
                None,
                [section.title()],
            );
        }
        let first = script
            .sections()
            .first()
            .ok_or(DrillError::NothingToGrade(DrillKind::VisualRecall))?;
        Self::new(
            "Which section does the walkthrough start with?",
            None,
            [first.title()],
        )
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Grades without touching drill state.
    #[must_use]
    pub fn matches(&self, input: &str) -> bool {
        let answer = fold(input);
        !answer.is_empty() && self.accepted.iter().any(|a| answer.contains(a.as_str()))
    }
}

impl Drill for VisualRecallDrill {
    type Attempt = str;

    fn kind(&self) -> DrillKind {
        DrillKind::VisualRecall
    }

    fn submit(&mut self, input: &str) -> Verdict {
        let ok = self.matches(input);
        self.state.settle(DrillKind::VisualRecall, || {
            (!ok).then(|| "Not quite. Take another look and try again.".to_string())
        })
    }

    fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    fn attempts(&self) -> u32 {
        self.state.attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScriptDraft, SectionDraft, StepDraft};

    fn script(critical: bool, prompts: Vec<RecallPrompt>) -> Script {
        ScriptDraft {
            class_code: "A".into(),
            sections: vec![
                SectionDraft {
                    title: "Engine compartment".into(),
                    critical: false,
                    steps: vec![StepDraft {
                        id: "e1".into(),
                        label: None,
                        text: "Oil level".into(),
                        must_say: false,
                        pass_fail: false,
                        tokens: None,
                    }],
                },
                SectionDraft {
                    title: "Air brake check".into(),
                    critical,
                    steps: vec![StepDraft {
                        id: "b1".into(),
                        label: None,
                        text: "Applied pressure test".into(),
                        must_say: true,
                        pass_fail: true,
                        tokens: None,
                    }],
                },
            ],
            recall_prompts: prompts,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn containment_with_extra_words_is_correct() {
        let mut drill = VisualRecallDrill::new(
            "What part is shown?",
            Some("img/slack.png".into()),
            ["Slack Adjuster"],
        )
        .unwrap();
        let verdict = drill.submit("I think it's the slack adjuster on the left");
        assert!(verdict.correct);
        assert!(drill.is_complete());
        assert_eq!(drill.image(), Some("img/slack.png"));
    }

    #[test]
    fn any_accepted_answer_counts() {
        let drill = VisualRecallDrill::new("Which brake?", None, ["spring brake", "parking brake"])
            .unwrap();
        assert!(drill.matches("PARKING BRAKE"));
        assert!(!drill.matches("service brake"));
        assert!(!drill.matches("   "));
    }

    #[test]
    fn blank_answers_are_ignored_and_required() {
        assert!(VisualRecallDrill::new("Q?", None, ["  "]).is_err());
        assert!(VisualRecallDrill::new(" ", None, ["a"]).is_err());
    }

    #[test]
    fn script_prompt_is_preferred() {
        let prompt = RecallPrompt {
            question: "What is this gauge?".into(),
            image: Some("gauge.jpg".into()),
            answers: vec!["air pressure".into()],
        };
        let drill = VisualRecallDrill::from_script(&script(true, vec![prompt])).unwrap();
        assert_eq!(drill.question(), "What is this gauge?");
    }

    #[test]
    fn falls_back_to_critical_section_then_first_section() {
        let drill = VisualRecallDrill::from_script(&script(true, Vec::new())).unwrap();
        assert!(drill.matches("the air brake check"));

        let drill = VisualRecallDrill::from_script(&script(false, Vec::new())).unwrap();
        assert!(drill.matches("engine compartment"));
    }
}
