use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{DrillKind, Script};
use crate::text::{fold_collapsed, fold_without_punctuation};

use super::{Drill, DrillError, DrillState, Verdict};

/// How strictly a typed phrase is compared with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhraseMatch {
    /// Case-insensitive, whitespace collapsed.
    #[default]
    Strict,
    /// As `Strict`, with all punctuation removed first.
    Lenient,
}

impl PhraseMatch {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PhraseMatch::Strict => "strict",
            PhraseMatch::Lenient => "lenient",
        }
    }

    fn normalize(self, s: &str) -> String {
        match self {
            PhraseMatch::Strict => fold_collapsed(s),
            PhraseMatch::Lenient => fold_without_punctuation(s),
        }
    }
}

impl fmt::Display for PhraseMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhraseMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(PhraseMatch::Strict),
            "lenient" => Ok(PhraseMatch::Lenient),
            other => Err(format!("unknown phrase match mode: {other}")),
        }
    }
}

/// Reproduce-the-phrase drill.
#[derive(Debug, Clone)]
pub struct TypePhraseDrill {
    target: String,
    mode: PhraseMatch,
    state: DrillState,
}

impl TypePhraseDrill {
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if the target is blank.
    pub fn new(target: impl Into<String>, mode: PhraseMatch) -> Result<Self, DrillError> {
        let target = target.into();
        if mode.normalize(&target).is_empty() {
            return Err(DrillError::NothingToGrade(DrillKind::TypePhrase));
        }
        Ok(Self {
            target,
            mode,
            state: DrillState::default(),
        })
    }

    /// Targets the script's [`Script::type_phrase_target`] step.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if the script has no usable step.
    pub fn from_script(script: &Script, mode: PhraseMatch) -> Result<Self, DrillError> {
        let step = script
            .type_phrase_target()
            .ok_or(DrillError::NothingToGrade(DrillKind::TypePhrase))?;
        Self::new(step.text(), mode)
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn mode(&self) -> PhraseMatch {
        self.mode
    }

    /// Grades without touching drill state.
    #[must_use]
    pub fn matches(&self, input: &str) -> bool {
        self.mode.normalize(input) == self.mode.normalize(&self.target)
    }
}

impl Drill for TypePhraseDrill {
    type Attempt = str;

    fn kind(&self) -> DrillKind {
        DrillKind::TypePhrase
    }

    fn submit(&mut self, input: &str) -> Verdict {
        let ok = self.matches(input);
        self.state.settle(DrillKind::TypePhrase, || {
            (!ok).then(|| "Close, but not word for word yet. Try again.".to_string())
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

    const TARGET: &str = "Parking brake is set, and the wheels are chocked.";

    #[test]
    fn strict_ignores_case_and_repeated_whitespace() {
        let drill = TypePhraseDrill::new(TARGET, PhraseMatch::default()).unwrap();
        assert_eq!(drill.mode(), PhraseMatch::Strict);
        assert!(drill.matches("  parking   BRAKE is set,  and the wheels are\tchocked. "));
    }

    #[test]
    fn strict_rejects_an_extra_word() {
        let drill = TypePhraseDrill::new(TARGET, PhraseMatch::Strict).unwrap();
        assert!(!drill.matches("Parking brake is firmly set, and the wheels are chocked."));
    }

    #[test]
    fn strict_requires_punctuation() {
        let drill = TypePhraseDrill::new(TARGET, PhraseMatch::Strict).unwrap();
        assert!(!drill.matches("Parking brake is set and the wheels are chocked"));
    }

    #[test]
    fn lenient_tolerates_punctuation_differences() {
        let drill = TypePhraseDrill::new(TARGET, PhraseMatch::Lenient).unwrap();
        assert!(drill.matches("parking brake is set and the wheels are chocked"));
        assert!(!drill.matches("parking brake is set and wheels are chocked"));
    }

    #[test]
    fn submit_completes_once() {
        let mut drill = TypePhraseDrill::new(TARGET, PhraseMatch::Strict).unwrap();
        assert!(!drill.submit("parking brake").correct);
        assert!(drill.submit(TARGET).newly_completed);
        assert!(!drill.submit("anything").newly_completed);
        assert_eq!(drill.attempts(), 2);
    }

    #[test]
    fn blank_target_is_rejected() {
        assert!(TypePhraseDrill::new("  ", PhraseMatch::Strict).is_err());
        assert!(TypePhraseDrill::new("...", PhraseMatch::Lenient).is_err());
    }

    #[test]
    fn mode_parses_from_config_strings() {
        assert_eq!(
            "Lenient".parse::<PhraseMatch>().unwrap(),
            PhraseMatch::Lenient
        );
        assert!("fuzzy".parse::<PhraseMatch>().is_err());
    }
}
