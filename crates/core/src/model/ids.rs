use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable key of a script: the CDL class code it walks through (e.g. `A`, `B`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(String);

/// Identifier of a step, unique within its script.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

/// Identifier of the learner practicing a script.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(String);

/// Identifier of the school (organization) a learner belongs to.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Creates a new id from any string-like value.
            ///
            /// No validation happens here; use `parse` for untrusted input.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        kind: stringify!($name).to_string(),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

string_id!(ScriptId);
string_id!(StepId);
string_id!(LearnerId);
string_id!(OrgId);

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from blank string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_id_display() {
        let id = ScriptId::new("B");
        assert_eq!(id.to_string(), "B");
    }

    #[test]
    fn test_script_id_from_str_trims() {
        let id: ScriptId = "  A ".parse().unwrap();
        assert_eq!(id, ScriptId::new("A"));
    }

    #[test]
    fn test_learner_id_from_str_blank_is_error() {
        let result = "   ".parse::<LearnerId>();
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_names_the_kind() {
        let id = OrgId::new("school-7");
        assert_eq!(format!("{id:?}"), "OrgId(\"school-7\")");
    }

    #[test]
    fn test_step_id_serializes_as_plain_string() {
        let id = StepId::new("oil-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"oil-1\"");
    }
}
