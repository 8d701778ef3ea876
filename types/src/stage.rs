//! Pipeline stage and reasoning-effort enumerations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the six named phases of the pipeline, plus the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Recon,
    Schema,
    Codegen,
    Test,
    Repair,
    Harden,
    Done,
    Failed,
}

impl Stage {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recon => "recon",
            Self::Schema => "schema",
            Self::Codegen => "codegen",
            Self::Test => "test",
            Self::Repair => "repair",
            Self::Harden => "harden",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasoning-effort hint passed through to the model invocation primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_stages() {
        assert!(Stage::Done.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Recon.is_terminal());
        assert!(!Stage::Repair.is_terminal());
    }

    #[test]
    fn stage_round_trips_through_json() {
        for stage in [
            Stage::Recon,
            Stage::Schema,
            Stage::Codegen,
            Stage::Test,
            Stage::Repair,
            Stage::Harden,
            Stage::Done,
            Stage::Failed,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            let back: Stage = serde_json::from_str(&json).unwrap();
            assert_eq!(stage, back);
        }
    }
}
