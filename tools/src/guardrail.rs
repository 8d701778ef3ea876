//! The bash guardrail: a policy over `(toolName, toolArgs)` that vetoes
//! dangerous shell invocations and paths outside the workspace.
//!
//! A `RegexSet` of catastrophic-command patterns paired with human-readable
//! reasons, plus a workspace-confinement check over absolute paths in the
//! command text.

use std::path::{Path, PathBuf};

use regex::{Regex, RegexSet};

const OUTPUT_INFO_MAX_LEN: usize = 80;

/// Case-sensitive, word-boundary patterns that always deny the command,
/// regardless of workspace confinement.
const BLOCKED_PATTERNS: &[(&str, &str)] = &[
    (r"\brm\s+-rf\s+/(?:\s|$)", "rm -rf /"),
    (r"\brm\s+-rf\s+~(?:\s|$)", "rm -rf ~"),
    (r"\brm\s+-rf\s+\$HOME(?:\s|$)", "rm -rf $HOME"),
    (r"\bgit\s+push\s+--force\b", "git push --force"),
    (r"\bgit\s+push\s+-f\b", "git push -f"),
];

/// An absolute-path token in a shell command: `(^|\s)(/[^\s]+)`.
/// Deliberately coarse — a quoted substring containing `/...` still trips
/// it. This is a conservative, intentional over-rejection, not a bug.
fn absolute_path_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\s)(/[^\s]+)").expect("absolute path regex is valid"))
}

/// Result of evaluating the guardrail against a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailVerdict {
    Allowed,
    Tripped { output_info: String },
}

impl GuardrailVerdict {
    #[must_use]
    pub fn tripwire_triggered(&self) -> bool {
        matches!(self, Self::Tripped { .. })
    }
}

fn truncate_output_info(reason: &str) -> String {
    if reason.chars().count() <= OUTPUT_INFO_MAX_LEN {
        reason.to_string()
    } else {
        let truncated: String = reason.chars().take(OUTPUT_INFO_MAX_LEN).collect();
        truncated
    }
}

/// The guardrail policy, scoped to one pipeline run's workspace.
#[derive(Debug, Clone)]
pub struct BashGuardrail {
    workspace_root: PathBuf,
    blocked: RegexSet,
    reasons: Vec<&'static str>,
}

impl BashGuardrail {
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        let patterns: Vec<&str> = BLOCKED_PATTERNS.iter().map(|(p, _)| *p).collect();
        let reasons = BLOCKED_PATTERNS.iter().map(|(_, r)| *r).collect();
        Self {
            workspace_root: workspace_root.into(),
            blocked: RegexSet::new(patterns).expect("guardrail blacklist patterns are valid"),
            reasons,
        }
    }

    /// Evaluate one `(toolName, command)` pair. Only trips for `toolName ==
    /// "bash"`; every other tool is allowed unconditionally.
    #[must_use]
    pub fn check(&self, tool_name: &str, command: &str) -> GuardrailVerdict {
        if tool_name != "bash" {
            return GuardrailVerdict::Allowed;
        }

        if let Some(idx) = self.blocked.matches(command).iter().next() {
            let reason = self.reasons[idx];
            tracing::warn!(command = %command, reason, "guardrail blocked command");
            return GuardrailVerdict::Tripped {
                output_info: truncate_output_info(reason),
            };
        }

        if let Some(path) = self.find_disallowed_absolute_path(command) {
            let reason = format!("references path outside workspace: {path}");
            tracing::warn!(command = %command, path, "guardrail blocked absolute path");
            return GuardrailVerdict::Tripped {
                output_info: truncate_output_info(&reason),
            };
        }

        GuardrailVerdict::Allowed
    }

    fn find_disallowed_absolute_path(&self, command: &str) -> Option<String> {
        for captures in absolute_path_regex().captures_iter(command) {
            let token = captures.get(1)?.as_str();
            if !self.is_allowed_absolute_path(token) {
                return Some(token.to_string());
            }
        }
        None
    }

    fn is_allowed_absolute_path(&self, token: &str) -> bool {
        if token == "/" || token == "/dev/null" {
            return true;
        }
        if token.starts_with("/tmp") {
            return true;
        }
        Path::new(token).starts_with(&self.workspace_root)
    }
}
