//! Tool name handles and the per-stage tool sets consumed by the driver.

use std::fmt;

/// Opaque capability handle. The pipeline composes these into stage-specific
/// sets; it never calls a tool directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    WebProbe,
    WebInterceptApi,
    FileRead,
    FileWrite,
    FileEdit,
    Glob,
    Grep,
    /// Named `bash` on the wire, matching the guardrail's trigger name.
    Shell,
    ScraperTest,
    ScraperLint,
}

impl ToolName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WebProbe => "web_probe",
            Self::WebInterceptApi => "web_intercept_api",
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::FileEdit => "file_edit",
            Self::Glob => "glob",
            Self::Grep => "grep",
            Self::Shell => "bash",
            Self::ScraperTest => "scraper_test",
            Self::ScraperLint => "scraper_lint",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, deduplicated tool set handed to one LLM invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolSet(Vec<ToolName>);

impl ToolSet {
    #[must_use]
    pub fn new(tools: impl IntoIterator<Item = ToolName>) -> Self {
        let mut seen = Vec::new();
        for tool in tools {
            if !seen.contains(&tool) {
                seen.push(tool);
            }
        }
        Self(seen)
    }

    #[must_use]
    pub fn names(&self) -> &[ToolName] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, tool: ToolName) -> bool {
        self.0.contains(&tool)
    }

    /// Explore phase of recon: web probe, API intercept, file read.
    #[must_use]
    pub fn recon_explore() -> Self {
        Self::new([
            ToolName::WebProbe,
            ToolName::WebInterceptApi,
            ToolName::FileRead,
        ])
    }

    /// Synthesize phase of recon uses no tools at all.
    #[must_use]
    pub fn recon_synthesize() -> Self {
        Self::new([])
    }

    /// Schema / codegen / harden: shell, file read/write/edit/glob, grep.
    #[must_use]
    pub fn code() -> Self {
        Self::new([
            ToolName::Shell,
            ToolName::FileRead,
            ToolName::FileWrite,
            ToolName::FileEdit,
            ToolName::Glob,
            ToolName::Grep,
        ])
    }

    /// Test: shell, file read, scraper-test, scraper-lint, glob.
    #[must_use]
    pub fn test() -> Self {
        Self::new([
            ToolName::Shell,
            ToolName::FileRead,
            ToolName::ScraperTest,
            ToolName::ScraperLint,
            ToolName::Glob,
        ])
    }

    /// Repair: shell, file read/write/edit, web probe, glob.
    #[must_use]
    pub fn repair() -> Self {
        Self::new([
            ToolName::Shell,
            ToolName::FileRead,
            ToolName::FileWrite,
            ToolName::FileEdit,
            ToolName::WebProbe,
            ToolName::Glob,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_tool_name_matches_guardrail_trigger() {
        assert_eq!(ToolName::Shell.as_str(), "bash");
    }

    #[test]
    fn stage_tool_sets_match_expected_surface() {
        assert!(ToolSet::recon_explore().contains(ToolName::WebProbe));
        assert!(!ToolSet::recon_explore().contains(ToolName::Shell));

        assert!(ToolSet::code().contains(ToolName::Shell));
        assert!(ToolSet::code().contains(ToolName::Grep));

        assert!(ToolSet::test().contains(ToolName::ScraperTest));
        assert!(!ToolSet::test().contains(ToolName::FileWrite));

        assert!(ToolSet::repair().contains(ToolName::WebProbe));
        assert!(ToolSet::repair().contains(ToolName::FileEdit));
    }

    #[test]
    fn dedupes_tool_names() {
        let set = ToolSet::new([ToolName::Shell, ToolName::Shell, ToolName::Glob]);
        assert_eq!(set.names().len(), 2);
    }
}
