//! Failure classification for the repair prompt.

use noctua_types::TestReport;

/// The primary failure category classified from a failing [`TestReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Module,
    Navigation,
    Selector,
    General,
}

impl FailureCategory {
    #[must_use]
    pub fn diagnosis_message(self) -> &'static str {
        match self {
            Self::Module => {
                "A required module could not be resolved. Check import paths and the \
                 relative path from the scraper to the scaffold, and verify the file \
                 was actually written to the expected location."
            }
            Self::Navigation => {
                "Navigation to the target page failed. Check that the URL is reachable, \
                 that any required login/session step ran first, and that redirects are \
                 followed correctly."
            }
            Self::Selector => {
                "A selector did not match within the timeout. Re-probe the live page, \
                 confirm the selector against current markup, and add an explicit wait \
                 for the element before extracting it."
            }
            Self::General => {
                "The scraper ran but did not produce valid output. Review the stdout/stderr \
                 and schema errors below and correct the extraction logic."
            }
        }
    }
}

const MODULE_MARKERS: &[&str] = &["Cannot find module", "MODULE_NOT_FOUND"];
const NAVIGATION_MARKERS: &[&str] = &[
    "net::ERR_",
    "ERR_NAME_NOT_RESOLVED",
    "ENOTFOUND",
    "Navigation failed",
    "Navigation timeout",
];
const SELECTOR_MARKERS: &[&str] = &["selector", "Timeout", "waiting for"];

/// Classify the primary failure from the last [`TestReport`].
/// Inspects, in order, the schema-error messages then stderr, since the
/// schema errors carry the most specific signal when present.
#[must_use]
pub fn classify(report: &TestReport) -> FailureCategory {
    let messages: Vec<&str> = report
        .schema_errors
        .iter()
        .map(|e| e.message.as_str())
        .chain(std::iter::once(report.stderr.as_str()))
        .collect();

    for message in &messages {
        if MODULE_MARKERS.iter().any(|marker| message.contains(marker)) {
            return FailureCategory::Module;
        }
    }
    for message in &messages {
        if NAVIGATION_MARKERS.iter().any(|marker| message.contains(marker)) {
            return FailureCategory::Navigation;
        }
    }
    for message in &messages {
        if SELECTOR_MARKERS.iter().any(|marker| message.contains(marker)) {
            return FailureCategory::Selector;
        }
    }
    FailureCategory::General
}
