//! Observable pipeline events.

use std::path::PathBuf;
use std::time::Duration;

use crate::stage::Stage;
use crate::test_report::TestReport;

/// Tagged event stream observable to the outer world. Emitted synchronously
/// from the driver; see `noctua_pipeline::events` for the observer contract.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StageStart {
        stage: Stage,
    },
    StageComplete {
        stage: Stage,
        duration: Duration,
        summary: Option<String>,
    },
    StageError {
        stage: Stage,
        error: String,
    },
    StageToolStart {
        stage: Stage,
        tool: String,
    },
    StageToolEnd {
        stage: Stage,
        tool: String,
        duration: Duration,
    },
    TestResult {
        report: Box<TestReport>,
        attempt: u32,
    },
    RepairAttempt {
        attempt: u32,
        max_attempts: u32,
    },
    PipelineComplete {
        scraper_dir: PathBuf,
        record_count: u64,
    },
    PipelineFailed {
        reason: String,
        stage: Stage,
    },
}

impl PipelineEvent {
    /// The stage this event pertains to, where applicable. `PipelineComplete`
    /// has no single owning stage (it marks the whole run).
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageStart { stage }
            | Self::StageComplete { stage, .. }
            | Self::StageError { stage, .. }
            | Self::StageToolStart { stage, .. }
            | Self::StageToolEnd { stage, .. }
            | Self::PipelineFailed { stage, .. } => Some(*stage),
            Self::TestResult { .. } => Some(Stage::Test),
            Self::RepairAttempt { .. } => Some(Stage::Repair),
            Self::PipelineComplete { .. } => None,
        }
    }
}
