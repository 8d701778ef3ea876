//! `PipelineState`: the single live record of a run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use noctua_types::{ReconReport, Stage, TestReport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workspace::Workspace;

/// The in-memory state record, mutated only by the pipeline driver and
/// mirrored to `workDir/state.json` after every state-affecting mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub project_name: String,
    pub target_url: String,
    pub user_intent: String,
    pub work_dir: PathBuf,
    pub scraper_dir: PathBuf,
    pub current_stage: Stage,
    pub recon_report: Option<ReconReport>,
    pub schema_path: Option<PathBuf>,
    pub test_results: Vec<TestReport>,
    pub repair_attempts: u32,
    pub max_repair_attempts: u32,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Violation of one of this state's invariants. Used by tests and by the
/// driver's own sanity checks before persisting a terminal transition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateInvariantViolation {
    #[error("repair_attempts ({repair_attempts}) exceeds max_repair_attempts ({max})")]
    RepairAttemptsExceedMax { repair_attempts: u32, max: u32 },
    #[error("stage is done but test_results is empty or its last entry did not succeed")]
    DoneWithoutSuccessfulTest,
    #[error("stage is failed but error is unset")]
    FailedWithoutError,
}

impl PipelineState {
    #[must_use]
    pub fn new(
        project_name: String,
        target_url: String,
        user_intent: String,
        workspace: &Workspace,
        max_repair_attempts: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            project_name,
            target_url,
            user_intent,
            work_dir: workspace.work_dir().to_path_buf(),
            scraper_dir: workspace.scraper_dir().to_path_buf(),
            current_stage: Stage::Recon,
            recon_report: None,
            schema_path: None,
            test_results: Vec::new(),
            repair_attempts: 0,
            max_repair_attempts,
            error: None,
            started_at,
            completed_at: None,
        }
    }

    pub fn transition_to(&mut self, stage: Stage) {
        tracing::debug!(from = %self.current_stage, to = %stage, "stage transition");
        self.current_stage = stage;
    }

    pub fn set_recon_report(&mut self, report: ReconReport) {
        self.recon_report = Some(report);
    }

    pub fn set_schema_path(&mut self, path: PathBuf) {
        self.schema_path = Some(path);
    }

    /// Append one TEST-invocation outcome. `test_results[i]` corresponds to
    /// the `i+1`th test invocation; indices never skip.
    pub fn push_test_result(&mut self, report: TestReport) -> usize {
        self.test_results.push(report);
        self.test_results.len()
    }

    /// Increment the repair counter and return the new attempt number.
    pub fn increment_repair_attempts(&mut self) -> u32 {
        self.repair_attempts += 1;
        self.repair_attempts
    }

    pub fn fail(&mut self, error: impl Into<String>, completed_at: DateTime<Utc>) {
        self.current_stage = Stage::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(completed_at);
    }

    pub fn complete(&mut self, completed_at: DateTime<Utc>) {
        self.current_stage = Stage::Done;
        self.completed_at = Some(completed_at);
    }

    /// Check this state's invariants. The driver calls this before
    /// persisting a terminal transition; tests call it to assert the
    /// testable properties hold for a given run.
    pub fn check_invariants(&self) -> Result<(), StateInvariantViolation> {
        if self.repair_attempts > self.max_repair_attempts {
            return Err(StateInvariantViolation::RepairAttemptsExceedMax {
                repair_attempts: self.repair_attempts,
                max: self.max_repair_attempts,
            });
        }

        if self.current_stage == Stage::Done {
            let last_succeeded = self.test_results.last().is_some_and(|r| r.success);
            if !last_succeeded {
                return Err(StateInvariantViolation::DoneWithoutSuccessfulTest);
            }
        }

        if self.current_stage == Stage::Failed && self.error.is_none() {
            return Err(StateInvariantViolation::FailedWithoutError);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PipelineState {
        let workspace = Workspace::new(std::path::Path::new("/tmp/run"), "x");
        PipelineState::new(
            "x".into(),
            "https://example.com".into(),
            "scrape listings".into(),
            &workspace,
            5,
            Utc::now(),
        )
    }

    #[test]
    fn fresh_state_passes_invariants() {
        assert!(state().check_invariants().is_ok());
    }

    #[test]
    fn done_without_test_results_violates_invariant() {
        let mut s = state();
        s.current_stage = Stage::Done;
        assert_eq!(
            s.check_invariants(),
            Err(StateInvariantViolation::DoneWithoutSuccessfulTest)
        );
    }

    #[test]
    fn done_with_failed_last_test_violates_invariant() {
        let mut s = state();
        s.push_test_result(sample_test_report(false));
        s.current_stage = Stage::Done;
        assert_eq!(
            s.check_invariants(),
            Err(StateInvariantViolation::DoneWithoutSuccessfulTest)
        );
    }

    #[test]
    fn done_with_successful_last_test_is_valid() {
        let mut s = state();
        s.push_test_result(sample_test_report(false));
        s.push_test_result(sample_test_report(true));
        s.current_stage = Stage::Done;
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn failed_without_error_violates_invariant() {
        let mut s = state();
        s.current_stage = Stage::Failed;
        assert_eq!(
            s.check_invariants(),
            Err(StateInvariantViolation::FailedWithoutError)
        );
    }

    #[test]
    fn repair_attempts_beyond_max_violates_invariant() {
        let mut s = state();
        s.repair_attempts = s.max_repair_attempts + 1;
        assert!(matches!(
            s.check_invariants(),
            Err(StateInvariantViolation::RepairAttemptsExceedMax { .. })
        ));
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut s = state();
        s.push_test_result(sample_test_report(true));
        s.set_schema_path(PathBuf::from("/tmp/run/.noctua/pipelines/x/scraper/schema.ts"));

        let json = serde_json::to_string(&s).unwrap();
        let back: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.project_name, s.project_name);
        assert_eq!(back.test_results.len(), 1);
        assert_eq!(back.schema_path, s.schema_path);
    }

    fn sample_test_report(success: bool) -> TestReport {
        TestReport {
            success,
            exit_code: if success { 0 } else { 1 },
            timed_out: false,
            record_count: if success { 7 } else { 0 },
            duration_ms: 100,
            schema_errors: Vec::new(),
            sample_records: Vec::new(),
            field_coverage: std::collections::HashMap::new(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}
