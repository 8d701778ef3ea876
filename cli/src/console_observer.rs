//! A [`PipelineObserver`] that logs every event via `tracing`, the CLI's
//! concrete implementation of the observer stream.

use noctua_pipeline::PipelineObserver;
use noctua_types::PipelineEvent;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

impl PipelineObserver for ConsoleObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStart { stage } => {
                tracing::info!(%stage, "stage started");
            }
            PipelineEvent::StageComplete {
                stage,
                duration,
                summary,
            } => {
                tracing::info!(
                    %stage,
                    duration_ms = duration.as_millis() as u64,
                    summary = summary.as_deref().unwrap_or(""),
                    "stage complete"
                );
            }
            PipelineEvent::StageError { stage, error } => {
                tracing::warn!(%stage, error, "stage error");
            }
            PipelineEvent::StageToolStart { stage, tool } => {
                tracing::debug!(%stage, tool, "tool start");
            }
            PipelineEvent::StageToolEnd { stage, tool, duration } => {
                tracing::debug!(%stage, tool, duration_ms = duration.as_millis() as u64, "tool end");
            }
            PipelineEvent::TestResult { report, attempt } => {
                tracing::info!(
                    attempt,
                    success = report.success,
                    record_count = report.record_count,
                    schema_errors = report.schema_errors.len(),
                    "test result"
                );
            }
            PipelineEvent::RepairAttempt { attempt, max_attempts } => {
                tracing::info!(attempt, max_attempts, "repair attempt");
            }
            PipelineEvent::PipelineComplete { scraper_dir, record_count } => {
                tracing::info!(
                    scraper_dir = %scraper_dir.display(),
                    record_count,
                    "pipeline complete"
                );
            }
            PipelineEvent::PipelineFailed { reason, stage } => {
                tracing::error!(%stage, reason, "pipeline failed");
            }
        }
    }
}
