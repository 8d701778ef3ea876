//! Resolved pipeline configuration: run options and per-stage budgets.
//!
//! A resolved, fully-validated type with no stray `Option` where a default
//! can be supplied instead. There is no on-disk config file for this core,
//! so a builder on `PipelineOptions` is the whole surface — no layered
//! file/env resolution.

use std::path::PathBuf;
use std::sync::Arc;

use noctua_llm::ModelHandle;
use noctua_types::{Budget, Stage};

use crate::events::{NullPipelineObserver, PipelineObserver};

/// Default repair-attempt ceiling; callers may raise it.
pub const DEFAULT_MAX_REPAIR_ATTEMPTS: u32 = 5;

/// Safety-net turn cap for the explore phase. Budget exhaustion is expected
/// to fire first in normal operation.
pub const DEFAULT_EXPLORE_MAX_TURNS: u32 = 1000;

/// Per-stage USD budget ceilings (100 each by default).
#[derive(Debug, Clone, Copy)]
pub struct StageBudgets {
    pub recon: Budget,
    pub schema: Budget,
    pub codegen: Budget,
    pub test: Budget,
    pub repair: Budget,
    pub harden: Budget,
}

impl Default for StageBudgets {
    fn default() -> Self {
        let default = Budget::default();
        Self {
            recon: default,
            schema: default,
            codegen: default,
            test: default,
            repair: default,
            harden: default,
        }
    }
}

impl StageBudgets {
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> Budget {
        match stage {
            Stage::Recon => self.recon,
            Stage::Schema => self.schema,
            Stage::Codegen => self.codegen,
            Stage::Test | Stage::Repair => {
                // TEST and REPAIR share a single inner loop but keep
                // separate ceilings; repair's own ceiling takes over once
                // the driver transitions into the REPAIR half of the loop.
                if stage == Stage::Repair {
                    self.repair
                } else {
                    self.test
                }
            }
            Stage::Harden => self.harden,
            Stage::Done | Stage::Failed => Budget::from_usd(0.0),
        }
    }
}

/// Resolved options for one `run_pipeline` call.
#[derive(Clone)]
pub struct PipelineOptions {
    pub base_dir: PathBuf,
    pub model: ModelHandle,
    pub max_repair_attempts: u32,
    pub stage_budgets: StageBudgets,
    pub explore_max_turns: u32,
    pub observer: Arc<dyn PipelineObserver>,
}

impl PipelineOptions {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, model: ModelHandle) -> Self {
        Self {
            base_dir: base_dir.into(),
            model,
            max_repair_attempts: DEFAULT_MAX_REPAIR_ATTEMPTS,
            stage_budgets: StageBudgets::default(),
            explore_max_turns: DEFAULT_EXPLORE_MAX_TURNS,
            observer: Arc::new(NullPipelineObserver),
        }
    }

    #[must_use]
    pub fn with_max_repair_attempts(mut self, attempts: u32) -> Self {
        self.max_repair_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_stage_budgets(mut self, budgets: StageBudgets) -> Self {
        self.stage_budgets = budgets;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_repair_attempts_is_five() {
        let options = PipelineOptions::new("/tmp", ModelHandle::new("test-model"));
        assert_eq!(options.max_repair_attempts, DEFAULT_MAX_REPAIR_ATTEMPTS);
        assert_eq!(options.max_repair_attempts, 5);
    }

    #[test]
    fn stage_budgets_default_to_100_usd() {
        let budgets = StageBudgets::default();
        assert_eq!(budgets.for_stage(Stage::Recon).as_usd(), 100.0);
        assert_eq!(budgets.for_stage(Stage::Harden).as_usd(), 100.0);
    }

    #[test]
    fn zero_max_repair_attempts_is_clamped_to_one() {
        let options =
            PipelineOptions::new("/tmp", ModelHandle::new("test-model")).with_max_repair_attempts(0);
        assert_eq!(options.max_repair_attempts, 1);
    }
}
