//! Event emitter.
//!
//! Single-observer callback invoked synchronously from the driver. No
//! buffering; the observer is expected to be non-blocking. The driver
//! never fails because of observer errors — a panicking observer is
//! caught and logged rather than unwinding into the driver.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use noctua_llm::InvokeObserver;
use noctua_types::{PipelineEvent, Stage};

/// The single-observer callback contract.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Observer that discards every event; the default for callers who don't
/// need progress reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPipelineObserver;

impl PipelineObserver for NullPipelineObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Emit `event` to `observer`, swallowing (and logging) any panic so a
/// misbehaving observer can never take down the pipeline driver.
pub fn emit(observer: &dyn PipelineObserver, event: PipelineEvent) {
    let result = catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)));
    if result.is_err() {
        tracing::error!("pipeline observer panicked while handling an event; ignoring");
    }
}

/// Adapts the stage-scoped [`PipelineObserver`] into the per-invocation
/// [`InvokeObserver`] hooks the LLM contract expects, so tool start/end
/// events surface as `stage_tool_start`/`stage_tool_end`.
///
/// Owns an `Arc` rather than borrowing so it can be handed to
/// `InvokeConfig::observer` (which requires `Arc<dyn InvokeObserver>`,
/// i.e. `'static`) without the driver having to thread a borrow through
/// every stage helper.
pub struct ToolEventAdapter {
    observer: Arc<dyn PipelineObserver>,
    stage: Stage,
}

impl ToolEventAdapter {
    #[must_use]
    pub fn new(observer: Arc<dyn PipelineObserver>, stage: Stage) -> Self {
        Self { observer, stage }
    }
}

impl InvokeObserver for ToolEventAdapter {
    fn on_tool_start(&self, tool: &str) {
        emit(
            self.observer.as_ref(),
            PipelineEvent::StageToolStart {
                stage: self.stage,
                tool: tool.to_string(),
            },
        );
    }

    fn on_tool_end(&self, tool: &str, duration: Duration) {
        emit(
            self.observer.as_ref(),
            PipelineEvent::StageToolEnd {
                stage: self.stage,
                tool: tool.to_string(),
                duration,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl PipelineObserver for RecordingObserver {
        fn on_event(&self, event: &PipelineEvent) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{event:?}"));
        }
    }

    struct PanickingObserver;

    impl PipelineObserver for PanickingObserver {
        fn on_event(&self, _event: &PipelineEvent) {
            panic!("boom");
        }
    }

    #[test]
    fn emit_reaches_the_observer() {
        let observer = RecordingObserver {
            events: Mutex::new(Vec::new()),
        };
        emit(&observer, PipelineEvent::StageStart { stage: Stage::Recon });
        assert_eq!(observer.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn panicking_observer_does_not_propagate() {
        let observer = PanickingObserver;
        // Must not panic the test itself.
        emit(&observer, PipelineEvent::StageStart { stage: Stage::Recon });
    }

    #[test]
    fn tool_event_adapter_forwards_as_stage_tool_events() {
        let observer = Arc::new(RecordingObserver {
            events: Mutex::new(Vec::new()),
        });
        let adapter = ToolEventAdapter::new(observer.clone(), Stage::Schema);
        adapter.on_tool_start("bash");
        adapter.on_tool_end("bash", Duration::from_millis(5));
        assert_eq!(observer.events.lock().unwrap().len(), 2);
    }
}
