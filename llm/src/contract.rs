//! The LLM invocation primitive: an external contract.
//!
//! The component itself is external — transport, token accounting, and
//! cost estimation internals live outside this core. What belongs here is
//! the shape of the contract the driver depends on: the request it builds
//! and the result it interprets.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use noctua_tools::{BashGuardrail, ToolSet};
use noctua_types::{Budget, BudgetExceeded, ReasoningEffort};
use serde_json::Value;

/// Opaque model identifier, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle(String);

impl ModelHandle {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Callback hooks for tool invocations made during a call. The driver
/// adapts this into `PipelineEvent`s (`stage_tool_start`/`stage_tool_end`).
pub trait InvokeObserver: Send + Sync {
    fn on_tool_start(&self, tool: &str);
    fn on_tool_end(&self, tool: &str, duration: Duration);
}

/// No-op observer for call sites that don't need tool-level events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl InvokeObserver for NullObserver {
    fn on_tool_start(&self, _tool: &str) {}
    fn on_tool_end(&self, _tool: &str, _duration: Duration) {}
}

/// Configuration for one `invoke` call.
#[derive(Clone)]
pub struct InvokeConfig {
    pub model: ModelHandle,
    pub tools: ToolSet,
    pub max_turns: u32,
    pub budget: Budget,
    pub reasoning_effort: ReasoningEffort,
    /// JSON Schema the model's final output must validate against, if any.
    pub structured_output_schema: Option<Value>,
    pub guardrail: Option<Arc<BashGuardrail>>,
    pub instruction_prefix: Option<String>,
    pub observer: Arc<dyn InvokeObserver>,
}

impl fmt::Debug for InvokeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeConfig")
            .field("model", &self.model)
            .field("tools", &self.tools.names())
            .field("max_turns", &self.max_turns)
            .field("budget_usd", &self.budget.as_usd())
            .field("reasoning_effort", &self.reasoning_effort)
            .field(
                "structured_output_schema",
                &self.structured_output_schema.is_some(),
            )
            .field("guardrail", &self.guardrail.is_some())
            .finish_non_exhaustive()
    }
}

/// One entry in the conversation trail the model produced.
#[derive(Debug, Clone)]
pub struct TrailMessage {
    pub role: TrailRole,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailRole {
    User,
    Assistant,
    Tool,
}

/// The result of one `invoke` call.
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    /// Final text output, if the model produced any outside structured output.
    pub output: Option<String>,
    /// Schema-validated structured output, present only when `invoke` was
    /// called with a schema *and* the model's output validated successfully.
    pub final_output: Option<Value>,
    pub messages: Vec<TrailMessage>,
    pub num_turns: u32,
    pub finish_reason: String,
    pub total_cost_usd: f64,
}

impl InvokeOutcome {
    /// Concatenate assistant text and tool-result text from the trail, the
    /// fallback findings-extraction path when `output` is absent.
    #[must_use]
    pub fn concatenated_trail_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| matches!(m.role, TrailRole::Assistant | TrailRole::Tool))
            .filter_map(|m| m.content.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Errors the invocation primitive can raise.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceeded),
    #[error("structured output did not validate: {message}")]
    OutputParseError { message: String },
    #[error("model error (status {status:?}): {message}")]
    ModelError {
        status: Option<u16>,
        message: String,
    },
    #[error("{0}")]
    Generic(String),
}

/// Async boundary the pipeline depends on. A real implementation talks to a
/// model runtime over HTTP/SSE; this core only needs the trait, so tests
/// supply a scripted fake.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, prompt: &str, config: &InvokeConfig) -> Result<InvokeOutcome, InvokeError>;
}
