//! Tool-set contracts and the bash guardrail.
//!
//! The pipeline only depends on tool *names*, parameter shapes, and the
//! property that invocation is reported via observer callbacks. The concrete
//! browser/shell/file implementations are external collaborators, not
//! implemented here.

pub mod guardrail;
pub mod toolset;

pub use guardrail::{BashGuardrail, GuardrailVerdict};
pub use toolset::{ToolName, ToolSet};
