//! A stand-in for the real LLM invocation primitive. The transport-level
//! client is out of scope here: the pipeline core depends only on the
//! [`LlmClient`] trait; wiring a real model runtime (HTTP/SSE transport,
//! token accounting, cost estimation) is an external collaborator's job
//! and does not belong in this crate.
//!
//! `UnimplementedLlmClient` exists so `noctua` links and runs end-to-end
//! against the driver's control flow (retry, budgets, file-presence,
//! event emission) without requiring real model credentials. It fails
//! every call immediately; swap it for a real transport to run an actual
//! pipeline.

use async_trait::async_trait;
use noctua_llm::{InvokeConfig, InvokeError, InvokeOutcome, LlmClient};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedLlmClient;

#[async_trait]
impl LlmClient for UnimplementedLlmClient {
    async fn invoke(&self, _prompt: &str, _config: &InvokeConfig) -> Result<InvokeOutcome, InvokeError> {
        Err(InvokeError::Generic(
            "no LlmClient wired: this build only has the unimplemented stub — link a \
             real model transport to run a pipeline"
                .to_string(),
        ))
    }
}
