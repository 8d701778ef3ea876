//! The LLM invocation contract and the retry/backoff wrapper.

pub mod contract;
pub mod retry;

pub use contract::{
    InvokeConfig, InvokeError, InvokeObserver, InvokeOutcome, LlmClient, ModelHandle, NullObserver,
    TrailMessage, TrailRole,
};
pub use retry::{RetryingClient, backoff_delay, is_transient, retry_with_backoff};
