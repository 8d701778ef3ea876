//! File-presence wrapper.
//!
//! `run_with_retry` executes the invocation once, checks that every path in
//! `expected_files` exists, and if any is missing retries exactly once with
//! a reinforced prompt. It does not itself decide pipeline failure; the
//! caller checks file presence on the returned outcome and is responsible
//! for the missing-artifact failure path.

use std::path::{Path, PathBuf};

use noctua_llm::{InvokeConfig, InvokeError, InvokeOutcome, LlmClient};

/// Build the reinforced retry prompt: `original ⧺ retry_context(missing, retry_hint)`.
fn retry_prompt(original: &str, missing: &[PathBuf], retry_hint: &str) -> String {
    let missing_list = missing
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{original}\n\n\
         The previous attempt did not produce the following required file(s): {missing_list}.\n\
         {retry_hint}"
    )
}

fn missing_of<'a>(expected_files: &'a [PathBuf]) -> Vec<&'a Path> {
    expected_files
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| !path.exists())
        .collect()
}

/// Invoke once, verify `expected_files`, and retry at most once on a
/// missing file. Returns the outcome of whichever attempt ran last; the
/// caller re-checks `expected_files` against the filesystem afterward.
pub async fn run_with_retry(
    client: &dyn LlmClient,
    prompt: &str,
    config: &InvokeConfig,
    expected_files: &[PathBuf],
    retry_hint: &str,
) -> Result<InvokeOutcome, InvokeError> {
    let outcome = client.invoke(prompt, config).await?;

    let missing: Vec<PathBuf> = missing_of(expected_files)
        .into_iter()
        .map(Path::to_path_buf)
        .collect();
    if missing.is_empty() {
        return Ok(outcome);
    }

    tracing::warn!(?missing, "expected file(s) missing after first attempt, retrying once");
    let reinforced = retry_prompt(prompt, &missing, retry_hint);
    client.invoke(&reinforced, config).await
}
