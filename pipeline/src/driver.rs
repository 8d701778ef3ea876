//! Pipeline driver.
//!
//! `run_pipeline` sequences the six stages strictly: each stage builds a
//! prompt, invokes the model under retry and, for the file-writing stages,
//! the file-presence wrapper, updates state, and emits progress. The public
//! entry point never surfaces a stage failure as `Err` — only a setup
//! failure outside the state machine (the workspace directory could not be
//! created) does.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use noctua_llm::{InvokeConfig, LlmClient, RetryingClient, backoff_delay, is_transient};
use noctua_tools::{BashGuardrail, ToolSet};
use noctua_types::{NonEmptyString, PipelineEvent, ReasoningEffort, Stage, TestReport, slugify};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineOptions;
use crate::diagnosis::{self, FailureCategory};
use crate::events::{self, PipelineObserver, ToolEventAdapter};
use crate::file_presence;
use crate::persistence::{append_debug_log, save_state};
use crate::prompts;
use crate::state::PipelineState;
use crate::structured_output;
use crate::workspace::Workspace;

/// Bases for the retry/backoff wrapper. Recon's explore and synthesize
/// phases each have their own base; every other stage reuses explore's
/// (see DESIGN.md).
const EXPLORE_BACKOFF_BASE: Duration = Duration::from_secs(30);
const SYNTHESIZE_BACKOFF_BASE: Duration = Duration::from_secs(15);
const STAGE_BACKOFF_BASE: Duration = Duration::from_secs(30);
const STAGE_MAX_ATTEMPTS: u32 = 3;

/// Wait between recon's explore and synthesize phases.
const RECON_COOLDOWN: Duration = Duration::from_secs(15);

/// Findings shorter than this are fatal to recon.
const MIN_FINDINGS_LEN: usize = 50;
/// Findings are truncated to this many characters.
const FINDINGS_MAX_LEN: usize = 15_000;

/// Turn cap for the code-writing and test/repair stages. Explore's cap is
/// documented explicitly (1000, a safety net); the rest reuse this
/// generous constant rather than several differently-guessed numbers (see
/// DESIGN.md).
const HIGH_TURN_CAP: u32 = 200;

/// A fatal, stage-scoped failure reason. Converted into `PipelineState::fail`
/// plus a `stage_error`/`pipeline_failed` event pair at the driver's outer
/// edge; never leaves this module as a Rust `Err` beyond that boundary.
#[derive(Debug, Clone)]
struct StageFailure(String);

impl StageFailure {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run the full RECON → SCHEMA → CODEGEN → TEST ⇄ REPAIR → HARDEN →
/// DONE/FAILED pipeline.
///
/// The returned `PipelineState.current_stage` is always `done` or `failed`.
/// The pipeline's own event stream (delivered synchronously to
/// `options.observer`) is the run's observable trace; there is no separate
/// trace value to thread through, since the driver is single-flow and every
/// event it emits is already ordered and timestamped by the moment `emit`
/// is called.
pub async fn run_pipeline(
    client: &dyn LlmClient,
    target_url: impl Into<String>,
    user_intent: impl Into<String>,
    options: PipelineOptions,
    cancel: CancellationToken,
) -> anyhow::Result<PipelineState> {
    let target_url = NonEmptyString::new(target_url.into())
        .map_err(|_| anyhow::anyhow!("target_url must not be empty"))?
        .into_inner();
    let user_intent = NonEmptyString::new(user_intent.into())
        .map_err(|_| anyhow::anyhow!("user_intent must not be empty"))?
        .into_inner();
    let project_name = slugify(&user_intent);
    let started_at = Utc::now();

    let workspace = Workspace::new(&options.base_dir, &project_name);
    workspace
        .ensure_dirs()
        .map_err(|err| anyhow::anyhow!("failed to create pipeline workspace: {err}"))?;

    let mut state = PipelineState::new(
        project_name,
        target_url,
        user_intent,
        &workspace,
        options.max_repair_attempts,
        started_at,
    );
    save_state(&workspace.state_path(), &state).await?;

    let guardrail = Arc::new(BashGuardrail::new(workspace.work_dir()));
    let observer = options.observer.clone();

    if cancel.is_cancelled() {
        return Ok(state);
    }

    // ---- RECON ----
    events::emit(observer.as_ref(), PipelineEvent::StageStart { stage: Stage::Recon });
    let recon_started = Instant::now();
    match run_recon(client, &state, &workspace, &options, &observer).await {
        Ok(report) => {
            state.set_recon_report(report);
            save_state(&workspace.state_path(), &state).await?;
            events::emit(
                observer.as_ref(),
                PipelineEvent::StageComplete {
                    stage: Stage::Recon,
                    duration: recon_started.elapsed(),
                    summary: Some("site analysis complete".to_string()),
                },
            );
        }
        Err(failure) => {
            return finish_failed(&mut state, Stage::Recon, failure, &workspace, &observer).await;
        }
    }
    if cancel.is_cancelled() {
        return Ok(state);
    }

    // ---- SCHEMA ----
    state.transition_to(Stage::Schema);
    save_state(&workspace.state_path(), &state).await?;
    events::emit(observer.as_ref(), PipelineEvent::StageStart { stage: Stage::Schema });
    let schema_started = Instant::now();
    match run_schema(client, &state, &workspace, &guardrail, &options, &observer).await {
        Ok(()) => {
            state.set_schema_path(workspace.schema_path());
            save_state(&workspace.state_path(), &state).await?;
            events::emit(
                observer.as_ref(),
                PipelineEvent::StageComplete {
                    stage: Stage::Schema,
                    duration: schema_started.elapsed(),
                    summary: Some("schema written".to_string()),
                },
            );
        }
        Err(failure) => {
            return finish_failed(&mut state, Stage::Schema, failure, &workspace, &observer).await;
        }
    }
    if cancel.is_cancelled() {
        return Ok(state);
    }

    // ---- CODEGEN ----
    state.transition_to(Stage::Codegen);
    save_state(&workspace.state_path(), &state).await?;
    events::emit(observer.as_ref(), PipelineEvent::StageStart { stage: Stage::Codegen });
    let codegen_started = Instant::now();
    match run_codegen(client, &state, &workspace, &guardrail, &options, &observer).await {
        Ok(()) => {
            save_state(&workspace.state_path(), &state).await?;
            events::emit(
                observer.as_ref(),
                PipelineEvent::StageComplete {
                    stage: Stage::Codegen,
                    duration: codegen_started.elapsed(),
                    summary: Some("scraper generated".to_string()),
                },
            );
        }
        Err(failure) => {
            return finish_failed(&mut state, Stage::Codegen, failure, &workspace, &observer).await;
        }
    }
    if cancel.is_cancelled() {
        return Ok(state);
    }

    // ---- TEST ⇄ REPAIR ----
    state.transition_to(Stage::Test);
    save_state(&workspace.state_path(), &state).await?;
    loop {
        events::emit(observer.as_ref(), PipelineEvent::StageStart { stage: Stage::Test });
        let test_started = Instant::now();
        let report = match run_test(client, &workspace, &guardrail, &options, &observer).await {
            Ok(report) => report,
            Err(failure) => {
                return finish_failed(&mut state, Stage::Test, failure, &workspace, &observer).await;
            }
        };

        let attempt = state.push_test_result(report.clone());
        save_test_report(&workspace, &report).await?;
        save_state(&workspace.state_path(), &state).await?;
        events::emit(
            observer.as_ref(),
            PipelineEvent::TestResult {
                report: Box::new(report.clone()),
                attempt: attempt as u32,
            },
        );
        events::emit(
            observer.as_ref(),
            PipelineEvent::StageComplete {
                stage: Stage::Test,
                duration: test_started.elapsed(),
                summary: Some(test_summary(&report)),
            },
        );

        if report.success {
            state.transition_to(Stage::Harden);
            save_state(&workspace.state_path(), &state).await?;
            break;
        }

        if cancel.is_cancelled() {
            return Ok(state);
        }

        if state.repair_attempts >= state.max_repair_attempts {
            let failure = StageFailure::new(format!(
                "test still failing after {} repair attempt(s) (max {}); last run: exit_code={}, record_count={}, {} schema error(s)",
                state.repair_attempts,
                state.max_repair_attempts,
                report.exit_code,
                report.record_count,
                report.schema_errors.len(),
            ));
            return finish_failed(&mut state, Stage::Repair, failure, &workspace, &observer).await;
        }

        let attempt = state.increment_repair_attempts();
        save_state(&workspace.state_path(), &state).await?;
        events::emit(
            observer.as_ref(),
            PipelineEvent::RepairAttempt {
                attempt,
                max_attempts: state.max_repair_attempts,
            },
        );

        state.transition_to(Stage::Repair);
        save_state(&workspace.state_path(), &state).await?;
        events::emit(observer.as_ref(), PipelineEvent::StageStart { stage: Stage::Repair });
        let repair_started = Instant::now();
        match run_repair(client, &state, &workspace, &guardrail, &options, &observer).await {
            Ok(()) => {
                events::emit(
                    observer.as_ref(),
                    PipelineEvent::StageComplete {
                        stage: Stage::Repair,
                        duration: repair_started.elapsed(),
                        summary: Some(format!("repair attempt {attempt} applied")),
                    },
                );
            }
            Err(failure) => {
                return finish_failed(&mut state, Stage::Repair, failure, &workspace, &observer).await;
            }
        }

        state.transition_to(Stage::Test);
        save_state(&workspace.state_path(), &state).await?;

        if cancel.is_cancelled() {
            return Ok(state);
        }
    }

    // ---- HARDEN ----
    events::emit(observer.as_ref(), PipelineEvent::StageStart { stage: Stage::Harden });
    let harden_started = Instant::now();
    match run_harden(client, &workspace, &guardrail, &options, &observer).await {
        Ok(()) => {
            if !workspace.index_path().exists() {
                let failure = StageFailure::new(format!(
                    "harden completed but {} is missing",
                    workspace.index_path().display()
                ));
                return finish_failed(&mut state, Stage::Harden, failure, &workspace, &observer).await;
            }
            events::emit(
                observer.as_ref(),
                PipelineEvent::StageComplete {
                    stage: Stage::Harden,
                    duration: harden_started.elapsed(),
                    summary: Some("hardening applied".to_string()),
                },
            );
        }
        Err(failure) => {
            return finish_failed(&mut state, Stage::Harden, failure, &workspace, &observer).await;
        }
    }

    state.complete(Utc::now());
    save_state(&workspace.state_path(), &state).await?;
    let record_count = state.test_results.last().map_or(0, |r| r.record_count);
    events::emit(
        observer.as_ref(),
        PipelineEvent::PipelineComplete {
            scraper_dir: workspace.scraper_dir().to_path_buf(),
            record_count,
        },
    );

    Ok(state)
}

async fn finish_failed(
    state: &mut PipelineState,
    stage: Stage,
    failure: StageFailure,
    workspace: &Workspace,
    observer: &Arc<dyn PipelineObserver>,
) -> anyhow::Result<PipelineState> {
    let message = failure.to_string();
    events::emit(observer.as_ref(), PipelineEvent::StageError { stage, error: message.clone() });
    state.fail(message.clone(), Utc::now());
    save_state(&workspace.state_path(), state).await?;
    let _ = append_debug_log(workspace, &format!("pipeline failed at {stage}: {message}")).await;
    events::emit(observer.as_ref(), PipelineEvent::PipelineFailed { reason: message, stage });
    Ok(state.clone())
}

async fn save_test_report(workspace: &Workspace, report: &TestReport) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(&report.to_wire())?;
    tokio::fs::write(workspace.test_report_path(), json).await?;
    Ok(())
}

fn test_summary(report: &TestReport) -> String {
    if report.success {
        format!(
            "passed: {} record(s) in {} ms",
            report.record_count, report.duration_ms
        )
    } else {
        format!(
            "failed: exit_code={}, {} schema error(s)",
            report.exit_code,
            report.schema_errors.len()
        )
    }
}

fn tool_observer(observer: &Arc<dyn PipelineObserver>, stage: Stage) -> Arc<dyn noctua_llm::InvokeObserver> {
    Arc::new(ToolEventAdapter::new(observer.clone(), stage))
}

// ---------------------------------------------------------------------
// Stage 1 — RECON
// ---------------------------------------------------------------------

async fn run_recon(
    client: &dyn LlmClient,
    state: &PipelineState,
    workspace: &Workspace,
    options: &PipelineOptions,
    observer: &Arc<dyn PipelineObserver>,
) -> Result<noctua_types::ReconReport, StageFailure> {
    let recon_budget = options.stage_budgets.for_stage(Stage::Recon);
    let explore_budget = recon_budget.fraction(0.7);
    let synthesize_budget = recon_budget.fraction(0.3);

    // --- Phase A: Explore ---
    let explore_config = InvokeConfig {
        model: options.model.clone(),
        tools: ToolSet::recon_explore(),
        max_turns: options.explore_max_turns,
        budget: explore_budget,
        reasoning_effort: ReasoningEffort::Medium,
        structured_output_schema: None,
        guardrail: None,
        instruction_prefix: Some("You are performing site reconnaissance.".to_string()),
        observer: tool_observer(observer, Stage::Recon),
    };
    let explore_prompt = prompts::explore_prompt(state);
    let explore_client = RetryingClient::new(client, STAGE_MAX_ATTEMPTS, EXPLORE_BACKOFF_BASE);
    let outcome = explore_client
        .invoke(&explore_prompt, &explore_config)
        .await
        .map_err(|err| StageFailure::new(format!("RECON explore failed: {err}")))?;

    let raw_findings = outcome
        .output
        .clone()
        .unwrap_or_else(|| outcome.concatenated_trail_text());
    let findings: String = raw_findings.chars().take(FINDINGS_MAX_LEN).collect();
    let _ = tokio::fs::write(workspace.findings_path(), &findings).await;

    if findings.chars().count() < MIN_FINDINGS_LEN {
        return Err(StageFailure::new(format!(
            "RECON explore produced insufficient findings ({} chars, need at least {MIN_FINDINGS_LEN})",
            findings.chars().count()
        )));
    }

    // --- Cool-down ---
    tokio::time::sleep(RECON_COOLDOWN).await;

    // --- Phase B: Synthesize ---
    let synthesize_config = InvokeConfig {
        model: options.model.clone(),
        tools: ToolSet::recon_synthesize(),
        max_turns: 1,
        budget: synthesize_budget,
        reasoning_effort: ReasoningEffort::Medium,
        structured_output_schema: Some(structured_output::recon_report_schema()),
        guardrail: None,
        instruction_prefix: None,
        observer: tool_observer(observer, Stage::Recon),
    };

    let mut last_turns = 0u32;
    let mut last_finish_reason = String::new();
    let mut last_validation_error = String::new();

    for attempt in 1..=STAGE_MAX_ATTEMPTS {
        let prompt = prompts::synthesize_prompt(state, &findings);
        match client.invoke(&prompt, &synthesize_config).await {
            Ok(outcome) => {
                last_turns = outcome.num_turns;
                last_finish_reason = outcome.finish_reason.clone();
                if let Some(raw) = &outcome.output {
                    let _ = tokio::fs::write(workspace.synth_attempt_path(attempt), raw).await;
                }

                match structured_output::validate_recon_report(&outcome) {
                    Ok(report) => {
                        if let Ok(json) = serde_json::to_vec_pretty(&report.to_wire()) {
                            let _ = tokio::fs::write(workspace.recon_report_path(), json).await;
                        }
                        return Ok(report);
                    }
                    Err(validation_err) => {
                        last_validation_error = validation_err.to_string();
                        if attempt < STAGE_MAX_ATTEMPTS {
                            tokio::time::sleep(backoff_delay(SYNTHESIZE_BACKOFF_BASE, attempt)).await;
                        }
                    }
                }
            }
            Err(err) if is_transient(&err) && attempt < STAGE_MAX_ATTEMPTS => {
                tokio::time::sleep(backoff_delay(SYNTHESIZE_BACKOFF_BASE, attempt)).await;
            }
            Err(err) => {
                return Err(StageFailure::new(format!("RECON synthesize failed: {err}")));
            }
        }
    }

    Err(StageFailure::new(format!(
        "RECON synthesize failed after {STAGE_MAX_ATTEMPTS} attempts: findings_len={}, turns={last_turns}, \
         finish_reason={last_finish_reason:?}, last_validation_error={last_validation_error}",
        findings.chars().count(),
    )))
}

// ---------------------------------------------------------------------
// Stage 2 — SCHEMA
// ---------------------------------------------------------------------

async fn run_schema(
    client: &dyn LlmClient,
    state: &PipelineState,
    workspace: &Workspace,
    guardrail: &Arc<BashGuardrail>,
    options: &PipelineOptions,
    observer: &Arc<dyn PipelineObserver>,
) -> Result<(), StageFailure> {
    let config = InvokeConfig {
        model: options.model.clone(),
        tools: ToolSet::code(),
        max_turns: HIGH_TURN_CAP,
        budget: options.stage_budgets.for_stage(Stage::Schema),
        reasoning_effort: ReasoningEffort::Low,
        structured_output_schema: None,
        guardrail: Some(guardrail.clone()),
        instruction_prefix: None,
        observer: tool_observer(observer, Stage::Schema),
    };
    let prompt = prompts::schema_prompt(state, workspace);
    let retrying = RetryingClient::new(client, STAGE_MAX_ATTEMPTS, STAGE_BACKOFF_BASE);
    file_presence::run_with_retry(
        &retrying,
        &prompt,
        &config,
        &[workspace.schema_path()],
        prompts::schema_retry_hint(),
    )
    .await
    .map_err(|err| StageFailure::new(format!("SCHEMA invocation failed: {err}")))?;

    if !workspace.schema_path().exists() {
        return Err(StageFailure::new(format!(
            "SCHEMA did not produce {}",
            workspace.schema_path().display()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Stage 3 — CODEGEN
// ---------------------------------------------------------------------

async fn run_codegen(
    client: &dyn LlmClient,
    state: &PipelineState,
    workspace: &Workspace,
    guardrail: &Arc<BashGuardrail>,
    options: &PipelineOptions,
    observer: &Arc<dyn PipelineObserver>,
) -> Result<(), StageFailure> {
    let config = InvokeConfig {
        model: options.model.clone(),
        tools: ToolSet::code(),
        max_turns: HIGH_TURN_CAP,
        budget: options.stage_budgets.for_stage(Stage::Codegen),
        reasoning_effort: ReasoningEffort::High,
        structured_output_schema: None,
        guardrail: Some(guardrail.clone()),
        instruction_prefix: None,
        observer: tool_observer(observer, Stage::Codegen),
    };
    let prompt = prompts::codegen_prompt(state, workspace, &options.base_dir);
    let retrying = RetryingClient::new(client, STAGE_MAX_ATTEMPTS, STAGE_BACKOFF_BASE);
    let expected = [workspace.scraper_path(), workspace.index_path()];
    file_presence::run_with_retry(&retrying, &prompt, &config, &expected, prompts::codegen_retry_hint())
        .await
        .map_err(|err| StageFailure::new(format!("CODEGEN invocation failed: {err}")))?;

    let missing: Vec<String> = expected
        .iter()
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(StageFailure::new(format!(
            "CODEGEN did not produce: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Stage 4/5 — TEST ⇄ REPAIR
// ---------------------------------------------------------------------

async fn run_test(
    client: &dyn LlmClient,
    workspace: &Workspace,
    guardrail: &Arc<BashGuardrail>,
    options: &PipelineOptions,
    observer: &Arc<dyn PipelineObserver>,
) -> Result<TestReport, StageFailure> {
    let config = InvokeConfig {
        model: options.model.clone(),
        tools: ToolSet::test(),
        max_turns: HIGH_TURN_CAP,
        budget: options.stage_budgets.for_stage(Stage::Test),
        reasoning_effort: ReasoningEffort::Low,
        structured_output_schema: Some(structured_output::test_report_schema()),
        guardrail: Some(guardrail.clone()),
        instruction_prefix: None,
        observer: tool_observer(observer, Stage::Test),
    };
    let prompt = prompts::test_prompt(workspace);
    let retrying = RetryingClient::new(client, STAGE_MAX_ATTEMPTS, STAGE_BACKOFF_BASE);
    let outcome = retrying
        .invoke(&prompt, &config)
        .await
        .map_err(|err| StageFailure::new(format!("TEST invocation failed: {err}")))?;

    structured_output::validate_test_report(&outcome)
        .map_err(|err| StageFailure::new(format!("TEST report did not validate: {err}")))
}

async fn run_repair(
    client: &dyn LlmClient,
    state: &PipelineState,
    _workspace: &Workspace,
    guardrail: &Arc<BashGuardrail>,
    options: &PipelineOptions,
    observer: &Arc<dyn PipelineObserver>,
) -> Result<(), StageFailure> {
    let category = state
        .test_results
        .last()
        .map(diagnosis::classify)
        .unwrap_or(FailureCategory::General);

    let config = InvokeConfig {
        model: options.model.clone(),
        tools: ToolSet::repair(),
        max_turns: HIGH_TURN_CAP,
        budget: options.stage_budgets.for_stage(Stage::Repair),
        reasoning_effort: ReasoningEffort::High,
        structured_output_schema: None,
        guardrail: Some(guardrail.clone()),
        instruction_prefix: None,
        observer: tool_observer(observer, Stage::Repair),
    };
    let prompt = prompts::repair_prompt(state, category);
    let retrying = RetryingClient::new(client, STAGE_MAX_ATTEMPTS, STAGE_BACKOFF_BASE);
    retrying
        .invoke(&prompt, &config)
        .await
        .map(|_| ())
        .map_err(|err| StageFailure::new(format!("REPAIR invocation failed: {err}")))
}

// ---------------------------------------------------------------------
// Stage 6 — HARDEN
// ---------------------------------------------------------------------

async fn run_harden(
    client: &dyn LlmClient,
    workspace: &Workspace,
    guardrail: &Arc<BashGuardrail>,
    options: &PipelineOptions,
    observer: &Arc<dyn PipelineObserver>,
) -> Result<(), StageFailure> {
    let config = InvokeConfig {
        model: options.model.clone(),
        tools: ToolSet::code(),
        max_turns: HIGH_TURN_CAP,
        budget: options.stage_budgets.for_stage(Stage::Harden),
        reasoning_effort: ReasoningEffort::Medium,
        structured_output_schema: None,
        guardrail: Some(guardrail.clone()),
        instruction_prefix: None,
        observer: tool_observer(observer, Stage::Harden),
    };
    let prompt = prompts::harden_prompt(workspace);
    let retrying = RetryingClient::new(client, STAGE_MAX_ATTEMPTS, STAGE_BACKOFF_BASE);
    retrying
        .invoke(&prompt, &config)
        .await
        .map(|_| ())
        .map_err(|err| StageFailure::new(format!("HARDEN invocation failed: {err}")))
}
