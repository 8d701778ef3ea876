//! `noctua` - CLI entry point for the scraper-development pipeline.
//!
//! Parses arguments, initializes tracing, wires a concrete [`LlmClient`]
//! (the unimplemented stub) and a console [`PipelineObserver`] into
//! [`run_pipeline`], and prints the final state. Ctrl-C cancels at the
//! next stage boundary.

mod console_observer;
mod stub_client;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use console_observer::ConsoleObserver;
use noctua_llm::ModelHandle;
use noctua_pipeline::{PipelineOptions, run_pipeline};
use noctua_types::Stage;
use stub_client::UnimplementedLlmClient;

/// Drive the scraper-development pipeline for a target site.
#[derive(Debug, Parser)]
#[command(name = "noctua", version, about)]
struct Args {
    /// The site to build a scraper for.
    target_url: String,

    /// What data to extract, in plain language.
    user_intent: String,

    /// Directory under which `.noctua/pipelines/{project}` is created.
    #[arg(long, env = "NOCTUA_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Model handle passed through to the LLM invocation primitive.
    #[arg(long, default_value = "default")]
    model: String,

    /// Ceiling on REPAIR-loop attempts before the pipeline gives up.
    #[arg(long, default_value_t = noctua_pipeline::DEFAULT_MAX_REPAIR_ATTEMPTS)]
    max_repair_attempts: u32,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("received interrupt, cancelling at the next stage boundary");
                cancel.cancel();
            }
        });
    }

    let options = PipelineOptions::new(args.base_dir, ModelHandle::new(args.model))
        .with_max_repair_attempts(args.max_repair_attempts)
        .with_observer(std::sync::Arc::new(ConsoleObserver));

    let client = UnimplementedLlmClient;
    let result = run_pipeline(&client, args.target_url, args.user_intent, options, cancel).await;

    match result {
        Ok(state) if state.current_stage == Stage::Done => {
            println!(
                "pipeline complete: scraper at {}",
                state.scraper_dir.display()
            );
            ExitCode::SUCCESS
        }
        Ok(state) => {
            eprintln!(
                "pipeline failed at stage {}: {}",
                state.current_stage,
                state.error.as_deref().unwrap_or("(no error recorded)")
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("pipeline setup failed: {err}");
            ExitCode::FAILURE
        }
    }
}
