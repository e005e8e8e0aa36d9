//! Render command handler
//!
//! Expands the selection into variant specs, runs them as one batch, shows
//! progress while it runs, and prints the per-variant outcome.

use anyhow::{Context, Result};
use atelier_client::GeneratorClient;
use atelier_core::Generator;
use atelier_core::domain::batch::BatchSummary;
use atelier_core::domain::job::{Job, JobStatus};
use atelier_core::domain::selection::Selection;
use atelier_orchestrator::{BatchHandle, Orchestrator};
use clap::Args;
use colored::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::presets;
use crate::simulate::SimulatedGenerator;

/// Arguments of `atelier render`
#[derive(Args)]
pub struct RenderArgs {
    /// Prompt shared by every variant
    prompt: String,

    /// Parameter the selected values are assigned to
    #[arg(long, default_value = "camera_angle")]
    axis: String,

    /// Values to render (defaults to every value of a built-in axis)
    #[arg(long, value_delimiter = ',')]
    values: Vec<String>,

    /// Simulated generator only: labels that fail on their first attempt
    #[arg(long = "fail")]
    fail: Vec<String>,

    /// Simulated generator only: latency of each call in milliseconds
    #[arg(long, default_value_t = 400)]
    latency_ms: u64,

    /// Regenerate failed variants once after the batch completes
    #[arg(long)]
    retry_failed: bool,

    /// Print the final batch report as JSON
    #[arg(long)]
    json: bool,
}

/// Handle `atelier render`
pub async fn handle_render_command(args: RenderArgs, config: &Config) -> Result<()> {
    let values = if args.values.is_empty() {
        presets::find(&args.axis)
            .map(|preset| preset.values.iter().map(|v| v.to_string()).collect::<Vec<_>>())
            .with_context(|| {
                format!("No --values given and '{}' is not a built-in axis", args.axis)
            })?
    } else {
        args.values
    };

    let specs = Selection::new(&args.axis)
        .with_base("prompt", args.prompt)
        .with_values(values)
        .into_specs();

    let generator = build_generator(config, args.fail, Duration::from_millis(args.latency_ms))?;
    let orchestrator = Orchestrator::new(generator);

    let batch = orchestrator
        .start_batch(specs, config.concurrency)
        .context("Failed to start batch")?;

    let progress = spawn_progress_printer(batch.subscribe());

    let mut summary = wait_or_cancel(&batch).await;

    if args.retry_failed && summary.error > 0 {
        let retried = batch.retry_failed();
        info!("Regenerating {} failed variant(s)", retried.len());
        summary = wait_or_cancel(&batch).await;
    }

    progress.abort();

    if args.json {
        let report = batch.report();
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize batch report")?
        );
    } else {
        print_batch(&batch.snapshot(), &summary);
    }

    let summary = batch.shutdown().await;
    if summary.error > 0 {
        anyhow::bail!("{} of {} variant(s) failed", summary.error, summary.total);
    }

    Ok(())
}

/// Chooses the HTTP generator when a URL is configured, the simulator otherwise
fn build_generator(
    config: &Config,
    flaky: Vec<String>,
    latency: Duration,
) -> Result<Arc<dyn Generator>> {
    match &config.generator_url {
        Some(url) => {
            if !flaky.is_empty() {
                warn!("--fail only applies to the simulated generator, ignoring");
            }
            let client = GeneratorClient::with_timeout(url, config.request_timeout)
                .context("Failed to build generator client")?;
            info!("Using generator at {}", client.base_url());
            Ok(Arc::new(client))
        }
        None => {
            info!("No generator URL configured, using the simulated generator");
            Ok(Arc::new(SimulatedGenerator::new(latency, flaky)))
        }
    }
}

/// Waits for the batch, cancelling pending variants on Ctrl-C
async fn wait_or_cancel(batch: &BatchHandle) -> BatchSummary {
    tokio::select! {
        summary = batch.wait_for_completion() => summary,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling pending variants");
            batch.cancel();
            batch.wait_for_completion().await
        }
    }
}

/// Prints a progress line on stderr whenever the summary changes
fn spawn_progress_printer(
    mut progress: watch::Receiver<BatchSummary>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let summary = *progress.borrow_and_update();
            eprintln!(
                "{} {}",
                format!("[{}/{}]", summary.settled(), summary.total).dimmed(),
                summary
            );
        }
    })
}

/// Print every job and the batch totals
fn print_batch(jobs: &[Job], summary: &BatchSummary) {
    println!("{}", format!("Rendered {} variant(s):", jobs.len()).bold());
    println!();

    for job in jobs {
        print_job_summary(job);
    }

    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  {} done, {} failed, {} cancelled",
        summary.done.to_string().green(),
        summary.error.to_string().red(),
        summary.cancelled.to_string().dimmed()
    );
}

/// Print a job summary line with its result or error
fn print_job_summary(job: &Job) {
    println!(
        "  {} {} {:<16} {}",
        "▸".cyan(),
        job.id.to_string().dimmed(),
        job.spec.label,
        colorize_status(&job.status)
    );

    if let Some(image) = &job.result {
        println!("      Image:    {}", image.to_string().cyan());
    }
    if let Some(error) = &job.error_message {
        println!("      Error:    {}", error.red());
    }
    if job.attempt > 1 {
        println!("      Attempts: {}", job.attempt);
    }
    if let Some(duration) = job.duration() {
        println!("      Duration: {}ms", duration.num_milliseconds());
    }
}

/// Colorize job status for display
fn colorize_status(status: &JobStatus) -> colored::ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Done => status_str.green(),
        JobStatus::Error => status_str.red(),
        JobStatus::Cancelled => status_str.dimmed(),
    }
}
