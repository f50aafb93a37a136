//! Single and batch fact-checking runs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use colored::*;
use factcheck_pipeline::{
    BatchInput, BatchRunner, JsonlRecorder, NoopObserver, Pipeline, RunReport, StageObserver,
};
use factcheck_types::{CancelSignal, ExecutionError, RunContext, State, StateRead};
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tracing::info;

use crate::error::{CliError, CliResult};
use crate::output::{print_output, print_single, print_warning, OutputFormat};
use crate::Context;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Response text to check
    #[arg(short, long)]
    response: String,

    /// Question the response answers
    #[arg(short, long, default_value = "")]
    question: String,

    /// Extra initial state entries
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Name of the run record file
    #[arg(long)]
    sample_name: Option<String>,

    /// Do not write a run record
    #[arg(long)]
    no_record: bool,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// JSONL file; each line maps state keys to text, plus an optional sample_name
    #[arg(short, long)]
    input: PathBuf,

    /// Maximum concurrent runs
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Do not write run records
    #[arg(long)]
    no_record: bool,
}

#[derive(Debug, Deserialize)]
struct BatchRecord {
    #[serde(default)]
    sample_name: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Tabled)]
struct ClaimRow {
    claim: String,
    verdict: String,
}

#[derive(Debug, Serialize, Tabled)]
struct BatchRow {
    sample: String,
    status: String,
    verdict: String,
    detail: String,
}

fn recorder(ctx: &Context, disabled: bool) -> Option<JsonlRecorder> {
    (!disabled).then(|| JsonlRecorder::new(ctx.config.runs_dir()))
}

fn final_verdict(report: &RunReport) -> String {
    report
        .state
        .verdict("verdict")
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "-".to_string())
}

pub async fn check(args: CheckArgs, ctx: &Context) -> CliResult<()> {
    let pipeline = Pipeline::from_config(&ctx.config, &ctx.registry)?;

    let mut state = State::new()
        .with("question", args.question)
        .with("response", args.response);
    for entry in &args.set {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| CliError::InvalidInput(format!("expected KEY=VALUE, got '{entry}'")))?;
        state.insert(key.trim(), value);
    }

    let mut run_ctx = RunContext::new().with_cancel(ctx.cancel.clone());
    if let Some(name) = args.sample_name {
        run_ctx = run_ctx.with_sample_name(name);
    }

    let recorder = recorder(ctx, args.no_record);
    let observer: &dyn StageObserver = match &recorder {
        Some(recorder) => {
            recorder.remove(&run_ctx.sample_name)?;
            recorder
        }
        None => &NoopObserver,
    };

    let report = pipeline.run_with(state, &run_ctx, observer).await?;
    if let Some(recorder) = &recorder {
        info!(path = %recorder.path_for(&run_ctx.sample_name).display(), "Run recorded");
    }

    match ctx.format {
        OutputFormat::Table => print_report_table(&report),
        format => print_single(&report, format),
    }
}

fn print_report_table(report: &RunReport) -> CliResult<()> {
    println!("{} {}", "Stages:".bold(), report.completed.join(" → "));
    if let Some(halted) = &report.halted {
        print_warning(&format!("Halted at {}: {}", halted.stage, halted.reason));
    }
    if let Ok(verdicts) = report.state.claim_verdicts("claim_verdicts") {
        let rows = verdicts
            .iter()
            .map(|v| ClaimRow {
                claim: v.claim.clone(),
                verdict: v.verdict.to_string(),
            })
            .collect();
        print_output(rows, OutputFormat::Table)?;
    }
    if let Ok(revised) = report.state.text("revised_response") {
        println!("{} {}", "Revised:".bold(), revised);
    }
    println!("{} {}", "Verdict:".bold(), final_verdict(report));
    Ok(())
}

pub async fn batch(args: BatchArgs, ctx: &Context) -> CliResult<()> {
    let pipeline = Arc::new(Pipeline::from_config(&ctx.config, &ctx.registry)?);

    let content = std::fs::read_to_string(&args.input)?;
    let mut inputs = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: BatchRecord = serde_json::from_str(line).map_err(|e| {
            CliError::InvalidInput(format!("{} line {}: {e}", args.input.display(), number + 1))
        })?;
        let state = record
            .fields
            .into_iter()
            .fold(State::new(), |state, (key, value)| state.with(key, value));
        let name = record
            .sample_name
            .unwrap_or_else(|| format!("line-{}", number + 1));
        inputs.push(BatchInput::named(name, state));
    }
    let names: Vec<String> = inputs
        .iter()
        .filter_map(|input| input.sample_name.clone())
        .collect();

    let recorder = recorder(ctx, args.no_record);
    let observer: &dyn StageObserver = match &recorder {
        Some(recorder) => {
            for name in &names {
                recorder.remove(name)?;
            }
            recorder
        }
        None => &NoopObserver,
    };

    let results = BatchRunner::new(pipeline)
        .with_concurrency(args.concurrency)
        .with_cancel(ctx.cancel.clone())
        .run(inputs, observer)
        .await;

    let interrupted = interruption(&results, &ctx.cancel);

    let rows: Vec<BatchRow> = names
        .into_iter()
        .zip(results)
        .map(|(sample, result)| match result {
            Ok(report) => BatchRow {
                sample,
                status: if report.halted.is_some() { "halted" } else { "ok" }.to_string(),
                verdict: final_verdict(&report),
                detail: report
                    .halted
                    .map(|h| h.reason)
                    .unwrap_or_default(),
            },
            Err(err) => BatchRow {
                sample,
                status: "failed".to_string(),
                verdict: "-".to_string(),
                detail: err.to_string(),
            },
        })
        .collect();

    print_output(rows, ctx.format)?;
    match interrupted {
        Some(err) => {
            print_warning("Batch was interrupted; remaining records were cancelled");
            Err(err.into())
        }
        None => Ok(()),
    }
}

/// The cancellation that cut a batch short, if any.
fn interruption(
    results: &[Result<RunReport, ExecutionError>],
    cancel: &CancelSignal,
) -> Option<ExecutionError> {
    if !cancel.is_cancelled() {
        return None;
    }
    let cancelled = results.iter().find_map(|result| match result {
        Err(err @ ExecutionError::Cancelled { .. }) => Some(err.clone()),
        _ => None,
    });
    Some(cancelled.unwrap_or_else(|| ExecutionError::Cancelled {
        stage: "batch".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use factcheck_types::cancel_pair;

    fn cancelled(stage: &str) -> Result<RunReport, ExecutionError> {
        Err(ExecutionError::Cancelled {
            stage: stage.to_string(),
        })
    }

    #[test]
    fn uninterrupted_batch_is_ok() {
        let (_handle, signal) = cancel_pair();
        assert!(interruption(&[cancelled("verify")], &signal).is_none());
    }

    #[test]
    fn interrupted_batch_exits_as_cancelled() {
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let err = interruption(&[cancelled("retrieve")], &signal).unwrap();
        assert_eq!(
            err,
            ExecutionError::Cancelled {
                stage: "retrieve".into()
            }
        );
        assert_eq!(CliError::from(err).exit_code(), 130);

        let err = interruption(&[], &signal).unwrap();
        assert_eq!(CliError::from(err).exit_code(), 130);
    }
}
