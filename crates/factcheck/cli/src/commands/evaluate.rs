//! Benchmark evaluation commands

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Subcommand, ValueEnum};
use factcheck_evaluation::{
    load_jsonl, CheckerEvaluator, CheckerPrediction, DatasetSummary, EvaluationReport, GoldLevel,
    LlmEvaluator, ModelResponse,
};
use factcheck_pipeline::Pipeline;
use tracing::info;

use crate::error::CliResult;
use crate::output::{print_single, print_success, OutputFormat};
use crate::Context;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelArg {
    Claims,
    Documents,
}

impl From<LevelArg> for GoldLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Claims => GoldLevel::Claims,
            LevelArg::Documents => GoldLevel::Documents,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum EvaluateCommands {
    /// Score fact-checker predictions against gold labels
    Checker {
        /// JSONL of {"label": bool, "time": secs, "cost": usd}
        #[arg(short, long)]
        predictions: PathBuf,

        /// JSONL with claim_label / response_label fields
        #[arg(short, long)]
        gold: PathBuf,

        #[arg(short, long, value_enum, default_value = "claims")]
        level: LevelArg,

        /// Name shown in the report
        #[arg(long, default_value = "checker")]
        name: String,

        /// Where to write the report (default: <output_path>/checker_evaluator/<name>)
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Score LLM responses on the configured benchmark datasets
    Llm {
        /// JSONL of {"id": ..., "response": ...}
        #[arg(short, long)]
        responses: PathBuf,

        /// Model name, used for cache and report paths
        #[arg(short, long)]
        model: String,

        /// Where to write the report (default: <output_path>/llm_evaluator/<model>)
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
}

pub async fn execute(command: EvaluateCommands, ctx: &Context) -> CliResult<()> {
    let (report, report_dir) = match command {
        EvaluateCommands::Checker {
            predictions,
            gold,
            level,
            name,
            report_dir,
        } => {
            let level = GoldLevel::from(level);
            let predictions: Vec<CheckerPrediction> = load_jsonl(&predictions)?;
            let gold = CheckerEvaluator::load_gold(&gold, level)?;
            let summary = CheckerEvaluator::new(ctx.config.evaluation.abstain_policy)
                .evaluate(level, &gold, &predictions)?;

            let dir = report_dir.unwrap_or_else(|| {
                ctx.config.output_path.join("checker_evaluator").join(&name)
            });
            let report = EvaluationReport::new(name).with_dataset("checker", DatasetSummary::Checker(summary));
            (report, dir)
        }
        EvaluateCommands::Llm {
            responses,
            model,
            report_dir,
        } => {
            let responses: Vec<ModelResponse> = load_jsonl(&responses)?;
            let pipeline = Arc::new(Pipeline::from_config(&ctx.config, &ctx.registry)?);
            let report = LlmEvaluator::new(ctx.config.evaluation.clone())
                .with_pipeline(pipeline)
                .with_cache_root(ctx.config.evaluation_dir())
                .with_cancel(ctx.cancel.clone())
                .evaluate(&model, responses)
                .await?;

            let dir = report_dir.unwrap_or_else(|| ctx.config.evaluation_dir().join(&model));
            (report, dir)
        }
    };

    let written = report.write_to(&report_dir)?;
    info!(dir = %report_dir.display(), files = written.len(), "Evaluation report written");

    match ctx.format {
        OutputFormat::Table => {
            print!("{}", report.render(factcheck_evaluation::ReportFormat::Markdown)?);
            print_success(&format!("Report written to {}", report_dir.display()));
            Ok(())
        }
        format => print_single(&report, format),
    }
}
