//! factcheck - command-line interface for fact-checking pipelines
//!
//! - List the registered solvers
//! - Validate the configured pipeline
//! - Check one response or a batch of responses
//! - Evaluate fact-checkers and LLMs on benchmark datasets

use clap::{Parser, Subcommand};
use factcheck_config::FactCheckConfig;
use factcheck_solvers::SolverRegistry;
use factcheck_types::{cancel_pair, CancelSignal};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use commands::{check, evaluate, solvers, validate};
use error::CliResult;
use output::{print_error, OutputFormat};

#[derive(Parser)]
#[command(name = "factcheck")]
#[command(about = "Modular fact-checking pipelines and factuality evaluation", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (YAML, JSON or TOML)
    #[arg(short, long, env = "FACTCHECK_CONFIG")]
    config: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, env = "FACTCHECK_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered solvers
    Solvers {
        /// Only solvers of this kind (claim_processor, retriever, verifier)
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Validate the configured pipeline without running it
    Validate,

    /// Fact-check a single response
    Check(check::CheckArgs),

    /// Fact-check every record of a JSONL file
    Batch(check::BatchArgs),

    /// Evaluate fact-checkers or LLMs on benchmarks
    Evaluate {
        #[command(subcommand)]
        command: evaluate::EvaluateCommands,
    },
}

/// Everything a command needs.
pub struct Context {
    pub config: FactCheckConfig,
    pub registry: SolverRegistry,
    pub format: OutputFormat,
    pub cancel: CancelSignal,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match FactCheckConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            print_error(&e.to_string());
            std::process::exit(2);
        }
    };
    init_tracing(&config, cli.verbose, cli.log_json);

    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            handle.cancel();
        }
    });

    let ctx = Context {
        config,
        registry: SolverRegistry::with_builtins(),
        format: cli.output,
        cancel,
    };

    if let Err(e) = run(cli.command, &ctx).await {
        print_error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Commands, ctx: &Context) -> CliResult<()> {
    match command {
        Commands::Solvers { kind } => solvers::execute(kind.as_deref(), ctx),
        Commands::Validate => validate::execute(ctx),
        Commands::Check(args) => check::check(args, ctx).await,
        Commands::Batch(args) => check::batch(args, ctx).await,
        Commands::Evaluate { command } => evaluate::execute(command, ctx).await,
    }
}

fn init_tracing(config: &FactCheckConfig, verbose: bool, json: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
