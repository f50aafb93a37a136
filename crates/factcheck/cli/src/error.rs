//! CLI error types

use factcheck_types::{AggregationError, ConfigError, ExecutionError, FactCheckError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    FactCheck(#[from] FactCheckError),

    #[error("Run failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Evaluation failed: {0}")]
    Aggregation(#[from] AggregationError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Process exit status: 2 for configuration problems, 130 for Ctrl-C, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_)
            | CliError::FactCheck(FactCheckError::Config(_))
            | CliError::FactCheck(FactCheckError::Validation(_)) => 2,
            CliError::Execution(ExecutionError::Cancelled { .. })
            | CliError::FactCheck(FactCheckError::Execution(ExecutionError::Cancelled { .. })) => 130,
            _ => 1,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
