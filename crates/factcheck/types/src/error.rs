use thiserror::Error;

use crate::descriptor::CapabilityKind;
use crate::state::StateKey;

/// Malformed or unresolvable configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown solver: {0}")]
    UnknownSolver(String),

    #[error("solver already registered: {0}")]
    DuplicateSolver(String),

    #[error("solver {name} is registered as {registered} but configured as {declared}")]
    KindMismatch {
        name: String,
        registered: CapabilityKind,
        declared: CapabilityKind,
    },

    #[error("unknown capability kind: {0}")]
    UnknownKind(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("parameter '{0}' must be a scalar value")]
    NestedParameter(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// A pipeline whose structure cannot run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("pipeline has no stages")]
    EmptyPipeline,

    #[error("stage {stage} reads '{key}' which neither the initial state nor an earlier stage provides")]
    UnsatisfiedInput { stage: String, key: StateKey },

    #[error("stage {stage} ({kind}) cannot follow a {previous} stage")]
    KindOrder {
        stage: String,
        kind: CapabilityKind,
        previous: CapabilityKind,
    },

    #[error("duplicate stage name: {0}")]
    DuplicateStage(String),

    #[error("stage {0} declares no output keys")]
    NoOutputs(String),
}

/// Failure while a pipeline run is in progress.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("state key not found: {0}")]
    MissingKey(StateKey),

    #[error("stage {stage} read undeclared key '{key}'")]
    UndeclaredRead { stage: String, key: StateKey },

    #[error("stage {stage} wrote undeclared key '{key}'")]
    UndeclaredWrite { stage: String, key: StateKey },

    #[error("stage {stage} did not write declared output '{key}'")]
    MissingOutput { stage: String, key: StateKey },

    #[error("state key '{key}' holds {found}, expected {expected}")]
    TypeMismatch {
        key: StateKey,
        expected: &'static str,
        found: &'static str,
    },

    #[error("external service failure in {stage}: {message}")]
    External { stage: String, message: String },

    #[error("stage {stage} timed out after {elapsed_ms} ms")]
    Timeout { stage: String, elapsed_ms: u64 },

    #[error("run cancelled during stage {stage}")]
    Cancelled { stage: String },

    #[error("stage {stage} failed: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("failed to record run: {0}")]
    Recording(String),
}

impl ExecutionError {
    /// Whether the failure is transient and the caller may retry the run.
    ///
    /// Only external-service failures and timeouts qualify. Contract
    /// violations and cancellation never succeed on retry.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ExecutionError::External { .. } | ExecutionError::Timeout { .. }
        )
    }
}

/// Failure while computing benchmark metrics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("record {record}: unparseable output: {reason}")]
    Unparsed { record: String, reason: String },

    #[error("record {record}: label '{label}' is not in the label set")]
    UnknownLabel { record: String, label: String },

    #[error("length mismatch: {expected} gold records but {found} predictions")]
    LengthMismatch { expected: usize, found: usize },

    #[error("label set is empty")]
    EmptyLabelSet,

    #[error("label '{0}' is reserved")]
    ReservedLabel(String),

    #[error("failed to read dataset {path}: {reason}")]
    Dataset { path: String, reason: String },
}

/// Any factcheck failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactCheckError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline validation error: {0}")]
    Validation(#[from] ConfigValidationError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("aggregation error: {0}")]
    Aggregation(#[from] AggregationError),
}

/// Result type for operations that may fail with any factcheck error.
pub type FactCheckResult<T> = std::result::Result<T, FactCheckError>;
