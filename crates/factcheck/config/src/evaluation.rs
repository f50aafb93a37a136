use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How abstaining predictions are scored in classification benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstainPolicy {
    /// Abstentions stay in the denominator and never match the gold label.
    #[default]
    CountAsIncorrect,
    /// Abstentions are left out of the metrics and reported separately.
    Exclude,
}

/// Which evaluator scores a benchmark dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    /// Yes/no questions with a fixed answer per topic.
    Snowballing,
    /// Answerable vs unanswerable questions.
    SelfAware,
    /// Judge-rated short answers.
    FreshQa,
    /// Free-form answers checked claim by claim through the pipeline.
    FreeText,
}

impl EvaluatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatorKind::Snowballing => "snowballing",
            EvaluatorKind::SelfAware => "self_aware",
            EvaluatorKind::FreshQa => "fresh_qa",
            EvaluatorKind::FreeText => "free_text",
        }
    }
}

/// Name, location and evaluator of one benchmark dataset.
///
/// The name is a value rather than a map key, so its case survives loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSource {
    /// Used for report sections, cache and figure paths.
    pub name: String,
    /// JSONL file of benchmark questions.
    pub path: PathBuf,
    pub evaluator: EvaluatorKind,
}

impl DatasetSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, evaluator: EvaluatorKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            evaluator,
        }
    }
}

/// Per-call prices used to estimate free-text evaluation cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_llm_price")]
    pub llm_price_per_call: f64,

    #[serde(default = "default_search_price")]
    pub search_price_per_call: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            llm_price_per_call: default_llm_price(),
            search_price_per_call: default_search_price(),
        }
    }
}

/// Benchmark evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub abstain_policy: AbstainPolicy,

    /// Maximum concurrent pipeline runs during free-text evaluation.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Only accept answers that start with yes/no in the snowballing benchmark.
    #[serde(default)]
    pub strict_yes_no: bool,

    /// Similarity above which a response counts as expressing uncertainty.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default)]
    pub pricing: PricingConfig,

    /// Benchmark datasets, evaluated in order.
    #[serde(default)]
    pub datasets: Vec<DatasetSource>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            abstain_policy: AbstainPolicy::default(),
            concurrency: default_concurrency(),
            strict_yes_no: false,
            similarity_threshold: default_similarity_threshold(),
            pricing: PricingConfig::default(),
            datasets: Vec::new(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_similarity_threshold() -> f64 {
    0.75
}

fn default_llm_price() -> f64 {
    0.015
}

fn default_search_price() -> f64 {
    0.001
}
