//! Fact-checker accuracy against gold claim or document labels.

use std::path::Path;

use factcheck_config::AbstainPolicy;
use factcheck_types::AggregationError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classification::{ClassificationEvaluator, ClassificationSummary, Prediction};
use crate::dataset::load_jsonl;

/// Granularity of the gold labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoldLevel {
    /// `claim_label` per claim.
    Claims,
    /// `response_label` per document.
    Documents,
}

impl GoldLevel {
    fn field(&self) -> &'static str {
        match self {
            GoldLevel::Claims => "claim_label",
            GoldLevel::Documents => "response_label",
        }
    }
}

/// One fact-checker output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckerPrediction {
    pub label: bool,
    /// Seconds spent.
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub cost: f64,
}

impl CheckerPrediction {
    pub fn new(label: bool) -> Self {
        Self {
            label,
            time: 0.0,
            cost: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoldRecord {
    #[serde(default)]
    claim_label: Option<bool>,
    #[serde(default)]
    response_label: Option<bool>,
}

/// Checker accuracy plus resource totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerSummary {
    pub level: GoldLevel,
    pub classification: ClassificationSummary,
    pub total_time: f64,
    pub total_cost: f64,
    pub num_samples: usize,
}

#[derive(Debug, Clone)]
pub struct CheckerEvaluator {
    classifier: ClassificationEvaluator,
}

impl CheckerEvaluator {
    pub fn new(policy: AbstainPolicy) -> Self {
        Self {
            classifier: ClassificationEvaluator::boolean(policy),
        }
    }

    /// Read gold labels of `level` from a JSONL file.
    pub fn load_gold(path: &Path, level: GoldLevel) -> Result<Vec<bool>, AggregationError> {
        let records: Vec<GoldRecord> = load_jsonl(path)?;
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let label = match level {
                    GoldLevel::Claims => record.claim_label,
                    GoldLevel::Documents => record.response_label,
                };
                label.ok_or_else(|| AggregationError::Dataset {
                    path: path.display().to_string(),
                    reason: format!("record {} has no {}", i + 1, level.field()),
                })
            })
            .collect()
    }

    pub fn evaluate(
        &self,
        level: GoldLevel,
        gold: &[bool],
        predictions: &[CheckerPrediction],
    ) -> Result<CheckerSummary, AggregationError> {
        let gold_labels: Vec<&str> = gold.iter().map(|g| if *g { "true" } else { "false" }).collect();
        let predicted: Vec<Prediction> = predictions.iter().map(|p| Prediction::from(p.label)).collect();
        let classification = self.classifier.evaluate_pairs(&gold_labels, &predicted)?;

        let summary = CheckerSummary {
            level,
            classification,
            total_time: predictions.iter().map(|p| p.time).sum(),
            total_cost: predictions.iter().map(|p| p.cost).sum(),
            num_samples: predictions.len(),
        };
        info!(
            level = level.field(),
            samples = summary.num_samples,
            accuracy = summary.classification.accuracy,
            "Checker evaluated"
        );
        Ok(summary)
    }
}
