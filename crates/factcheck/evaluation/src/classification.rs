//! Confusion-matrix classification metrics.

use std::collections::BTreeMap;

use factcheck_config::AbstainPolicy;
use factcheck_types::AggregationError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Column name used for abstentions when they are scored.
pub const ABSTAIN_LABEL: &str = "abstain";

/// A parsed prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Label(String),
    /// The predictor explicitly declined to answer.
    Abstain,
}

impl Prediction {
    pub fn label(label: impl Into<String>) -> Self {
        Prediction::Label(label.into())
    }
}

impl From<bool> for Prediction {
    fn from(value: bool) -> Self {
        Prediction::Label(value.to_string())
    }
}

/// One record ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPrediction {
    pub record: String,
    pub gold: String,
    /// `Err` when the raw output could not be turned into a prediction.
    pub prediction: Result<Prediction, AggregationError>,
}

impl LabeledPrediction {
    pub fn new(record: impl Into<String>, gold: impl Into<String>, prediction: Prediction) -> Self {
        Self {
            record: record.into(),
            gold: gold.into(),
            prediction: Ok(prediction),
        }
    }

    pub fn unparsed(record: impl Into<String>, gold: impl Into<String>, reason: impl Into<String>) -> Self {
        let record = record.into();
        Self {
            prediction: Err(AggregationError::Unparsed {
                record: record.clone(),
                reason: reason.into(),
            }),
            record,
            gold: gold.into(),
        }
    }
}

/// Counts of (gold, predicted) pairs.
///
/// Rows are gold labels, columns are predicted labels. When abstentions are
/// scored the columns carry one extra [`ABSTAIN_LABEL`] column, which is never
/// on the diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub columns: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(labels: &[String], abstain_column: bool) -> Self {
        let mut columns = labels.to_vec();
        if abstain_column {
            columns.push(ABSTAIN_LABEL.to_string());
        }
        Self {
            labels: labels.to_vec(),
            counts: vec![vec![0; columns.len()]; labels.len()],
            columns,
        }
    }

    fn row(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Column of a predicted label. The abstain column is addressed by
    /// index only, so a label spelled like it can never reach it.
    fn column(&self, label: &str) -> Option<usize> {
        self.row(label)
    }

    fn abstain_column(&self) -> Option<usize> {
        (self.columns.len() > self.labels.len()).then_some(self.labels.len())
    }

    /// Count one pair. Returns false when either label is not in the matrix.
    pub fn record(&mut self, gold: &str, predicted: &str) -> bool {
        match (self.row(gold), self.column(predicted)) {
            (Some(r), Some(c)) => {
                self.counts[r][c] += 1;
                true
            }
            _ => false,
        }
    }

    /// Count an abstention for `gold`. Returns false when the matrix has no
    /// abstain column or the gold label is unknown.
    pub fn record_abstention(&mut self, gold: &str) -> bool {
        match (self.row(gold), self.abstain_column()) {
            (Some(r), Some(c)) => {
                self.counts[r][c] += 1;
                true
            }
            _ => false,
        }
    }

    /// Abstentions recorded for `gold`.
    pub fn abstentions(&self, gold: &str) -> u64 {
        match (self.row(gold), self.abstain_column()) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn count(&self, gold: &str, predicted: &str) -> u64 {
        match (self.row(gold), self.column(predicted)) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn trace(&self) -> u64 {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.trace(), self.total())
    }

    /// Records whose gold label is `label`.
    pub fn support(&self, label: &str) -> u64 {
        self.row(label)
            .map(|r| self.counts[r].iter().sum())
            .unwrap_or(0)
    }

    /// Records predicted as `label`.
    pub fn predicted(&self, label: &str) -> u64 {
        self.column(label)
            .map(|c| self.counts.iter().map(|row| row[c]).sum())
            .unwrap_or(0)
    }

    /// Precision, recall and F1 with `label` as the positive class.
    pub fn metrics_for(&self, label: &str) -> ClassMetrics {
        let tp = self.count(label, label);
        let precision = ratio(tp, self.predicted(label));
        let recall = ratio(tp, self.support(label));
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support: self.support(label),
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// One-vs-rest metrics for a class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Metrics for one classification benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub accuracy: f64,
    /// Metrics with each label in turn as the positive class.
    pub per_class: BTreeMap<String, ClassMetrics>,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub confusion: ConfusionMatrix,
    pub policy: AbstainPolicy,
    /// Records in the confusion matrix.
    pub scored: usize,
    /// Abstentions, scored or excluded depending on the policy.
    pub abstained: usize,
    pub unparsed_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unparsed: Vec<String>,
}

impl ClassificationSummary {
    /// Every record seen, scored or not.
    pub fn total(&self) -> usize {
        let excluded_abstentions = match self.policy {
            AbstainPolicy::CountAsIncorrect => 0,
            AbstainPolicy::Exclude => self.abstained,
        };
        self.scored + excluded_abstentions + self.unparsed_count
    }
}

/// Scores predictions against gold labels over a fixed label set.
#[derive(Debug, Clone)]
pub struct ClassificationEvaluator {
    labels: Vec<String>,
    policy: AbstainPolicy,
}

impl ClassificationEvaluator {
    pub fn new<I, S>(labels: I, policy: AbstainPolicy) -> Result<Self, AggregationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        if unique.is_empty() {
            return Err(AggregationError::EmptyLabelSet);
        }
        if unique.iter().any(|l| l == ABSTAIN_LABEL) {
            return Err(AggregationError::ReservedLabel(ABSTAIN_LABEL.to_string()));
        }
        Ok(Self {
            labels: unique,
            policy,
        })
    }

    /// Two-class evaluator over fixed labels.
    pub(crate) fn binary(first: &str, second: &str, policy: AbstainPolicy) -> Self {
        Self {
            labels: vec![first.to_string(), second.to_string()],
            policy,
        }
    }

    /// `true` / `false` labels.
    pub fn boolean(policy: AbstainPolicy) -> Self {
        Self::binary("true", "false", policy)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn policy(&self) -> AbstainPolicy {
        self.policy
    }

    /// Score records.
    ///
    /// A gold label outside the label set is a dataset error and fails the
    /// whole evaluation. A predicted label outside the set, or an unparsed
    /// prediction, only marks that record as unparsed.
    pub fn evaluate<I>(&self, records: I) -> Result<ClassificationSummary, AggregationError>
    where
        I: IntoIterator<Item = LabeledPrediction>,
    {
        let mut matrix = ConfusionMatrix::new(
            &self.labels,
            self.policy == AbstainPolicy::CountAsIncorrect,
        );
        let mut abstained = 0;
        let mut unparsed = Vec::new();

        for item in records {
            if !self.labels.contains(&item.gold) {
                return Err(AggregationError::UnknownLabel {
                    record: item.record,
                    label: item.gold,
                });
            }
            match item.prediction {
                Ok(Prediction::Label(label)) => {
                    if !matrix.record(&item.gold, &label) {
                        warn!(record = %item.record, label = %label, "Prediction outside label set");
                        unparsed.push(
                            AggregationError::UnknownLabel {
                                record: item.record,
                                label,
                            }
                            .to_string(),
                        );
                    }
                }
                Ok(Prediction::Abstain) => {
                    abstained += 1;
                    if self.policy == AbstainPolicy::CountAsIncorrect {
                        matrix.record_abstention(&item.gold);
                    }
                }
                Err(err) => {
                    debug!(record = %item.record, error = %err, "Unparsed prediction");
                    unparsed.push(err.to_string());
                }
            }
        }

        Ok(self.summarize(matrix, abstained, unparsed))
    }

    /// Score parallel slices of gold labels and predictions.
    pub fn evaluate_pairs(
        &self,
        gold: &[&str],
        predictions: &[Prediction],
    ) -> Result<ClassificationSummary, AggregationError> {
        if gold.len() != predictions.len() {
            return Err(AggregationError::LengthMismatch {
                expected: gold.len(),
                found: predictions.len(),
            });
        }
        self.evaluate(
            gold.iter()
                .zip(predictions)
                .enumerate()
                .map(|(i, (g, p))| LabeledPrediction::new(i.to_string(), *g, p.clone())),
        )
    }

    fn summarize(
        &self,
        matrix: ConfusionMatrix,
        abstained: usize,
        unparsed: Vec<String>,
    ) -> ClassificationSummary {
        let per_class: BTreeMap<String, ClassMetrics> = self
            .labels
            .iter()
            .map(|label| (label.clone(), matrix.metrics_for(label)))
            .collect();
        let n = per_class.len() as f64;
        let macro_precision = per_class.values().map(|m| m.precision).sum::<f64>() / n;
        let macro_recall = per_class.values().map(|m| m.recall).sum::<f64>() / n;
        let macro_f1 = per_class.values().map(|m| m.f1).sum::<f64>() / n;

        ClassificationSummary {
            accuracy: matrix.accuracy(),
            per_class,
            macro_precision,
            macro_recall,
            macro_f1,
            scored: matrix.total() as usize,
            confusion: matrix,
            policy: self.policy,
            abstained,
            unparsed_count: unparsed.len(),
            unparsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn accuracy_is_trace_over_total() {
        let evaluator = ClassificationEvaluator::boolean(AbstainPolicy::CountAsIncorrect);
        let summary = evaluator
            .evaluate_pairs(
                &["true", "false", "true"],
                &[
                    Prediction::label("true"),
                    Prediction::label("true"),
                    Prediction::label("true"),
                ],
            )
            .unwrap();

        assert!(approx(summary.accuracy, 2.0 / 3.0));
        assert_eq!(summary.confusion.count("true", "true"), 2);
        assert_eq!(summary.confusion.count("false", "true"), 1);
        assert_eq!(summary.confusion.count("true", "false"), 0);
        assert_eq!(summary.confusion.count("false", "false"), 0);
        assert_eq!(summary.scored, 3);

        let positive_true = summary.per_class["true"];
        assert!(approx(positive_true.precision, 2.0 / 3.0));
        assert!(approx(positive_true.recall, 1.0));
        assert!(approx(positive_true.f1, 0.8));
        let positive_false = summary.per_class["false"];
        assert_eq!(positive_false.precision, 0.0);
        assert_eq!(positive_false.support, 1);
    }

    #[test]
    fn abstain_counts_as_incorrect_by_default() {
        let evaluator = ClassificationEvaluator::boolean(AbstainPolicy::default());
        let summary = evaluator
            .evaluate_pairs(
                &["true", "false"],
                &[Prediction::label("true"), Prediction::Abstain],
            )
            .unwrap();

        assert!(approx(summary.accuracy, 0.5));
        assert_eq!(summary.abstained, 1);
        assert_eq!(summary.confusion.abstentions("false"), 1);
        assert_eq!(summary.confusion.count("false", ABSTAIN_LABEL), 0);
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn abstain_is_a_reserved_label() {
        assert_eq!(
            ClassificationEvaluator::new(["supported", ABSTAIN_LABEL], AbstainPolicy::default())
                .unwrap_err(),
            AggregationError::ReservedLabel(ABSTAIN_LABEL.to_string())
        );
    }

    #[test]
    fn abstain_column_is_never_on_the_diagonal() {
        let labels = vec!["supported".to_string(), ABSTAIN_LABEL.to_string()];
        let mut matrix = ConfusionMatrix::new(&labels, true);
        assert!(matrix.record_abstention(ABSTAIN_LABEL));
        assert_eq!(matrix.trace(), 0);
        assert_eq!(matrix.accuracy(), 0.0);
        assert_eq!(matrix.abstentions(ABSTAIN_LABEL), 1);
    }

    #[test]
    fn abstain_can_be_excluded() {
        let evaluator = ClassificationEvaluator::boolean(AbstainPolicy::Exclude);
        let summary = evaluator
            .evaluate_pairs(
                &["true", "false"],
                &[Prediction::label("true"), Prediction::Abstain],
            )
            .unwrap();

        assert!(approx(summary.accuracy, 1.0));
        assert_eq!(summary.scored, 1);
        assert_eq!(summary.total(), 2);
        assert!(!summary.confusion.columns.contains(&ABSTAIN_LABEL.to_string()));
    }

    #[test]
    fn unparsed_records_are_excluded_and_counted() {
        let evaluator = ClassificationEvaluator::boolean(AbstainPolicy::CountAsIncorrect);
        let summary = evaluator
            .evaluate(vec![
                LabeledPrediction::new("a", "true", Prediction::label("true")),
                LabeledPrediction::unparsed("b", "false", "judge said 'maybe'"),
                LabeledPrediction::new("c", "false", Prediction::label("perhaps")),
            ])
            .unwrap();

        assert_eq!(summary.scored, 1);
        assert_eq!(summary.unparsed_count, 2);
        assert!(approx(summary.accuracy, 1.0));
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn unknown_gold_label_fails() {
        let evaluator = ClassificationEvaluator::boolean(AbstainPolicy::CountAsIncorrect);
        let err = evaluator
            .evaluate(vec![LabeledPrediction::new("a", "yes", Prediction::label("true"))])
            .unwrap_err();
        assert!(matches!(err, AggregationError::UnknownLabel { .. }));
    }

    #[test]
    fn length_mismatch_fails() {
        let evaluator = ClassificationEvaluator::boolean(AbstainPolicy::CountAsIncorrect);
        let err = evaluator
            .evaluate_pairs(&["true"], &[])
            .unwrap_err();
        assert_eq!(err, AggregationError::LengthMismatch { expected: 1, found: 0 });
    }

    #[test]
    fn empty_label_set_rejected() {
        let err = ClassificationEvaluator::new(Vec::<String>::new(), AbstainPolicy::Exclude)
            .unwrap_err();
        assert_eq!(err, AggregationError::EmptyLabelSet);
    }

    fn outcome() -> impl Strategy<Value = (usize, Option<usize>)> {
        // Gold index, predicted index (None = abstain).
        (0usize..3, prop::option::of(0usize..3))
    }

    proptest! {
        #[test]
        fn matrix_sums_to_scored_records(
            outcomes in prop::collection::vec(outcome(), 0..60),
            exclude in any::<bool>(),
        ) {
            let labels = ["a", "b", "c"];
            let policy = if exclude { AbstainPolicy::Exclude } else { AbstainPolicy::CountAsIncorrect };
            let evaluator = ClassificationEvaluator::new(labels, policy).unwrap();

            let gold: Vec<&str> = outcomes.iter().map(|(g, _)| labels[*g]).collect();
            let predictions: Vec<Prediction> = outcomes
                .iter()
                .map(|(_, p)| p.map_or(Prediction::Abstain, |i| Prediction::label(labels[i])))
                .collect();
            let summary = evaluator.evaluate_pairs(&gold, &predictions).unwrap();

            let abstentions = outcomes.iter().filter(|(_, p)| p.is_none()).count();
            let expected_scored = if exclude { outcomes.len() - abstentions } else { outcomes.len() };
            prop_assert_eq!(summary.confusion.total() as usize, expected_scored);
            prop_assert_eq!(summary.total(), outcomes.len());

            let correct = outcomes.iter().filter(|(g, p)| *p == Some(*g)).count();
            if expected_scored > 0 {
                prop_assert!((summary.accuracy - correct as f64 / expected_scored as f64).abs() < 1e-9);
            } else {
                prop_assert_eq!(summary.accuracy, 0.0);
            }
        }
    }
}
