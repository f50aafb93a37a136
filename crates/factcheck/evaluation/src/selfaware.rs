//! Answerable vs unanswerable questions.
//!
//! A response counts as "unanswerable" when it contains one of a fixed set of
//! uncertainty phrases, or when some five-word window of it is close enough to
//! one of them under a [`SimilarityModel`].

use std::sync::Arc;

use factcheck_config::AbstainPolicy;
use factcheck_solvers::text::{jaccard, remove_punctuation, split_sentences, word_windows};
use factcheck_types::AggregationError;

use crate::classification::{
    ClassificationEvaluator, ClassificationSummary, LabeledPrediction, Prediction,
};
use crate::dataset::LlmSample;

pub const UNANSWERABLE: &str = "unanswerable";
pub const ANSWERABLE: &str = "answerable";

const WINDOW_WORDS: usize = 5;

/// Phrases that signal the model declined to give an answer.
pub const UNCERTAIN_PHRASES: &[&str] = &[
    "The answer is unknown.",
    "The answer is uncertain.",
    "The answer is unclear.",
    "There is no scientific evidence.",
    "There is no definitive answer.",
    "There is no right answer.",
    "There is much debate.",
    "There is no known case.",
    "There is no concrete answer to this question.",
    "There is no public information available.",
    "It is impossible to know.",
    "It is impossible to answer.",
    "It is difficult to predict.",
    "It is not known.",
    "We do not know.",
    "I'm not sure.",
];

/// Similarity between candidate text windows and reference phrases.
pub trait SimilarityModel: Send + Sync {
    /// Highest similarity of any window to any phrase, in `[0, 1]`.
    fn max_similarity(&self, windows: &[String], phrases: &[String]) -> f64;
}

/// Word-set Jaccard similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlapModel;

impl SimilarityModel for TokenOverlapModel {
    fn max_similarity(&self, windows: &[String], phrases: &[String]) -> f64 {
        windows
            .iter()
            .flat_map(|w| phrases.iter().map(move |p| jaccard(w, p)))
            .fold(0.0, f64::max)
    }
}

pub struct SelfAwareEvaluator {
    classifier: ClassificationEvaluator,
    phrases: Vec<String>,
    model: Arc<dyn SimilarityModel>,
    threshold: f64,
}

impl std::fmt::Debug for SelfAwareEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfAwareEvaluator")
            .field("phrases", &self.phrases.len())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl SelfAwareEvaluator {
    pub fn new(policy: AbstainPolicy, threshold: f64) -> Self {
        Self {
            classifier: ClassificationEvaluator::binary(UNANSWERABLE, ANSWERABLE, policy),
            phrases: UNCERTAIN_PHRASES.iter().map(|p| remove_punctuation(p)).collect(),
            model: Arc::new(TokenOverlapModel),
            threshold,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn SimilarityModel>) -> Self {
        self.model = model;
        self
    }

    pub fn is_unanswerable(&self, response: &str) -> bool {
        let normalized = remove_punctuation(response);
        if self.phrases.iter().any(|p| normalized.contains(p.as_str())) {
            return true;
        }

        let windows: Vec<String> = split_sentences(response)
            .iter()
            .map(|s| remove_punctuation(s))
            .flat_map(|s| word_windows(&s, WINDOW_WORDS))
            .collect();
        if windows.is_empty() {
            return false;
        }
        self.model.max_similarity(&windows, &self.phrases) > self.threshold
    }

    /// Score samples. Samples without a gold answerability label are unparsed.
    pub fn evaluate(&self, samples: &[LlmSample]) -> Result<ClassificationSummary, AggregationError> {
        let records = samples.iter().map(|sample| {
            let id = &sample.question.id;
            match sample.question.label_unanswerable {
                Some(gold) => LabeledPrediction::new(
                    id,
                    label_for(gold),
                    Prediction::label(label_for(self.is_unanswerable(&sample.response))),
                ),
                None => LabeledPrediction::unparsed(id, ANSWERABLE, "missing answerability label"),
            }
        });
        self.classifier.evaluate(records)
    }
}

fn label_for(unanswerable: bool) -> &'static str {
    if unanswerable {
        UNANSWERABLE
    } else {
        ANSWERABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::BenchmarkQuestion;

    fn evaluator() -> SelfAwareEvaluator {
        SelfAwareEvaluator::new(AbstainPolicy::default(), 0.75)
    }

    #[test]
    fn exact_phrase_is_unanswerable() {
        let e = evaluator();
        assert!(e.is_unanswerable("Honestly, I'm not sure. It could be either."));
        assert!(e.is_unanswerable("THE ANSWER IS UNKNOWN!"));
    }

    #[test]
    fn near_phrase_is_unanswerable() {
        // Same words as "it is impossible to know", different order.
        assert!(evaluator().is_unanswerable("To know it is impossible."));
        assert!(!evaluator().is_unanswerable("It is really impossible to say."));
    }

    #[test]
    fn direct_answer_is_answerable() {
        assert!(!evaluator().is_unanswerable("The capital of France is Paris."));
        assert!(!evaluator().is_unanswerable(""));
    }

    struct Always(f64);

    impl SimilarityModel for Always {
        fn max_similarity(&self, _: &[String], _: &[String]) -> f64 {
            self.0
        }
    }

    #[test]
    fn similarity_model_is_pluggable() {
        let e = evaluator().with_model(Arc::new(Always(0.9)));
        assert!(e.is_unanswerable("Paris."));
        let e = evaluator().with_model(Arc::new(Always(0.75)));
        assert!(!e.is_unanswerable("Paris."));
    }

    #[test]
    fn summary_reports_both_classes_as_positive() {
        let samples = vec![
            LlmSample::new(
                BenchmarkQuestion::new("1", "What is the meaning of life?").with_unanswerable(true),
                "There is no definitive answer.",
            ),
            LlmSample::new(
                BenchmarkQuestion::new("2", "Capital of France?").with_unanswerable(false),
                "Paris.",
            ),
            LlmSample::new(
                BenchmarkQuestion::new("3", "Will it rain in 2090?").with_unanswerable(true),
                "Yes, heavily.",
            ),
            LlmSample::new(BenchmarkQuestion::new("4", "Unlabeled"), "Maybe."),
        ];

        let summary = evaluator().evaluate(&samples).unwrap();
        assert_eq!(summary.scored, 3);
        assert_eq!(summary.unparsed_count, 1);
        assert!((summary.accuracy - 2.0 / 3.0).abs() < 1e-9);

        let unanswerable = summary.per_class[UNANSWERABLE];
        assert!((unanswerable.precision - 1.0).abs() < 1e-9);
        assert!((unanswerable.recall - 0.5).abs() < 1e-9);
        let answerable = summary.per_class[ANSWERABLE];
        assert!((answerable.precision - 0.5).abs() < 1e-9);
        assert!((answerable.recall - 1.0).abs() < 1e-9);
    }
}
