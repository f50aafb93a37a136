//! Yes/no questions whose answer is fixed per topic.

use std::collections::BTreeMap;

use factcheck_config::AbstainPolicy;
use factcheck_types::AggregationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classification::{
    ClassificationEvaluator, ClassificationSummary, LabeledPrediction, Prediction,
};
use crate::dataset::LlmSample;

/// Topics and their correct answer.
pub const TOPIC_ANSWERS: &[(&str, bool)] = &[
    ("Primality Testing", true),
    ("US Senator Search", true),
    ("Graph Connectivity-Flight Search", false),
];

/// Group name for the summary over every topic.
pub const ALL_TOPICS: &str = "All";

/// Per-topic and overall classification results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowballingSummary {
    pub topics: BTreeMap<String, ClassificationSummary>,
    pub overall: ClassificationSummary,
}

/// Scores yes/no answers against each topic's fixed answer.
#[derive(Debug, Clone)]
pub struct SnowballingEvaluator {
    classifier: ClassificationEvaluator,
    strict: bool,
    negation: Regex,
}

impl SnowballingEvaluator {
    pub fn new(policy: AbstainPolicy, strict: bool) -> Result<Self, regex::Error> {
        Ok(Self {
            classifier: ClassificationEvaluator::boolean(policy),
            strict,
            negation: Regex::new(r"(?i)n't|\b(?:no|not|cannot|none|never|nothing)\b")?,
        })
    }

    /// Map a free-form answer to yes/no.
    ///
    /// Strict mode only accepts answers that start with "yes" or "no" and
    /// abstains otherwise. Lenient mode reads any negation as "no".
    pub fn parse_answer(&self, response: &str) -> Prediction {
        let normalized = response.trim().to_lowercase();
        if self.strict {
            if normalized.starts_with("yes") {
                Prediction::from(true)
            } else if normalized.starts_with("no") {
                Prediction::from(false)
            } else {
                Prediction::Abstain
            }
        } else {
            Prediction::from(!self.negation.is_match(&normalized))
        }
    }

    pub fn evaluate(&self, samples: &[LlmSample]) -> Result<SnowballingSummary, AggregationError> {
        let mut by_topic: BTreeMap<String, Vec<LabeledPrediction>> = TOPIC_ANSWERS
            .iter()
            .map(|(topic, _)| (topic.to_string(), Vec::new()))
            .collect();
        let mut all = Vec::with_capacity(samples.len());

        for sample in samples {
            let id = &sample.question.id;
            let topic = sample.question.topic.as_deref().unwrap_or_default();
            match TOPIC_ANSWERS.iter().find(|(t, _)| *t == topic) {
                Some((_, answer)) => {
                    let record =
                        LabeledPrediction::new(id, answer.to_string(), self.parse_answer(&sample.response));
                    if let Some(group) = by_topic.get_mut(topic) {
                        group.push(record.clone());
                    }
                    all.push(record);
                }
                None => {
                    debug!(record = %id, topic, "Unknown snowballing topic");
                    all.push(LabeledPrediction {
                        record: id.clone(),
                        gold: "true".to_string(),
                        prediction: Err(AggregationError::Unparsed {
                            record: id.clone(),
                            reason: format!("unknown topic '{topic}'"),
                        }),
                    });
                }
            }
        }

        let topics = by_topic
            .into_iter()
            .map(|(topic, records)| Ok((topic, self.classifier.evaluate(records)?)))
            .collect::<Result<BTreeMap<_, _>, AggregationError>>()?;
        let overall = self.classifier.evaluate(all)?;

        Ok(SnowballingSummary { topics, overall })
    }
}
