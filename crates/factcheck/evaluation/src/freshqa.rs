//! Judge-rated short answers.
//!
//! A [`Judge`] reads the question, the acceptable answers and the response,
//! and writes a free-text rating. [`RatingExtractor`] turns that rating into
//! credited / not credited; ratings it cannot read are unparsed.

use async_trait::async_trait;
use factcheck_types::{AggregationError, CancelSignal, ExecutionError};
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::LlmSample;

/// What a judge is asked to rate.
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub question: &'a str,
    pub response: &'a str,
    pub correct_answers: &'a [String],
}

impl JudgeRequest<'_> {
    /// Prompt text for LLM-backed judges.
    pub fn prompt(&self) -> String {
        let answers = self.correct_answers.join(" | ");
        format!(
            "Evaluate the response to the question below. Credit it only if its main \
             answer is correct according to the listed answers and it contains no \
             hallucinated or outdated information.\n\n\
             question: {}\ncorrect answer(s): {answers}\nresponse: {}\n\n\
             Reply with a short comment followed by \"credited\" or \"not credited\".",
            self.question, self.response
        )
    }
}

/// Rates a response.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, request: JudgeRequest<'_>) -> Result<String, ExecutionError>;
}

/// Offline judge: credits a response that mentions any acceptable answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceMatchJudge;

#[async_trait]
impl Judge for ReferenceMatchJudge {
    async fn judge(&self, request: JudgeRequest<'_>) -> Result<String, ExecutionError> {
        let response = request.response.to_lowercase();
        let matched = request
            .correct_answers
            .iter()
            .map(|a| a.trim().to_lowercase())
            .find(|a| !a.is_empty() && response.contains(a.as_str()));
        Ok(match matched {
            Some(answer) => format!("The response mentions \"{answer}\". Credited."),
            None => "The response mentions none of the answers. Not credited.".to_string(),
        })
    }
}

/// Reads a credited / not credited decision from judge output.
#[derive(Debug, Clone)]
pub struct RatingExtractor {
    negative: Regex,
    positive: Regex,
}

impl RatingExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            negative: Regex::new(r"(?i)\b(?:incorrect|not\s+correct|not\s+credited)\b")?,
            positive: Regex::new(r"(?i)\b(?:correct|credited)\b")?,
        })
    }

    /// `Some(true)` when credited, `Some(false)` when not, `None` when neither.
    pub fn extract(&self, rating: &str) -> Option<bool> {
        if self.negative.is_match(rating) {
            Some(false)
        } else if self.positive.is_match(rating) {
            Some(true)
        } else {
            None
        }
    }
}

/// Accuracy over judged responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    /// Credited share of the rated responses.
    pub accuracy: f64,
    pub credited: usize,
    pub not_credited: usize,
    pub unparsed_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unparsed: Vec<String>,
}

impl RatingSummary {
    pub fn rated(&self) -> usize {
        self.credited + self.not_credited
    }
}

/// Judges every sample and aggregates the ratings.
///
/// Judge failures fail the evaluation; unreadable ratings only mark the record
/// as unparsed.
pub async fn evaluate(
    judge: &dyn Judge,
    extractor: &RatingExtractor,
    samples: &[LlmSample],
    concurrency: usize,
    cancel: &CancelSignal,
) -> Result<RatingSummary, ExecutionError> {
    let ratings: Vec<Result<String, ExecutionError>> = stream::iter(samples)
        .map(|sample| async move {
            if cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled {
                    stage: "judge".to_string(),
                });
            }
            judge
                .judge(JudgeRequest {
                    question: &sample.question.prompt,
                    response: &sample.response,
                    correct_answers: &sample.question.correct_answers,
                })
                .await
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut credited = 0;
    let mut not_credited = 0;
    let mut unparsed = Vec::new();
    for (sample, rating) in samples.iter().zip(ratings) {
        let rating = rating?;
        match extractor.extract(&rating) {
            Some(true) => credited += 1,
            Some(false) => not_credited += 1,
            None => {
                debug!(record = %sample.question.id, "Unreadable judge rating");
                unparsed.push(
                    AggregationError::Unparsed {
                        record: sample.question.id.clone(),
                        reason: format!("no rating in judge output: {rating}"),
                    }
                    .to_string(),
                );
            }
        }
    }

    let rated = credited + not_credited;
    let accuracy = if rated == 0 {
        0.0
    } else {
        credited as f64 / rated as f64
    };
    info!(rated, credited, unparsed = unparsed.len(), "Judged responses");

    Ok(RatingSummary {
        accuracy,
        credited,
        not_credited,
        unparsed_count: unparsed.len(),
        unparsed,
    })
}
