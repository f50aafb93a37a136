//! Free-form answers checked claim by claim.
//!
//! Each response runs through a fact-checking [`Pipeline`]. The per-claim
//! verdicts it leaves in the state are tallied into response- and claim-level
//! factuality figures. Finished assessments are cached on disk, keyed by the
//! record index and a hash of the prompt, and reused on later runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use factcheck_config::PricingConfig;
use factcheck_pipeline::{NoopObserver, Pipeline};
use factcheck_types::{
    AggregationError, CancelSignal, ClaimVerdict, ExecutionError, RunContext, State, StateKey,
    StateRead, Verdict,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::dataset::LlmSample;

const CACHE_FILE: &str = "evaluation.json";

/// Claim verdict counts for one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTally {
    pub true_claims: usize,
    pub false_claims: usize,
    pub mixed_claims: usize,
    pub undefined_claims: usize,
}

impl ClaimTally {
    pub fn from_verdicts(verdicts: &[ClaimVerdict]) -> Self {
        let mut tally = Self::default();
        for v in verdicts {
            match v.verdict {
                Verdict::True => tally.true_claims += 1,
                Verdict::False => tally.false_claims += 1,
                Verdict::Mixed => tally.mixed_claims += 1,
                Verdict::Abstain => tally.undefined_claims += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.true_claims + self.false_claims + self.mixed_claims + self.undefined_claims
    }

    /// A response is true when none of its claims is false or mixed.
    pub fn is_true_response(&self) -> bool {
        self.false_claims == 0 && self.mixed_claims == 0
    }

    fn add(&mut self, other: &ClaimTally) {
        self.true_claims += other.true_claims;
        self.false_claims += other.false_claims;
        self.mixed_claims += other.mixed_claims;
        self.undefined_claims += other.undefined_claims;
    }
}

/// The cached result of checking one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAssessment {
    pub id: String,
    pub prompt: String,
    pub response: String,
    pub claims: Vec<ClaimVerdict>,
    pub tally: ClaimTally,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Aggregate free-text factuality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeTextSummary {
    /// Responses with at least one claim verdict.
    pub responses: usize,
    pub true_responses: usize,
    pub false_responses: usize,
    pub claims: ClaimTally,
    pub percentage_true_responses: f64,
    pub percentage_false_responses: f64,
    pub percentage_false_claims: f64,
    /// Two model calls and two searches per claim.
    pub estimated_cost: f64,
    pub total_time_ms: u64,
    /// Assessments read back from the cache.
    pub cached: usize,
    pub unparsed_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unparsed: Vec<String>,
}

enum Outcome {
    Assessed { assessment: ResponseAssessment, cached: bool },
    Unparsed(String),
}

/// Runs responses through a pipeline and aggregates claim verdicts.
pub struct FreeTextEvaluator {
    pipeline: Arc<Pipeline>,
    pricing: PricingConfig,
    concurrency: usize,
    cache_dir: Option<PathBuf>,
    question_key: StateKey,
    response_key: StateKey,
    verdicts_key: StateKey,
    cancel: CancelSignal,
}

impl FreeTextEvaluator {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            pricing: PricingConfig::default(),
            concurrency: 4,
            cache_dir: None,
            question_key: StateKey::from("question"),
            response_key: StateKey::from("response"),
            verdicts_key: StateKey::from("claim_verdicts"),
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// State key the pipeline writes per-claim verdicts to.
    pub fn with_verdicts_key(mut self, key: impl Into<StateKey>) -> Self {
        self.verdicts_key = key.into();
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// `<cache_dir>/<index>_<sha256(prompt)>/evaluation.json`
    pub fn cache_path(&self, index: usize, prompt: &str) -> Option<PathBuf> {
        let digest = hex::encode(Sha256::digest(prompt.as_bytes()));
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{index}_{digest}")).join(CACHE_FILE))
    }

    /// Check every response and aggregate.
    ///
    /// Responses whose run fails or yields no claim verdicts are unparsed.
    /// Cancellation aborts the whole evaluation.
    pub async fn evaluate(&self, samples: &[LlmSample]) -> Result<FreeTextSummary, ExecutionError> {
        info!(responses = samples.len(), concurrency = self.concurrency, "Free-text evaluation started");

        let outcomes: Vec<Result<Outcome, ExecutionError>> = stream::iter(samples.iter().enumerate())
            .map(|(index, sample)| self.assess(index, sample))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut summary = FreeTextSummary::default();
        for outcome in outcomes {
            match outcome? {
                Outcome::Assessed { assessment, cached } => {
                    summary.responses += 1;
                    if assessment.tally.is_true_response() {
                        summary.true_responses += 1;
                    } else {
                        summary.false_responses += 1;
                    }
                    summary.claims.add(&assessment.tally);
                    summary.total_time_ms += assessment.elapsed_ms;
                    if cached {
                        summary.cached += 1;
                    }
                }
                Outcome::Unparsed(reason) => summary.unparsed.push(reason),
            }
        }

        summary.unparsed_count = summary.unparsed.len();
        summary.percentage_true_responses = percentage(summary.true_responses, summary.responses);
        summary.percentage_false_responses = percentage(summary.false_responses, summary.responses);
        summary.percentage_false_claims =
            percentage(summary.claims.false_claims, summary.claims.total());
        summary.estimated_cost = summary.claims.total() as f64
            * 2.0
            * (self.pricing.llm_price_per_call + self.pricing.search_price_per_call);

        info!(
            responses = summary.responses,
            true_responses = summary.true_responses,
            claims = summary.claims.total(),
            cached = summary.cached,
            unparsed = summary.unparsed_count,
            "Free-text evaluation finished"
        );
        Ok(summary)
    }

    async fn assess(&self, index: usize, sample: &LlmSample) -> Result<Outcome, ExecutionError> {
        let id = &sample.question.id;
        let cache_path = self.cache_path(index, &sample.question.prompt);

        if let Some(path) = cache_path.as_deref().filter(|p| p.exists()) {
            match read_cached(path) {
                Ok(assessment) if assessment.response == sample.response => {
                    debug!(record = %id, path = %path.display(), "Using cached assessment");
                    return Ok(Outcome::Assessed {
                        assessment,
                        cached: true,
                    });
                }
                Ok(_) => debug!(record = %id, "Cached assessment is for another response"),
                Err(err) => warn!(record = %id, error = %err, "Ignoring unreadable cache entry"),
            }
        }

        let started_at = Utc::now();
        let started = Instant::now();
        let state = State::new()
            .with(&self.question_key, sample.question.prompt.as_str())
            .with(&self.response_key, sample.response.as_str());
        let ctx = RunContext::new()
            .with_sample_name(id.as_str())
            .with_cancel(self.cancel.clone());

        let report = match self.pipeline.run_with(state, &ctx, &NoopObserver).await {
            Ok(report) => report,
            Err(err @ ExecutionError::Cancelled { .. }) => return Err(err),
            Err(err) => return Ok(unparsed(id, err.to_string())),
        };

        let claims = match report.state.claim_verdicts(self.verdicts_key.as_str()) {
            Ok(claims) if !claims.is_empty() => claims.to_vec(),
            Ok(_) => return Ok(unparsed(id, "no claims were checked")),
            Err(err) => {
                let reason = match &report.halted {
                    Some(halted) => format!("run halted at {}: {}", halted.stage, halted.reason),
                    None => err.to_string(),
                };
                return Ok(unparsed(id, reason));
            }
        };

        let assessment = ResponseAssessment {
            id: id.clone(),
            prompt: sample.question.prompt.clone(),
            response: sample.response.clone(),
            tally: ClaimTally::from_verdicts(&claims),
            claims,
            started_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        if let Some(path) = &cache_path {
            if let Err(err) = write_cached(path, &assessment) {
                warn!(record = %id, error = %err, "Failed to cache assessment");
            }
        }
        Ok(Outcome::Assessed {
            assessment,
            cached: false,
        })
    }
}

fn unparsed(record: &str, reason: impl Into<String>) -> Outcome {
    Outcome::Unparsed(
        AggregationError::Unparsed {
            record: record.to_string(),
            reason: reason.into(),
        }
        .to_string(),
    )
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

fn read_cached(path: &Path) -> Result<ResponseAssessment, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

fn write_cached(path: &Path, assessment: &ResponseAssessment) -> Result<(), String> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    }
    let json = serde_json::to_string_pretty(assessment).map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(v: Verdict) -> ClaimVerdict {
        ClaimVerdict {
            claim: "c".into(),
            verdict: v,
            rationale: None,
            correction: None,
        }
    }

    #[test]
    fn tally_maps_verdicts() {
        let tally = ClaimTally::from_verdicts(&[
            verdict(Verdict::True),
            verdict(Verdict::True),
            verdict(Verdict::Abstain),
        ]);
        assert_eq!(tally.true_claims, 2);
        assert_eq!(tally.undefined_claims, 1);
        assert!(tally.is_true_response());

        let tally = ClaimTally::from_verdicts(&[verdict(Verdict::True), verdict(Verdict::Mixed)]);
        assert!(!tally.is_true_response());
        assert_eq!(tally.total(), 2);
    }

    #[test]
    fn percentages_handle_empty_totals() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }
}
