//! LLM factuality evaluation across benchmark datasets.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use factcheck_config::{DatasetSource, EvaluationConfig, EvaluatorKind};
use factcheck_pipeline::Pipeline;
use factcheck_types::{CancelSignal, ConfigError, FactCheckResult};
use tracing::{info, instrument, warn};

use crate::dataset::{load_jsonl, BenchmarkQuestion, LlmSample, ModelResponse};
use crate::freetext::FreeTextEvaluator;
use crate::freshqa::{self, Judge, RatingExtractor, ReferenceMatchJudge};
use crate::report::{DatasetSummary, EvaluationReport};
use crate::selfaware::{SelfAwareEvaluator, SimilarityModel, TokenOverlapModel};
use crate::snowballing::SnowballingEvaluator;

/// Scores a model's responses on every configured dataset.
pub struct LlmEvaluator {
    config: EvaluationConfig,
    pipeline: Option<Arc<Pipeline>>,
    judge: Arc<dyn Judge>,
    similarity: Arc<dyn SimilarityModel>,
    cache_root: Option<PathBuf>,
    cancel: CancelSignal,
}

impl LlmEvaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self {
            config,
            pipeline: None,
            judge: Arc::new(ReferenceMatchJudge),
            similarity: Arc::new(TokenOverlapModel),
            cache_root: None,
            cancel: CancelSignal::never(),
        }
    }

    /// Pipeline for free-text datasets.
    pub fn with_pipeline(mut self, pipeline: Arc<Pipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = judge;
        self
    }

    pub fn with_similarity(mut self, model: Arc<dyn SimilarityModel>) -> Self {
        self.similarity = model;
        self
    }

    /// Free-text assessments are cached under `<root>/<model>/<dataset>/`.
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Evaluate `responses` on every dataset in the configuration.
    ///
    /// Responses are joined to questions by id; questions without a response
    /// are skipped and counted in the report.
    #[instrument(skip_all, fields(model = model_name, datasets = self.config.datasets.len()))]
    pub async fn evaluate(
        &self,
        model_name: &str,
        responses: Vec<ModelResponse>,
    ) -> FactCheckResult<EvaluationReport> {
        let mut by_id: HashMap<String, String> = HashMap::with_capacity(responses.len());
        for r in responses {
            if by_id.insert(r.id.clone(), r.response).is_some() {
                warn!(id = %r.id, "Duplicate response id; keeping the last one");
            }
        }

        let mut report = EvaluationReport::new(model_name);
        for source in &self.config.datasets {
            let name = &source.name;
            let questions: Vec<BenchmarkQuestion> = load_jsonl(&source.path)?;
            let total = questions.len();
            let samples: Vec<LlmSample> = questions
                .into_iter()
                .filter_map(|q| {
                    let response = by_id.get(&q.id)?.clone();
                    Some(LlmSample::new(q, response))
                })
                .collect();
            let missing = total - samples.len();
            if missing > 0 {
                warn!(dataset = %name, missing, "Questions without a response");
                report.missing_responses.insert(name.clone(), missing);
            }

            let summary = self.evaluate_samples(model_name, source, &samples).await?;
            report.datasets.insert(name.clone(), summary);
        }

        info!(datasets = report.datasets.len(), "LLM evaluation finished");
        Ok(report)
    }

    /// Score already-joined samples of one dataset.
    pub async fn evaluate_samples(
        &self,
        model_name: &str,
        source: &DatasetSource,
        samples: &[LlmSample],
    ) -> FactCheckResult<DatasetSummary> {
        let dataset = source.name.as_str();
        info!(dataset, evaluator = source.evaluator.as_str(), samples = samples.len(), "Evaluating dataset");
        let config = &self.config;

        let summary = match source.evaluator {
            EvaluatorKind::Snowballing => {
                let evaluator = SnowballingEvaluator::new(config.abstain_policy, config.strict_yes_no)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                DatasetSummary::Snowballing(evaluator.evaluate(samples)?)
            }
            EvaluatorKind::SelfAware => {
                let evaluator = SelfAwareEvaluator::new(config.abstain_policy, config.similarity_threshold)
                    .with_model(Arc::clone(&self.similarity));
                DatasetSummary::SelfAware(evaluator.evaluate(samples)?)
            }
            EvaluatorKind::FreshQa => {
                let extractor = RatingExtractor::new().map_err(|e| ConfigError::Invalid(e.to_string()))?;
                let summary = freshqa::evaluate(
                    self.judge.as_ref(),
                    &extractor,
                    samples,
                    config.concurrency,
                    &self.cancel,
                )
                .await?;
                DatasetSummary::FreshQa(summary)
            }
            EvaluatorKind::FreeText => {
                let pipeline = self.pipeline.clone().ok_or_else(|| {
                    ConfigError::Invalid(format!("dataset '{dataset}' needs a fact-checking pipeline"))
                })?;
                let mut evaluator = FreeTextEvaluator::new(pipeline)
                    .with_pricing(config.pricing.clone())
                    .with_concurrency(config.concurrency)
                    .with_cancel(self.cancel.clone());
                if let Some(root) = &self.cache_root {
                    evaluator = evaluator.with_cache_dir(root.join(model_name).join(dataset));
                }
                DatasetSummary::FreeText(evaluator.evaluate(samples).await?)
            }
        };
        Ok(summary)
    }
}
