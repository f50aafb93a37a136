//! Factuality evaluation.
//!
//! Two families of benchmark are supported:
//!
//! - **LLM factuality**: model responses to benchmark questions, scored per
//!   dataset by a [`snowballing`], [`selfaware`], [`freshqa`] or [`freetext`]
//!   evaluator and collected by [`LlmEvaluator`] into an [`EvaluationReport`].
//! - **Fact-checker accuracy**: a checker's true/false predictions against
//!   gold claim or document labels ([`CheckerEvaluator`]).
//!
//! Classification metrics come from a [`ConfusionMatrix`] over a fixed label
//! set. Abstentions follow an explicit [`AbstainPolicy`]; predictions that
//! cannot be parsed are kept out of every denominator and reported as an
//! unparsed count.

#![deny(unsafe_code)]

pub mod checker;
pub mod classification;
pub mod dataset;
pub mod figures;
pub mod freetext;
pub mod freshqa;
pub mod llm;
pub mod report;
pub mod selfaware;
pub mod snowballing;

pub use checker::{CheckerEvaluator, CheckerPrediction, CheckerSummary, GoldLevel};
pub use classification::{
    ClassMetrics, ClassificationEvaluator, ClassificationSummary, ConfusionMatrix,
    LabeledPrediction, Prediction, ABSTAIN_LABEL,
};
pub use dataset::{load_jsonl, BenchmarkQuestion, LlmSample, ModelResponse};
pub use factcheck_config::AbstainPolicy;
pub use figures::{figures_for, FigureSpec, NamedFigure};
pub use freetext::{ClaimTally, FreeTextEvaluator, FreeTextSummary, ResponseAssessment};
pub use freshqa::{Judge, JudgeRequest, RatingExtractor, RatingSummary, ReferenceMatchJudge};
pub use llm::LlmEvaluator;
pub use report::{DatasetSummary, EvaluationReport, ReportFormat};
pub use selfaware::{SelfAwareEvaluator, SimilarityModel, TokenOverlapModel};
pub use snowballing::{SnowballingEvaluator, SnowballingSummary};
