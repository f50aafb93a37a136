//! Configuration document for factcheck.
//!
//! A single [`FactCheckConfig`] describes the pipeline (ordered solver entries
//! with flat parameters), the initial state contract, where runs are recorded,
//! logging, and how benchmark evaluation is performed. It is loaded once and
//! passed by reference to whatever needs it.

#![deny(unsafe_code)]

mod document;
mod evaluation;

pub use document::{FactCheckConfig, LoggingConfig, PipelineEntry};
pub use evaluation::{AbstainPolicy, DatasetSource, EvaluationConfig, EvaluatorKind, PricingConfig};
