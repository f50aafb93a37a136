//! Concurrent runs over independent inputs.

use std::sync::Arc;

use factcheck_types::{CancelSignal, ExecutionError, RunContext, State};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::observer::StageObserver;
use crate::pipeline::{Pipeline, RunReport};

/// One input of a batch.
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// Record name; a fresh id is used when absent.
    pub sample_name: Option<String>,
    pub state: State,
}

impl BatchInput {
    pub fn new(state: State) -> Self {
        Self {
            sample_name: None,
            state,
        }
    }

    pub fn named(sample_name: impl Into<String>, state: State) -> Self {
        Self {
            sample_name: Some(sample_name.into()),
            state,
        }
    }
}

/// Runs one pipeline over many inputs with bounded concurrency.
///
/// Every input gets its own state and context. Results come back in input
/// order; one failing input does not affect the others.
pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    concurrency: usize,
    cancel: CancelSignal,
}

impl BatchRunner {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            concurrency: 4,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(
        &self,
        inputs: Vec<BatchInput>,
        observer: &dyn StageObserver,
    ) -> Vec<Result<RunReport, ExecutionError>> {
        let total = inputs.len();
        info!(inputs = total, concurrency = self.concurrency, "Batch started");

        let results: Vec<Result<RunReport, ExecutionError>> = stream::iter(inputs)
            .map(|BatchInput { sample_name, state }| {
                let mut ctx = RunContext::new().with_cancel(self.cancel.clone());
                if let Some(name) = sample_name {
                    ctx = ctx.with_sample_name(name);
                }
                let pipeline = Arc::clone(&self.pipeline);
                async move {
                    let result = pipeline.run_with(state, &ctx, observer).await;
                    if let Err(err) = &result {
                        warn!(sample = %ctx.sample_name, error = %err, "Batch item failed");
                    }
                    result
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(inputs = total, failed, "Batch finished");
        results
    }
}
