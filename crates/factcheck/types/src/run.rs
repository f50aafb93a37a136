use uuid::Uuid;

use crate::cancel::CancelSignal;

/// Whether the pipeline should go on after a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop the run cleanly. Remaining stages are skipped.
    Halt { reason: String },
}

impl Flow {
    pub fn halt(reason: impl Into<String>) -> Self {
        Flow::Halt {
            reason: reason.into(),
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Flow::Continue)
    }
}

/// Per-run context handed to every solver.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    /// Name under which the run is recorded.
    pub sample_name: String,
    pub cancel: CancelSignal,
}

impl RunContext {
    /// A fresh context whose sample name is the run id.
    pub fn new() -> Self {
        let run_id = Uuid::new_v4();
        Self {
            run_id,
            sample_name: run_id.to_string(),
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_sample_name(mut self, name: impl Into<String>) -> Self {
        self.sample_name = name.into();
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
