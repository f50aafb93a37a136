//! Per-stage notification hooks.

use std::time::Duration;

use factcheck_types::{CapabilityKind, ExecutionError, Flow, RunContext, State};

/// What a stage just did.
pub struct StageEvent<'a> {
    /// Zero-based position of the stage.
    pub index: usize,
    pub solver: &'a str,
    pub kind: CapabilityKind,
    pub flow: &'a Flow,
    /// State after the stage's writes.
    pub state: &'a State,
    pub ctx: &'a RunContext,
    pub elapsed: Duration,
}

/// Called after every completed stage. A failing observer aborts the run.
pub trait StageObserver: Send + Sync {
    fn on_stage(&self, event: &StageEvent<'_>) -> Result<(), ExecutionError>;
}

/// Observer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&self, _event: &StageEvent<'_>) -> Result<(), ExecutionError> {
        Ok(())
    }
}

/// Adapts a closure into an observer.
pub struct FnObserver<F>(pub F);

impl<F> StageObserver for FnObserver<F>
where
    F: Fn(&StageEvent<'_>) + Send + Sync,
{
    fn on_stage(&self, event: &StageEvent<'_>) -> Result<(), ExecutionError> {
        (self.0)(event);
        Ok(())
    }
}

/// Notifies several observers in order, stopping at the first failure.
#[derive(Default)]
pub struct ObserverSet<'a> {
    observers: Vec<&'a dyn StageObserver>,
}

impl<'a> ObserverSet<'a> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn with(mut self, observer: &'a dyn StageObserver) -> Self {
        self.observers.push(observer);
        self
    }
}

impl StageObserver for ObserverSet<'_> {
    fn on_stage(&self, event: &StageEvent<'_>) -> Result<(), ExecutionError> {
        for observer in &self.observers {
            observer.on_stage(event)?;
        }
        Ok(())
    }
}
