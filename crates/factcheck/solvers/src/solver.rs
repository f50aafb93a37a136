use async_trait::async_trait;
use factcheck_types::{ExecutionError, Flow, RunContext, SolverDescriptor, StageState};

/// One stage of a fact-checking pipeline.
///
/// A solver reads only its declared input keys and writes only its declared
/// output keys; the [`StageState`] it receives enforces both. Returning
/// [`Flow::Halt`] ends the run early without error.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Name, kind and state contract of this solver.
    fn descriptor(&self) -> &SolverDescriptor;

    /// Run the stage against the state.
    async fn execute(
        &self,
        state: &mut StageState<'_>,
        ctx: &RunContext,
    ) -> Result<Flow, ExecutionError>;
}
