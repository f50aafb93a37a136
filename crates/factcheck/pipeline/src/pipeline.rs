use std::sync::Arc;
use std::time::Instant;

use factcheck_config::FactCheckConfig;
use factcheck_solvers::{Solver, SolverRegistry};
use factcheck_types::{
    ConfigValidationError, ExecutionError, FactCheckResult, Flow, RunContext, SolverDescriptor,
    StageState, State, StateKey,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::observer::{NoopObserver, StageEvent, StageObserver};
use crate::shape::{validate, PipelineShape};

/// Where and why a run stopped early.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Halted {
    pub stage: String,
    pub reason: String,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub state: State,
    /// Names of the stages that ran, in order.
    pub completed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<Halted>,
}

/// A validated, ordered chain of solvers.
pub struct Pipeline {
    stages: Vec<Arc<dyn Solver>>,
    shape: PipelineShape,
    initial_keys: Vec<StateKey>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("shape", &self.shape)
            .field("initial_keys", &self.initial_keys)
            .finish()
    }
}

impl Pipeline {
    /// Validate the solvers' descriptors and assemble the pipeline.
    pub fn build(
        stages: Vec<Arc<dyn Solver>>,
        initial_keys: Vec<StateKey>,
    ) -> Result<Self, ConfigValidationError> {
        let descriptors: Vec<&SolverDescriptor> = stages.iter().map(|s| s.descriptor()).collect();
        let shape = validate(&descriptors, &initial_keys)?;
        info!(stages = stages.len(), shape = %shape, "Pipeline built");
        Ok(Self {
            stages,
            shape,
            initial_keys,
        })
    }

    /// Instantiate the configured solvers from `registry` and build.
    pub fn from_config(config: &FactCheckConfig, registry: &SolverRegistry) -> FactCheckResult<Self> {
        let stages = config
            .pipeline
            .iter()
            .map(|entry| registry.instantiate_entry(entry))
            .collect::<Result<Vec<_>, _>>()?;
        let initial_keys = config
            .initial_keys
            .iter()
            .map(|k| StateKey::from(k.as_str()))
            .collect();
        Ok(Self::build(stages, initial_keys)?)
    }

    pub fn shape(&self) -> PipelineShape {
        self.shape
    }

    pub fn initial_keys(&self) -> &[StateKey] {
        &self.initial_keys
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &SolverDescriptor> {
        self.stages.iter().map(|s| s.descriptor())
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.descriptors().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage against `state` and return the final state.
    pub async fn run(&self, state: State) -> Result<State, ExecutionError> {
        let report = self
            .run_with(state, &RunContext::new(), &NoopObserver)
            .await?;
        Ok(report.state)
    }

    /// Run with an explicit context and observer.
    ///
    /// The observer is notified after each completed stage. Cancellation via
    /// `ctx.cancel` drops the in-flight solver call and fails the run; no
    /// later stage starts.
    #[instrument(skip_all, fields(run_id = %ctx.run_id, sample = %ctx.sample_name))]
    pub async fn run_with(
        &self,
        mut state: State,
        ctx: &RunContext,
        observer: &dyn StageObserver,
    ) -> Result<RunReport, ExecutionError> {
        if let Some(missing) = self.initial_keys.iter().find(|k| !state.contains(k.as_str())) {
            return Err(ExecutionError::MissingKey(missing.clone()));
        }

        info!(stages = self.stages.len(), shape = %self.shape, "Run started");
        let mut completed = Vec::with_capacity(self.stages.len());

        for (index, solver) in self.stages.iter().enumerate() {
            let descriptor = solver.descriptor();
            let stage = descriptor.name.as_str();

            if ctx.cancel.is_cancelled() {
                warn!(stage, "Run cancelled before stage");
                return Err(ExecutionError::Cancelled {
                    stage: stage.to_string(),
                });
            }

            debug!(stage, index, kind = %descriptor.kind, "Running stage");
            let started = Instant::now();

            let outcome = {
                let mut view = StageState::new(&mut state, descriptor);
                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => Err(ExecutionError::Cancelled {
                        stage: stage.to_string(),
                    }),
                    result = solver.execute(&mut view, ctx) => result,
                }
            };

            let flow = match outcome {
                Ok(flow) => flow,
                Err(err) => {
                    warn!(stage, error = %err, retryable = err.retryable(), "Stage failed");
                    return Err(err);
                }
            };

            if flow.is_continue() {
                if let Some(key) = descriptor
                    .output_keys
                    .iter()
                    .find(|k| !state.contains(k.as_str()))
                {
                    return Err(ExecutionError::MissingOutput {
                        stage: stage.to_string(),
                        key: key.clone(),
                    });
                }
            }

            let elapsed = started.elapsed();
            observer.on_stage(&StageEvent {
                index,
                solver: stage,
                kind: descriptor.kind,
                flow: &flow,
                state: &state,
                ctx,
                elapsed,
            })?;
            completed.push(stage.to_string());
            debug!(stage, elapsed_ms = elapsed.as_millis() as u64, "Stage completed");

            if let Flow::Halt { reason } = flow {
                info!(stage, reason = %reason, "Run halted");
                return Ok(RunReport {
                    state,
                    completed,
                    halted: Some(Halted {
                        stage: stage.to_string(),
                        reason,
                    }),
                });
            }
        }

        info!(completed = completed.len(), "Run finished");
        Ok(RunReport {
            state,
            completed,
            halted: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factcheck_config::PipelineEntry;
    use factcheck_types::{CapabilityKind, ConfigError, FactCheckError, Parameters, StateRead, Verdict};

    #[test]
    fn from_config_builds_default_pipeline() {
        let config = FactCheckConfig::default();
        let pipeline = Pipeline::from_config(&config, &SolverRegistry::with_builtins()).unwrap();

        assert_eq!(pipeline.shape(), PipelineShape::Standard);
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "sentence_claim_extractor",
                "corpus_retriever",
                "evidence_overlap_verifier"
            ]
        );
    }

    #[test]
    fn from_config_reports_unknown_solver() {
        let mut config = FactCheckConfig::default();
        config.pipeline = vec![PipelineEntry::new("oracle", CapabilityKind::Verifier)];

        let err = Pipeline::from_config(&config, &SolverRegistry::with_builtins()).unwrap_err();
        assert_eq!(
            err,
            FactCheckError::Config(ConfigError::UnknownSolver("oracle".into()))
        );
    }

    #[test]
    fn from_config_reports_unsatisfied_input() {
        let mut config = FactCheckConfig::default();
        config.pipeline = vec![PipelineEntry::new("constant_verifier", CapabilityKind::Verifier)
            .with_parameters(Parameters::new().with("label", "true"))];

        let err = Pipeline::from_config(&config, &SolverRegistry::with_builtins()).unwrap_err();
        assert!(matches!(
            err,
            FactCheckError::Validation(ConfigValidationError::UnsatisfiedInput { ref key, .. })
                if key.as_str() == "claims"
        ));
    }

    #[tokio::test]
    async fn missing_initial_key_fails_before_any_stage() {
        let pipeline = Pipeline::from_config(
            &FactCheckConfig::default(),
            &SolverRegistry::with_builtins(),
        )
        .unwrap();

        let err = pipeline
            .run(State::new().with("question", "q"))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::MissingKey(StateKey::from("response")));
    }

    #[tokio::test]
    async fn default_pipeline_without_corpus_abstains() {
        let pipeline = Pipeline::from_config(
            &FactCheckConfig::default(),
            &SolverRegistry::with_builtins(),
        )
        .unwrap();

        let state = pipeline
            .run(
                State::new()
                    .with("question", "Where is the Louvre?")
                    .with("response", "The Louvre is a museum in Paris."),
            )
            .await
            .unwrap();

        assert_eq!(state.verdict("verdict").unwrap(), Verdict::Abstain);
        assert_eq!(state.claim_verdicts("claim_verdicts").unwrap().len(), 1);
    }
}
