use async_trait::async_trait;
use factcheck_types::{
    CapabilityKind, ConfigError, ExecutionError, Flow, Parameters, RunContext, SolverDescriptor,
    StageState, StateKey, StateRead, Verdict,
};

use super::key_param;
use crate::solver::Solver;

/// Returns the same verdict for every response. Useful as a baseline and in
/// tests.
pub struct ConstantVerifier {
    descriptor: SolverDescriptor,
    input_key: StateKey,
    output_key: StateKey,
    label: Verdict,
}

impl ConstantVerifier {
    pub const NAME: &'static str = "constant_verifier";

    /// Parameters: `label` (required), `input_key` (default `claims`),
    /// `output_key` (default `verdict`).
    pub fn from_parameters(params: &Parameters) -> Result<Self, ConfigError> {
        let label = params
            .require_str("label")?
            .parse::<Verdict>()
            .map_err(|reason| ConfigError::InvalidParameter {
                parameter: "label".into(),
                reason,
            })?;
        let input_key = key_param(params, "input_key", "claims")?;
        let output_key = key_param(params, "output_key", "verdict")?;

        let descriptor = SolverDescriptor::new(Self::NAME, CapabilityKind::Verifier)
            .with_inputs([&input_key])
            .with_outputs([&output_key])
            .with_parameters(params.clone());
        Ok(Self {
            descriptor,
            input_key,
            output_key,
            label,
        })
    }
}

#[async_trait]
impl Solver for ConstantVerifier {
    fn descriptor(&self) -> &SolverDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        state: &mut StageState<'_>,
        _ctx: &RunContext,
    ) -> Result<Flow, ExecutionError> {
        // The input must exist even though its content is ignored.
        state.value(self.input_key.as_str())?;
        state.set(&self.output_key, self.label)?;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_must_be_a_verdict() {
        let params = Parameters::new().with("label", "probably");
        assert!(matches!(
            ConstantVerifier::from_parameters(&params),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }
}
