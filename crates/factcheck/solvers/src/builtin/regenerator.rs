use async_trait::async_trait;
use factcheck_types::{
    CapabilityKind, ClaimVerdict, ConfigError, ExecutionError, Flow, Parameters, RunContext,
    SolverDescriptor, StageState, StateKey, StateRead, Verdict,
};

use super::key_param;
use crate::solver::Solver;

/// Rebuilds the response from verified claims.
///
/// Supported and undecided claims are kept, refuted or mixed claims are
/// replaced by their correction when one exists and dropped otherwise.
pub struct ConcatResponseRegenerator {
    descriptor: SolverDescriptor,
    input_key: StateKey,
    output_key: StateKey,
}

impl ConcatResponseRegenerator {
    pub const NAME: &'static str = "concat_response_regenerator";

    pub fn from_parameters(params: &Parameters) -> Result<Self, ConfigError> {
        let input_key = key_param(params, "input_key", "claim_verdicts")?;
        let output_key = key_param(params, "output_key", "revised_response")?;
        let descriptor = SolverDescriptor::new(Self::NAME, CapabilityKind::Verifier)
            .with_inputs([&input_key])
            .with_outputs([&output_key])
            .with_parameters(params.clone());
        Ok(Self {
            descriptor,
            input_key,
            output_key,
        })
    }

    pub fn regenerate(verdicts: &[ClaimVerdict]) -> String {
        verdicts
            .iter()
            .filter_map(|v| match v.verdict {
                Verdict::True | Verdict::Abstain => Some(v.claim.as_str()),
                Verdict::False | Verdict::Mixed => v.correction.as_deref(),
            })
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

#[async_trait]
impl Solver for ConcatResponseRegenerator {
    fn descriptor(&self) -> &SolverDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        state: &mut StageState<'_>,
        _ctx: &RunContext,
    ) -> Result<Flow, ExecutionError> {
        let revised = Self::regenerate(state.claim_verdicts(self.input_key.as_str())?);
        state.set(&self.output_key, revised)?;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuted_claims_use_corrections() {
        let verdicts = vec![
            ClaimVerdict {
                claim: "Rome is in Italy.".into(),
                verdict: Verdict::True,
                rationale: None,
                correction: None,
            },
            ClaimVerdict {
                claim: "Rome has 90 million people.".into(),
                verdict: Verdict::False,
                rationale: None,
                correction: Some("Rome has about 2.8 million people.".into()),
            },
            ClaimVerdict {
                claim: "Rome was founded in 1900.".into(),
                verdict: Verdict::False,
                rationale: None,
                correction: None,
            },
        ];

        assert_eq!(
            ConcatResponseRegenerator::regenerate(&verdicts),
            "Rome is in Italy. Rome has about 2.8 million people."
        );
    }
}
