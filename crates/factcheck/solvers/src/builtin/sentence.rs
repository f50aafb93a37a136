use async_trait::async_trait;
use factcheck_types::{
    CapabilityKind, ConfigError, ExecutionError, Flow, Parameters, RunContext, SolverDescriptor,
    StageState, StateKey, StateRead, StateValue,
};
use tracing::debug;

use super::key_param;
use crate::solver::Solver;
use crate::text::split_sentences;

/// Treats every sufficiently long sentence of the response as a claim.
pub struct SentenceClaimExtractor {
    descriptor: SolverDescriptor,
    input_key: StateKey,
    output_key: StateKey,
    max_claims: usize,
    min_chars: usize,
}

impl SentenceClaimExtractor {
    pub const NAME: &'static str = "sentence_claim_extractor";

    pub fn from_parameters(params: &Parameters) -> Result<Self, ConfigError> {
        let input_key = key_param(params, "input_key", "response")?;
        let output_key = key_param(params, "output_key", "claims")?;
        let max_claims = params.u64_or("max_claims", 32)? as usize;
        let min_chars = params.u64_or("min_chars", 8)? as usize;
        if max_claims == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_claims".into(),
                reason: "must be at least 1".into(),
            });
        }

        let descriptor = SolverDescriptor::new(Self::NAME, CapabilityKind::ClaimProcessor)
            .with_inputs([&input_key])
            .with_outputs([&output_key])
            .with_parameters(params.clone());
        Ok(Self {
            descriptor,
            input_key,
            output_key,
            max_claims,
            min_chars,
        })
    }

    pub fn extract(&self, response: &str) -> Vec<String> {
        split_sentences(response)
            .into_iter()
            .filter(|s| s.chars().count() >= self.min_chars)
            .take(self.max_claims)
            .collect()
    }
}

#[async_trait]
impl Solver for SentenceClaimExtractor {
    fn descriptor(&self) -> &SolverDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        state: &mut StageState<'_>,
        _ctx: &RunContext,
    ) -> Result<Flow, ExecutionError> {
        let claims = self.extract(state.text(self.input_key.as_str())?);
        debug!(claims = claims.len(), "Extracted claims");
        state.set(&self.output_key, StateValue::Claims(claims))?;
        Ok(Flow::Continue)
    }
}
