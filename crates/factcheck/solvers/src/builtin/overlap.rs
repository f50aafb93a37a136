use async_trait::async_trait;
use factcheck_types::{
    CapabilityKind, ClaimEvidence, ClaimVerdict, ConfigError, ExecutionError, Flow, Parameters,
    RunContext, SolverDescriptor, StageState, StateKey, StateRead, StateValue, Verdict,
};
use tracing::debug;

use super::key_param;
use crate::solver::Solver;
use crate::text::coverage;

/// Supports a claim when some evidence passage covers enough of its content
/// words.
///
/// Claims without evidence abstain. The response verdict aggregates the
/// per-claim verdicts.
pub struct EvidenceOverlapVerifier {
    descriptor: SolverDescriptor,
    input_key: StateKey,
    claims_key: StateKey,
    verdict_key: StateKey,
    support_threshold: f64,
}

impl EvidenceOverlapVerifier {
    pub const NAME: &'static str = "evidence_overlap_verifier";

    pub fn from_parameters(params: &Parameters) -> Result<Self, ConfigError> {
        let input_key = key_param(params, "input_key", "claims_with_evidence")?;
        let claims_key = key_param(params, "claims_output_key", "claim_verdicts")?;
        let verdict_key = key_param(params, "output_key", "verdict")?;
        let support_threshold = params.f64_or("support_threshold", 0.5)?;
        if !(0.0..=1.0).contains(&support_threshold) {
            return Err(ConfigError::InvalidParameter {
                parameter: "support_threshold".into(),
                reason: format!("{support_threshold} is outside [0, 1]"),
            });
        }

        let descriptor = SolverDescriptor::new(Self::NAME, CapabilityKind::Verifier)
            .with_inputs([&input_key])
            .with_outputs([&claims_key, &verdict_key])
            .with_parameters(params.clone());
        Ok(Self {
            descriptor,
            input_key,
            claims_key,
            verdict_key,
            support_threshold,
        })
    }

    pub fn judge(&self, item: &ClaimEvidence) -> ClaimVerdict {
        let best = item
            .evidence
            .iter()
            .map(|e| (coverage(&item.claim, &e.text), e.source.as_str()))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        let (verdict, rationale) = match best {
            None => (Verdict::Abstain, "no evidence retrieved".to_string()),
            Some((score, source)) => {
                let verdict = if score >= self.support_threshold {
                    Verdict::True
                } else {
                    Verdict::False
                };
                (verdict, format!("best coverage {score:.2} from {source}"))
            }
        };
        ClaimVerdict {
            claim: item.claim.clone(),
            verdict,
            rationale: Some(rationale),
            correction: None,
        }
    }
}

#[async_trait]
impl Solver for EvidenceOverlapVerifier {
    fn descriptor(&self) -> &SolverDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        state: &mut StageState<'_>,
        _ctx: &RunContext,
    ) -> Result<Flow, ExecutionError> {
        let verdicts: Vec<ClaimVerdict> = state
            .evidence(self.input_key.as_str())?
            .iter()
            .map(|item| self.judge(item))
            .collect();
        let overall = Verdict::aggregate(verdicts.iter().map(|v| &v.verdict));
        debug!(claims = verdicts.len(), verdict = %overall, "Verified claims");

        state.set(&self.claims_key, StateValue::ClaimVerdicts(verdicts))?;
        state.set(&self.verdict_key, overall)?;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factcheck_types::Evidence;

    fn evidence(text: &str) -> Evidence {
        Evidence {
            source: "corpus".into(),
            text: text.into(),
            score: 0.0,
        }
    }

    #[test]
    fn judges_by_threshold() {
        let verifier = EvidenceOverlapVerifier::from_parameters(&Parameters::new()).unwrap();

        let supported = verifier.judge(&ClaimEvidence {
            claim: "The Nile flows through Egypt".into(),
            evidence: vec![evidence("The Nile river flows north through Egypt.")],
        });
        assert_eq!(supported.verdict, Verdict::True);

        let refuted = verifier.judge(&ClaimEvidence {
            claim: "The Nile flows through Brazil and Peru".into(),
            evidence: vec![evidence("Rivers in Africa.")],
        });
        assert_eq!(refuted.verdict, Verdict::False);

        let unknown = verifier.judge(&ClaimEvidence {
            claim: "Anything".into(),
            evidence: vec![],
        });
        assert_eq!(unknown.verdict, Verdict::Abstain);
    }

    #[test]
    fn threshold_out_of_range() {
        let params = Parameters::new().with("support_threshold", 1.5);
        assert!(EvidenceOverlapVerifier::from_parameters(&params).is_err());
    }
}
