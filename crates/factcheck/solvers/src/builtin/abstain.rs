use async_trait::async_trait;
use factcheck_types::{
    CapabilityKind, ConfigError, ExecutionError, Flow, Parameters, RunContext, SolverDescriptor,
    StageState, StateKey, StateRead,
};
use tracing::info;

use super::key_param;
use crate::solver::Solver;
use crate::text::remove_punctuation;

const DEFAULT_PHRASES: &[&str] = &[
    "I cannot answer",
    "I can't answer",
    "I don't know",
    "I do not know",
    "I am not sure",
    "I'm not sure",
    "I am unable to",
    "I'm unable to",
    "As an AI language model",
    "There is no public information available",
];

/// Stops the run when the response declines to answer.
///
/// Writes `answered` or `abstained` to its status key. An abstaining response
/// has nothing to check, so the run halts there.
pub struct AbstainDetector {
    descriptor: SolverDescriptor,
    input_key: StateKey,
    status_key: StateKey,
    phrases: Vec<String>,
}

impl AbstainDetector {
    pub const NAME: &'static str = "abstain_detector";

    /// Parameters: `input_key` (default `response`), `output_key`
    /// (default `response_status`), `phrases` (`|`-separated).
    pub fn from_parameters(params: &Parameters) -> Result<Self, ConfigError> {
        let input_key = key_param(params, "input_key", "response")?;
        let status_key = key_param(params, "output_key", "response_status")?;
        let phrases: Vec<String> = match params.str("phrases")? {
            Some(list) => list
                .split('|')
                .map(normalize)
                .filter(|p| !p.is_empty())
                .collect(),
            None => DEFAULT_PHRASES.iter().map(|p| normalize(p)).collect(),
        };
        if phrases.is_empty() {
            return Err(ConfigError::InvalidParameter {
                parameter: "phrases".into(),
                reason: "no phrases given".into(),
            });
        }

        let descriptor = SolverDescriptor::new(Self::NAME, CapabilityKind::ClaimProcessor)
            .with_inputs([&input_key])
            .with_outputs([&status_key])
            .with_parameters(params.clone());
        Ok(Self {
            descriptor,
            input_key,
            status_key,
            phrases,
        })
    }

    fn matching_phrase(&self, response: &str) -> Option<&str> {
        let response = normalize(response);
        self.phrases
            .iter()
            .find(|phrase| response.contains(phrase.as_str()))
            .map(String::as_str)
    }
}

fn normalize(text: &str) -> String {
    remove_punctuation(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Solver for AbstainDetector {
    fn descriptor(&self) -> &SolverDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        state: &mut StageState<'_>,
        _ctx: &RunContext,
    ) -> Result<Flow, ExecutionError> {
        let phrase = self
            .matching_phrase(state.text(self.input_key.as_str())?)
            .map(str::to_string);

        match phrase {
            Some(phrase) => {
                info!(phrase = %phrase, "Response abstains");
                state.set(&self.status_key, "abstained")?;
                Ok(Flow::halt(format!("response abstains: \"{phrase}\"")))
            }
            None => {
                state.set(&self.status_key, "answered")?;
                Ok(Flow::Continue)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factcheck_types::State;

    async fn run(detector: &AbstainDetector, response: &str) -> (Flow, State) {
        let mut state = State::new().with("response", response);
        let flow = detector
            .execute(
                &mut StageState::new(&mut state, detector.descriptor()),
                &RunContext::new(),
            )
            .await
            .unwrap();
        (flow, state)
    }

    #[tokio::test]
    async fn halts_on_abstention() {
        let detector = AbstainDetector::from_parameters(&Parameters::new()).unwrap();
        let (flow, state) = run(&detector, "Honestly, I'm not sure about that.").await;

        assert!(matches!(flow, Flow::Halt { .. }));
        assert_eq!(state.text("response_status").unwrap(), "abstained");
    }

    #[tokio::test]
    async fn passes_answers_through() {
        let detector = AbstainDetector::from_parameters(&Parameters::new()).unwrap();
        let (flow, state) = run(&detector, "The Moon orbits the Earth.").await;

        assert_eq!(flow, Flow::Continue);
        assert_eq!(state.text("response_status").unwrap(), "answered");
    }

    #[tokio::test]
    async fn custom_phrases() {
        let params = Parameters::new().with("phrases", "no comment|pass");
        let detector = AbstainDetector::from_parameters(&params).unwrap();
        let (flow, _) = run(&detector, "No comment!").await;
        assert!(!flow.is_continue());
    }
}
