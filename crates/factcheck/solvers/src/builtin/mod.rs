//! Built-in local solvers.

mod abstain;
mod constant;
mod corpus;
mod overlap;
mod regenerator;
mod sentence;

use std::sync::Arc;

use factcheck_types::{CapabilityKind, ConfigError, Parameters, StateKey};

use crate::registry::SolverFactory;
use crate::solver::Solver;

pub use abstain::AbstainDetector;
pub use constant::ConstantVerifier;
pub use corpus::{CorpusDocument, CorpusRetriever};
pub use overlap::EvidenceOverlapVerifier;
pub use regenerator::ConcatResponseRegenerator;
pub use sentence::SentenceClaimExtractor;

/// Name, kind and constructor of every built-in solver.
pub(crate) fn registrations() -> Vec<(&'static str, CapabilityKind, SolverFactory)> {
    vec![
        (
            AbstainDetector::NAME,
            CapabilityKind::ClaimProcessor,
            factory(AbstainDetector::from_parameters),
        ),
        (
            SentenceClaimExtractor::NAME,
            CapabilityKind::ClaimProcessor,
            factory(SentenceClaimExtractor::from_parameters),
        ),
        (
            CorpusRetriever::NAME,
            CapabilityKind::Retriever,
            factory(CorpusRetriever::from_parameters),
        ),
        (
            EvidenceOverlapVerifier::NAME,
            CapabilityKind::Verifier,
            factory(EvidenceOverlapVerifier::from_parameters),
        ),
        (
            ConstantVerifier::NAME,
            CapabilityKind::Verifier,
            factory(ConstantVerifier::from_parameters),
        ),
        (
            ConcatResponseRegenerator::NAME,
            CapabilityKind::Verifier,
            factory(ConcatResponseRegenerator::from_parameters),
        ),
    ]
}

fn factory<S, F>(build: F) -> SolverFactory
where
    S: Solver + 'static,
    F: Fn(&Parameters) -> Result<S, ConfigError> + Send + Sync + 'static,
{
    Arc::new(move |params: &Parameters| {
        let solver: Arc<dyn Solver> = Arc::new(build(params)?);
        Ok(solver)
    })
}

/// State key named by parameter `name`, or `default`.
pub(crate) fn key_param(
    params: &Parameters,
    name: &str,
    default: &str,
) -> Result<StateKey, ConfigError> {
    Ok(StateKey::from(params.str(name)?.unwrap_or(default)))
}
