use std::collections::HashSet;
use std::fmt;

use factcheck_types::{CapabilityKind, ConfigValidationError, SolverDescriptor, StateKey};
use serde::{Deserialize, Serialize};

/// Supported arrangements of capability kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineShape {
    /// A single claim processor.
    ClaimOnly,
    /// Claim processor, retriever, verifier.
    Standard,
    /// Any other chain whose kinds never go backwards.
    Custom,
}

impl PipelineShape {
    fn classify(kinds: &[CapabilityKind]) -> Self {
        use CapabilityKind::*;
        match kinds {
            [ClaimProcessor] => PipelineShape::ClaimOnly,
            [ClaimProcessor, Retriever, Verifier] => PipelineShape::Standard,
            _ => PipelineShape::Custom,
        }
    }
}

impl fmt::Display for PipelineShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineShape::ClaimOnly => "claim_only",
            PipelineShape::Standard => "standard",
            PipelineShape::Custom => "custom",
        })
    }
}

/// Check a chain of stage descriptors against the initial state contract.
///
/// Stages are checked in order; the first violation is returned.
pub fn validate(
    descriptors: &[&SolverDescriptor],
    initial_keys: &[StateKey],
) -> Result<PipelineShape, ConfigValidationError> {
    if descriptors.is_empty() {
        return Err(ConfigValidationError::EmptyPipeline);
    }

    let mut available: HashSet<&str> = initial_keys.iter().map(StateKey::as_str).collect();
    let mut names: HashSet<&str> = HashSet::new();
    let mut previous: Option<CapabilityKind> = None;

    for descriptor in descriptors {
        if !names.insert(descriptor.name.as_str()) {
            return Err(ConfigValidationError::DuplicateStage(descriptor.name.clone()));
        }
        if descriptor.output_keys.is_empty() {
            return Err(ConfigValidationError::NoOutputs(descriptor.name.clone()));
        }
        if let Some(previous) = previous {
            if descriptor.kind < previous {
                return Err(ConfigValidationError::KindOrder {
                    stage: descriptor.name.clone(),
                    kind: descriptor.kind,
                    previous,
                });
            }
        }
        if let Some(missing) = descriptor
            .input_keys
            .iter()
            .find(|key| !available.contains(key.as_str()))
        {
            return Err(ConfigValidationError::UnsatisfiedInput {
                stage: descriptor.name.clone(),
                key: missing.clone(),
            });
        }

        available.extend(descriptor.output_keys.iter().map(StateKey::as_str));
        previous = Some(descriptor.kind);
    }

    let kinds: Vec<CapabilityKind> = descriptors.iter().map(|d| d.kind).collect();
    Ok(PipelineShape::classify(&kinds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stage(name: &str, kind: CapabilityKind, inputs: &[&str], outputs: &[&str]) -> SolverDescriptor {
        SolverDescriptor::new(name, kind)
            .with_inputs(inputs.iter().copied())
            .with_outputs(outputs.iter().copied())
    }

    fn initial() -> Vec<StateKey> {
        vec![StateKey::from("question"), StateKey::from("response")]
    }

    #[test]
    fn standard_shape() {
        let cp = stage("cp", CapabilityKind::ClaimProcessor, &["response"], &["claims"]);
        let rtv = stage("rtv", CapabilityKind::Retriever, &["claims"], &["evidence"]);
        let vfr = stage("vfr", CapabilityKind::Verifier, &["evidence"], &["verdict"]);

        assert_eq!(
            validate(&[&cp, &rtv, &vfr], &initial()).unwrap(),
            PipelineShape::Standard
        );
        assert_eq!(validate(&[&cp], &initial()).unwrap(), PipelineShape::ClaimOnly);
        assert_eq!(validate(&[&cp, &vfr], &initial()), Err(
            ConfigValidationError::UnsatisfiedInput {
                stage: "vfr".into(),
                key: StateKey::from("evidence"),
            }
        ));
    }

    #[test]
    fn custom_chain_with_two_claim_processors() {
        let detector = stage("detector", CapabilityKind::ClaimProcessor, &["response"], &["status"]);
        let cp = stage("cp", CapabilityKind::ClaimProcessor, &["response"], &["claims"]);
        let vfr = stage("vfr", CapabilityKind::Verifier, &["claims"], &["verdict"]);

        assert_eq!(
            validate(&[&detector, &cp, &vfr], &initial()).unwrap(),
            PipelineShape::Custom
        );
    }

    #[test]
    fn verifier_without_claims_names_missing_key() {
        let vfr = stage("vfr", CapabilityKind::Verifier, &["claims"], &["verdict"]);
        let err = validate(&[&vfr], &initial()).unwrap_err();
        assert!(err.to_string().contains("'claims'"));
    }

    #[test]
    fn backwards_kind_rejected() {
        let vfr = stage("vfr", CapabilityKind::Verifier, &["response"], &["verdict"]);
        let rtv = stage("rtv", CapabilityKind::Retriever, &["response"], &["evidence"]);
        assert!(matches!(
            validate(&[&vfr, &rtv], &initial()),
            Err(ConfigValidationError::KindOrder { .. })
        ));
    }

    #[test]
    fn empty_and_duplicate_rejected() {
        assert_eq!(validate(&[], &initial()), Err(ConfigValidationError::EmptyPipeline));

        let cp = stage("cp", CapabilityKind::ClaimProcessor, &["response"], &["claims"]);
        assert_eq!(
            validate(&[&cp, &cp], &initial()),
            Err(ConfigValidationError::DuplicateStage("cp".into()))
        );
    }

    // Chains where stage i reads key i and writes key i+1, with kinds in order.
    fn chain(kinds: &[CapabilityKind], broken_at: Option<usize>) -> Vec<SolverDescriptor> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let input = if Some(i) == broken_at {
                    "never_written".to_string()
                } else {
                    format!("k{i}")
                };
                SolverDescriptor::new(format!("s{i}"), *kind)
                    .with_inputs([input])
                    .with_outputs([format!("k{}", i + 1)])
            })
            .collect()
    }

    fn sorted_kinds() -> impl Strategy<Value = Vec<CapabilityKind>> {
        prop::collection::vec(0usize..3, 1..8).prop_map(|mut raw| {
            raw.sort_unstable();
            raw.into_iter().map(|i| CapabilityKind::ALL[i]).collect()
        })
    }

    proptest! {
        #[test]
        fn satisfied_chains_validate(kinds in sorted_kinds()) {
            let stages = chain(&kinds, None);
            let refs: Vec<&SolverDescriptor> = stages.iter().collect();
            prop_assert!(validate(&refs, &[StateKey::from("k0")]).is_ok());
        }

        #[test]
        fn unsatisfied_input_is_reported(kinds in sorted_kinds(), pick in any::<prop::sample::Index>()) {
            let broken = pick.index(kinds.len());
            let stages = chain(&kinds, Some(broken));
            let refs: Vec<&SolverDescriptor> = stages.iter().collect();
            let err = validate(&refs, &[StateKey::from("k0")]).unwrap_err();
            prop_assert_eq!(err, ConfigValidationError::UnsatisfiedInput {
                stage: format!("s{broken}"),
                key: StateKey::from("never_written"),
            });
        }
    }
}
