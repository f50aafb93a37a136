use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parameters::Parameters;
use crate::state::StateKey;

/// The role a solver plays in a fact-checking pipeline.
///
/// Kinds are ordered: claim processing comes before retrieval, retrieval
/// before verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Turns a response into checkable claims.
    ClaimProcessor,
    /// Gathers evidence for claims.
    Retriever,
    /// Judges claims against evidence.
    Verifier,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 3] = [
        CapabilityKind::ClaimProcessor,
        CapabilityKind::Retriever,
        CapabilityKind::Verifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::ClaimProcessor => "claim_processor",
            CapabilityKind::Retriever => "retriever",
            CapabilityKind::Verifier => "verifier",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "claimprocessor" | "cp" => Ok(CapabilityKind::ClaimProcessor),
            "retriever" | "rtv" => Ok(CapabilityKind::Retriever),
            "verifier" | "vfr" => Ok(CapabilityKind::Verifier),
            _ => Err(ConfigError::UnknownKind(s.to_string())),
        }
    }
}

/// Static description of a solver: its name, role and state contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverDescriptor {
    pub name: String,
    pub kind: CapabilityKind,
    pub input_keys: Vec<StateKey>,
    pub output_keys: Vec<StateKey>,
    #[serde(default)]
    pub parameters: Parameters,
}

impl SolverDescriptor {
    pub fn new(name: impl Into<String>, kind: CapabilityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            input_keys: Vec::new(),
            output_keys: Vec::new(),
            parameters: Parameters::default(),
        }
    }

    pub fn with_inputs<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<StateKey>,
    {
        self.input_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_outputs<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<StateKey>,
    {
        self.output_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn declares_input(&self, key: &str) -> bool {
        self.input_keys.iter().any(|k| k.as_str() == key)
    }

    pub fn declares_output(&self, key: &str) -> bool {
        self.output_keys.iter().any(|k| k.as_str() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_accepts_common_spellings() {
        assert_eq!(
            "claim-processor".parse::<CapabilityKind>().unwrap(),
            CapabilityKind::ClaimProcessor
        );
        assert_eq!(
            "ClaimProcessor".parse::<CapabilityKind>().unwrap(),
            CapabilityKind::ClaimProcessor
        );
        assert_eq!(
            "vfr".parse::<CapabilityKind>().unwrap(),
            CapabilityKind::Verifier
        );
        assert!(matches!(
            "ranker".parse::<CapabilityKind>(),
            Err(ConfigError::UnknownKind(_))
        ));
    }

    #[test]
    fn kinds_are_ordered() {
        assert!(CapabilityKind::ClaimProcessor < CapabilityKind::Retriever);
        assert!(CapabilityKind::Retriever < CapabilityKind::Verifier);
    }

    #[test]
    fn descriptor_declarations() {
        let descriptor = SolverDescriptor::new("extractor", CapabilityKind::ClaimProcessor)
            .with_inputs(["response"])
            .with_outputs(["claims"]);

        assert!(descriptor.declares_input("response"));
        assert!(!descriptor.declares_input("claims"));
        assert!(descriptor.declares_output("claims"));
    }
}
