use std::collections::HashSet;
use std::path::PathBuf;

use factcheck_types::{CapabilityKind, ConfigError, Parameters};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evaluation::EvaluationConfig;

/// Main factcheck configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckConfig {
    /// Directory where run records and evaluation results are written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Keys present in the state before the first stage runs.
    #[serde(default = "default_initial_keys")]
    pub initial_keys: Vec<String>,

    /// Ordered solver entries.
    #[serde(default = "default_pipeline")]
    pub pipeline: Vec<PipelineEntry>,

    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl Default for FactCheckConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            logging: LoggingConfig::default(),
            initial_keys: default_initial_keys(),
            pipeline: default_pipeline(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

/// One solver in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEntry {
    /// Registered solver name.
    pub name: String,

    pub capability_kind: CapabilityKind,

    #[serde(default)]
    pub parameters: Parameters,
}

impl PipelineEntry {
    pub fn new(name: impl Into<String>, capability_kind: CapabilityKind) -> Self {
        Self {
            name: name.into(),
            capability_kind,
            parameters: Parameters::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_output_path() -> PathBuf {
    PathBuf::from("./factcheck-output")
}

fn default_initial_keys() -> Vec<String> {
    vec!["question".to_string(), "response".to_string()]
}

fn default_pipeline() -> Vec<PipelineEntry> {
    vec![
        PipelineEntry::new("sentence_claim_extractor", CapabilityKind::ClaimProcessor),
        PipelineEntry::new("corpus_retriever", CapabilityKind::Retriever),
        PipelineEntry::new("evidence_overlap_verifier", CapabilityKind::Verifier),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FactCheckConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `FACTCHECK_*` environment variables (`__` separates nested keys).
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(
            config::Config::try_from(&FactCheckConfig::default()).map_err(load_error)?,
        );

        if let Some(path) = path {
            debug!(path, "Loading configuration file");
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FACTCHECK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: FactCheckConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(load_error)?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, entry) in self.pipeline.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "pipeline entry {index} has an empty solver name"
                )));
            }
        }
        if self.initial_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid("initial_keys contains an empty key".into()));
        }
        if self.evaluation.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "evaluation.concurrency must be at least 1".into(),
            ));
        }
        let threshold = self.evaluation.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "evaluation.similarity_threshold must be within [0, 1], got {threshold}"
            )));
        }
        let mut names = HashSet::new();
        for dataset in &self.evaluation.datasets {
            if dataset.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "evaluation.datasets contains an entry with an empty name".into(),
                ));
            }
            if !names.insert(dataset.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "evaluation dataset '{}' is declared twice",
                    dataset.name
                )));
            }
        }
        Ok(())
    }

    /// Directory for JSONL run records.
    pub fn runs_dir(&self) -> PathBuf {
        self.output_path.join("runs")
    }

    /// Directory for benchmark evaluation output.
    pub fn evaluation_dir(&self) -> PathBuf {
        self.output_path.join("llm_evaluator")
    }
}

fn load_error(err: config::ConfigError) -> ConfigError {
    ConfigError::Load(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{AbstainPolicy, DatasetSource, EvaluatorKind};
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = FactCheckConfig::default();
        assert_eq!(config.initial_keys, vec!["question", "response"]);
        assert_eq!(config.pipeline.len(), 3);
        assert_eq!(config.evaluation.concurrency, 4);
        assert_eq!(config.evaluation.abstain_policy, AbstainPolicy::CountAsIncorrect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml_file() {
        let file = write_config(
            r#"
output_path: /tmp/fc
pipeline:
  - name: sentence_claim_extractor
    capability_kind: claim_processor
    parameters:
      max_claims: 2
  - name: constant_verifier
    capability_kind: verifier
    parameters:
      label: "false"
evaluation:
  abstain_policy: exclude
  datasets:
    - name: snowballing
      path: data/snowballing.jsonl
      evaluator: snowballing
"#,
        );

        let config = FactCheckConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.output_path, PathBuf::from("/tmp/fc"));
        assert_eq!(config.pipeline.len(), 2);
        assert_eq!(config.pipeline[1].capability_kind, CapabilityKind::Verifier);
        assert_eq!(
            config.pipeline[1].parameters.require_str("label").unwrap(),
            "false"
        );
        assert_eq!(config.pipeline[0].parameters.u64_or("max_claims", 0).unwrap(), 2);
        assert_eq!(config.evaluation.abstain_policy, AbstainPolicy::Exclude);
        assert_eq!(
            config.evaluation.datasets[0],
            DatasetSource::new("snowballing", "data/snowballing.jsonl", EvaluatorKind::Snowballing)
        );
    }

    #[test]
    fn test_dataset_names_keep_their_case() {
        let file = write_config(
            r#"
evaluation:
  datasets:
    - name: FreshQA
      path: data/FreshQA.jsonl
      evaluator: fresh_qa
    - name: SelfAware
      path: data/selfaware.jsonl
      evaluator: self_aware
"#,
        );

        let config = FactCheckConfig::load(file.path().to_str()).unwrap();
        let names: Vec<&str> = config
            .evaluation
            .datasets
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["FreshQA", "SelfAware"]);
        assert_eq!(config.evaluation.datasets[0].path, PathBuf::from("data/FreshQA.jsonl"));
    }

    #[test]
    fn test_validate_rejects_duplicate_dataset_names() {
        let mut config = FactCheckConfig::default();
        config.evaluation.datasets = vec![
            DatasetSource::new("freshqa", "a.jsonl", EvaluatorKind::FreshQa),
            DatasetSource::new("freshqa", "b.jsonl", EvaluatorKind::FreshQa),
        ];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_nested_parameters_rejected() {
        let file = write_config(
            r#"
pipeline:
  - name: constant_verifier
    capability_kind: verifier
    parameters:
      model:
        name: gpt
"#,
        );

        assert!(matches!(
            FactCheckConfig::load(file.path().to_str()),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            FactCheckConfig::load(Some("/nonexistent/factcheck.yaml")),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = FactCheckConfig::default();
        config.evaluation.concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
