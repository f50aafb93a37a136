use std::path::Path;

use async_trait::async_trait;
use factcheck_types::{
    CapabilityKind, ClaimEvidence, ConfigError, Evidence, ExecutionError, Flow, Parameters,
    RunContext, SolverDescriptor, StageState, StateKey, StateRead, StateValue,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::key_param;
use crate::solver::Solver;
use crate::text::coverage;

/// One passage of a local retrieval corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// Retrieves evidence from an in-memory corpus by content-word coverage.
///
/// Without a corpus every claim gets an empty evidence list.
pub struct CorpusRetriever {
    descriptor: SolverDescriptor,
    input_key: StateKey,
    output_key: StateKey,
    documents: Vec<CorpusDocument>,
    max_documents: usize,
    min_score: f64,
}

impl CorpusRetriever {
    pub const NAME: &'static str = "corpus_retriever";

    /// Parameters: `corpus_path` (JSONL of `{id, text, source}`),
    /// `max_num_documents` (default 5), `min_score` (default 0),
    /// `input_key` (default `claims`), `output_key` (default `claims_with_evidence`).
    pub fn from_parameters(params: &Parameters) -> Result<Self, ConfigError> {
        let input_key = key_param(params, "input_key", "claims")?;
        let output_key = key_param(params, "output_key", "claims_with_evidence")?;
        let max_documents = params.u64_or("max_num_documents", 5)? as usize;
        let min_score = params.f64_or("min_score", 0.0)?;
        let documents = match params.str("corpus_path")? {
            Some(path) => load_corpus(Path::new(path))?,
            None => Vec::new(),
        };

        let descriptor = SolverDescriptor::new(Self::NAME, CapabilityKind::Retriever)
            .with_inputs([&input_key])
            .with_outputs([&output_key])
            .with_parameters(params.clone());
        Ok(Self {
            descriptor,
            input_key,
            output_key,
            documents,
            max_documents,
            min_score,
        })
    }

    pub fn with_documents(mut self, documents: Vec<CorpusDocument>) -> Self {
        self.documents = documents;
        self
    }

    pub fn retrieve(&self, claim: &str) -> Vec<Evidence> {
        let mut scored: Vec<(f64, &CorpusDocument)> = self
            .documents
            .iter()
            .map(|doc| (coverage(claim, &doc.text), doc))
            .filter(|(score, _)| *score > self.min_score)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(self.max_documents)
            .map(|(score, doc)| Evidence {
                source: doc.source.clone().unwrap_or_else(|| doc.id.clone()),
                text: doc.text.clone(),
                score,
            })
            .collect()
    }
}

fn load_corpus(path: &Path) -> Result<Vec<CorpusDocument>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidParameter {
        parameter: "corpus_path".into(),
        reason,
    };
    let contents = std::fs::read_to_string(path)
        .map_err(|e| invalid(format!("{}: {e}", path.display())))?;

    let mut documents = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut doc: CorpusDocument = serde_json::from_str(line)
            .map_err(|e| invalid(format!("{} line {}: {e}", path.display(), line_no + 1)))?;
        if doc.id.is_empty() {
            doc.id = format!("doc-{}", line_no + 1);
        }
        documents.push(doc);
    }
    info!(path = %path.display(), documents = documents.len(), "Loaded retrieval corpus");
    Ok(documents)
}

#[async_trait]
impl Solver for CorpusRetriever {
    fn descriptor(&self) -> &SolverDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        state: &mut StageState<'_>,
        ctx: &RunContext,
    ) -> Result<Flow, ExecutionError> {
        let mut results = Vec::new();
        for claim in state.claims(self.input_key.as_str())? {
            if ctx.cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled {
                    stage: Self::NAME.to_string(),
                });
            }
            let evidence = self.retrieve(claim);
            debug!(claim = %claim, documents = evidence.len(), "Retrieved evidence");
            results.push(ClaimEvidence {
                claim: claim.clone(),
                evidence,
            });
        }
        state.set(&self.output_key, StateValue::Evidence(results))?;
        Ok(Flow::Continue)
    }
}
