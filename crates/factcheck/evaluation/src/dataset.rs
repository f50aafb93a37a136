//! Benchmark datasets and model responses.

use std::fs;
use std::path::Path;

use factcheck_types::AggregationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One benchmark question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkQuestion {
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
    pub prompt: String,
    /// Snowballing topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Self-awareness gold label.
    #[serde(default)]
    pub label_unanswerable: Option<bool>,
    /// Acceptable answers for judge-rated datasets.
    #[serde(default)]
    pub correct_answers: Vec<String>,
}

impl BenchmarkQuestion {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
            prompt: prompt.into(),
            topic: None,
            label_unanswerable: None,
            correct_answers: Vec::new(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_unanswerable(mut self, unanswerable: bool) -> Self {
        self.label_unanswerable = Some(unanswerable);
        self
    }

    pub fn with_correct_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.correct_answers = answers.into_iter().map(Into::into).collect();
        self
    }
}

/// A model's answer to a benchmark question, joined on `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    pub response: String,
}

/// A question paired with the response being evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSample {
    pub question: BenchmarkQuestion,
    pub response: String,
}

impl LlmSample {
    pub fn new(question: BenchmarkQuestion, response: impl Into<String>) -> Self {
        Self {
            question,
            response: response.into(),
        }
    }
}

/// Read a JSONL file, one record per non-blank line.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AggregationError> {
    let dataset_error = |reason: String| AggregationError::Dataset {
        path: path.display().to_string(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| dataset_error(e.to_string()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).map_err(|e| dataset_error(format!("line {}: {e}", number + 1)))
        })
        .collect()
}
