//! Dataset-level evaluation through the public API.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use factcheck_config::{DatasetSource, EvaluationConfig, EvaluatorKind};
use factcheck_evaluation::{
    DatasetSummary, FreeTextEvaluator, LlmEvaluator, LlmSample, ModelResponse, BenchmarkQuestion,
};
use factcheck_pipeline::Pipeline;
use factcheck_solvers::{Solver, SolverRegistry};
use factcheck_types::{
    cancel_pair, CapabilityKind, ClaimVerdict, ExecutionError, FactCheckError, Flow, Parameters,
    RunContext, SolverDescriptor, StageState, StateKey, StateRead, StateValue, Verdict,
};

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

/// Marks claims about the moon false and hedged claims undefined.
struct KeywordVerifier {
    descriptor: SolverDescriptor,
}

impl KeywordVerifier {
    fn new() -> Arc<dyn Solver> {
        Arc::new(Self {
            descriptor: SolverDescriptor::new("keyword_verifier", CapabilityKind::Verifier)
                .with_inputs(["claims"])
                .with_outputs(["claim_verdicts"]),
        })
    }
}

#[async_trait]
impl Solver for KeywordVerifier {
    fn descriptor(&self) -> &SolverDescriptor {
        &self.descriptor
    }

    async fn execute(&self, state: &mut StageState<'_>, _ctx: &RunContext) -> Result<Flow, ExecutionError> {
        let verdicts: Vec<ClaimVerdict> = state
            .claims("claims")?
            .iter()
            .map(|claim| {
                let lower = claim.to_lowercase();
                let verdict = if lower.contains("moon") {
                    Verdict::False
                } else if lower.contains("maybe") {
                    Verdict::Abstain
                } else {
                    Verdict::True
                };
                ClaimVerdict {
                    claim: claim.clone(),
                    verdict,
                    rationale: None,
                    correction: None,
                }
            })
            .collect();
        state.set("claim_verdicts", StateValue::ClaimVerdicts(verdicts))?;
        Ok(Flow::Continue)
    }
}

fn pipeline() -> Arc<Pipeline> {
    let extractor = SolverRegistry::with_builtins()
        .instantiate("sentence_claim_extractor", &Parameters::new())
        .unwrap();
    Arc::new(
        Pipeline::build(
            vec![extractor, KeywordVerifier::new()],
            vec![StateKey::from("question"), StateKey::from("response")],
        )
        .unwrap(),
    )
}

fn sample(id: &str, prompt: &str, response: &str) -> LlmSample {
    LlmSample::new(BenchmarkQuestion::new(id, prompt), response)
}

fn write_jsonl(path: &Path, lines: &[serde_json::Value]) {
    let body: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    std::fs::write(path, body.join("\n")).unwrap();
}

// ----------------------------------------------------------------------------
// Free text
// ----------------------------------------------------------------------------

#[tokio::test]
async fn free_text_tallies_claims_and_responses() {
    let samples = vec![
        sample("1", "Tell me about Paris.", "Paris is the capital of France. It lies on the Seine."),
        sample("2", "Tell me about the moon.", "The moon is made of cheese. It orbits the Earth."),
        sample("3", "Say nothing.", "Ok."),
    ];

    let summary = FreeTextEvaluator::new(pipeline())
        .with_concurrency(2)
        .evaluate(&samples)
        .await
        .unwrap();

    assert_eq!(summary.responses, 2);
    assert_eq!(summary.true_responses, 1);
    assert_eq!(summary.false_responses, 1);
    assert_eq!(summary.claims.total(), 4);
    assert_eq!(summary.claims.false_claims, 1);
    assert_eq!(summary.unparsed_count, 1);
    assert!((summary.percentage_true_responses - 50.0).abs() < 1e-9);
    assert!((summary.estimated_cost - 4.0 * 2.0 * 0.016).abs() < 1e-9);
}

#[tokio::test]
async fn free_text_reuses_cached_assessments() {
    let dir = tempfile::tempdir().unwrap();
    let samples = vec![sample("1", "Paris?", "Paris is the capital of France.")];
    let evaluator = FreeTextEvaluator::new(pipeline()).with_cache_dir(dir.path());

    let first = evaluator.evaluate(&samples).await.unwrap();
    assert_eq!(first.cached, 0);
    let cache_file = evaluator.cache_path(0, "Paris?").unwrap();
    assert!(cache_file.exists());
    assert!(cache_file
        .parent()
        .unwrap()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("0_"));

    let second = evaluator.evaluate(&samples).await.unwrap();
    assert_eq!(second.cached, 1);
    assert_eq!(second.claims, first.claims);
}

#[tokio::test]
async fn free_text_cache_misses_on_changed_response() {
    let dir = tempfile::tempdir().unwrap();
    let evaluator = FreeTextEvaluator::new(pipeline()).with_cache_dir(dir.path());

    let before = evaluator
        .evaluate(&[sample("1", "Paris?", "Paris is the capital of France.")])
        .await
        .unwrap();
    assert_eq!(before.false_responses, 0);

    let after = evaluator
        .evaluate(&[sample("1", "Paris?", "The moon is the capital of France.")])
        .await
        .unwrap();
    assert_eq!(after.cached, 0);
    assert_eq!(after.false_responses, 1);

    let again = evaluator
        .evaluate(&[sample("1", "Paris?", "The moon is the capital of France.")])
        .await
        .unwrap();
    assert_eq!(again.cached, 1);
    assert_eq!(again.false_responses, 1);
}

#[tokio::test]
async fn free_text_cancellation_aborts() {
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let err = FreeTextEvaluator::new(pipeline())
        .with_cancel(signal)
        .evaluate(&[sample("1", "q", "Paris is the capital of France.")])
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Cancelled { .. }));
}

// ----------------------------------------------------------------------------
// Whole evaluation
// ----------------------------------------------------------------------------

#[tokio::test]
async fn llm_evaluator_scores_every_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let snowballing = dir.path().join("snowballing.jsonl");
    let selfaware = dir.path().join("selfaware.jsonl");
    let freshqa = dir.path().join("freshqa.jsonl");
    let factool = dir.path().join("factool.jsonl");

    write_jsonl(
        &snowballing,
        &[
            serde_json::json!({"id": "s1", "prompt": "Is 7 prime?", "topic": "Primality Testing"}),
            serde_json::json!({"id": "s2", "prompt": "Is there a flight?", "topic": "Graph Connectivity-Flight Search"}),
        ],
    );
    write_jsonl(
        &selfaware,
        &[serde_json::json!({"id": "a1", "prompt": "What happens after death?", "label_unanswerable": true})],
    );
    write_jsonl(
        &freshqa,
        &[serde_json::json!({"id": "f1", "prompt": "Who wrote Hamlet?", "correct_answers": ["Shakespeare"]})],
    );
    write_jsonl(
        &factool,
        &[serde_json::json!({"id": "t1", "prompt": "Describe the moon."})],
    );

    let mut config = EvaluationConfig::default();
    config.datasets = vec![
        DatasetSource::new("snowballing", snowballing, EvaluatorKind::Snowballing),
        DatasetSource::new("selfaware", selfaware, EvaluatorKind::SelfAware),
        DatasetSource::new("FreshQA", freshqa, EvaluatorKind::FreshQa),
        DatasetSource::new("factool", factool, EvaluatorKind::FreeText),
    ];

    let responses = vec![
        ModelResponse { id: "s1".into(), response: "Yes, it is.".into() },
        ModelResponse { id: "a1".into(), response: "It is impossible to know.".into() },
        ModelResponse { id: "f1".into(), response: "Shakespeare wrote it.".into() },
        ModelResponse { id: "t1".into(), response: "The moon orbits the Earth.".into() },
    ];

    let report = LlmEvaluator::new(config)
        .with_pipeline(pipeline())
        .with_cache_root(dir.path().join("cache"))
        .evaluate("model-a", responses)
        .await
        .unwrap();

    assert_eq!(report.datasets.len(), 4);
    assert_eq!(report.missing_responses.get("snowballing"), Some(&1));

    match &report.datasets["snowballing"] {
        DatasetSummary::Snowballing(s) => {
            assert_eq!(s.overall.scored, 1);
            assert!((s.overall.accuracy - 1.0).abs() < 1e-9);
        }
        other => panic!("unexpected summary: {other:?}"),
    }
    match &report.datasets["selfaware"] {
        DatasetSummary::SelfAware(c) => assert!((c.accuracy - 1.0).abs() < 1e-9),
        other => panic!("unexpected summary: {other:?}"),
    }
    match &report.datasets["FreshQA"] {
        DatasetSummary::FreshQa(r) => assert_eq!(r.credited, 1),
        other => panic!("unexpected summary: {other:?}"),
    }
    match &report.datasets["factool"] {
        DatasetSummary::FreeText(f) => assert_eq!(f.false_responses, 1),
        other => panic!("unexpected summary: {other:?}"),
    }
    assert!(dir.path().join("cache/model-a/factool").exists());
}

#[tokio::test]
async fn free_text_dataset_without_pipeline_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("factool.jsonl");
    write_jsonl(&path, &[serde_json::json!({"id": "t1", "prompt": "Describe the moon."})]);

    let mut config = EvaluationConfig::default();
    config
        .datasets
        .push(DatasetSource::new("factool", path, EvaluatorKind::FreeText));

    let err = LlmEvaluator::new(config)
        .evaluate("model-a", vec![ModelResponse { id: "t1".into(), response: "Hi.".into() }])
        .await
        .unwrap_err();
    assert!(matches!(err, FactCheckError::Config(_)));
}

#[tokio::test]
async fn missing_dataset_file_is_an_aggregation_error() {
    let mut config = EvaluationConfig::default();
    config.datasets.push(DatasetSource::new(
        "gone",
        "/nonexistent/gone.jsonl",
        EvaluatorKind::SelfAware,
    ));

    let err = LlmEvaluator::new(config).evaluate("m", Vec::new()).await.unwrap_err();
    assert!(matches!(err, FactCheckError::Aggregation(_)));
}
