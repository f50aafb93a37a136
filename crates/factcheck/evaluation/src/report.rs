use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::checker::CheckerSummary;
use crate::classification::ClassificationSummary;
use crate::figures::figures_for;
use crate::freetext::FreeTextSummary;
use crate::freshqa::RatingSummary;
use crate::snowballing::SnowballingSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    JsonPretty,
}

/// Results for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetSummary {
    Snowballing(SnowballingSummary),
    SelfAware(ClassificationSummary),
    FreshQa(RatingSummary),
    FreeText(FreeTextSummary),
    Checker(CheckerSummary),
}

/// An evaluation run over one or more datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub id: Uuid,
    /// Model or checker under evaluation.
    pub subject: String,
    pub created_at: DateTime<Utc>,
    pub datasets: BTreeMap<String, DatasetSummary>,
    /// Questions per dataset that had no response.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub missing_responses: BTreeMap<String, usize>,
}

impl EvaluationReport {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            created_at: Utc::now(),
            datasets: BTreeMap::new(),
            missing_responses: BTreeMap::new(),
        }
    }

    pub fn with_dataset(mut self, name: impl Into<String>, summary: DatasetSummary) -> Self {
        self.datasets.insert(name.into(), summary);
        self
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, serde_json::Error> {
        render_report(self, format)
    }

    /// Write `report.md`, `report.json` and one JSON figure spec per figure
    /// under `dir/figures`.
    pub fn write_to(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let figures_dir = dir.join("figures");
        fs::create_dir_all(&figures_dir)?;

        let mut written = Vec::new();
        let markdown = dir.join("report.md");
        fs::write(&markdown, render_markdown_report(self))?;
        written.push(markdown);

        let json = dir.join("report.json");
        fs::write(&json, render_report(self, ReportFormat::JsonPretty).map_err(io::Error::other)?)?;
        written.push(json);

        for (name, summary) in &self.datasets {
            for figure in figures_for(name, summary) {
                let path = figures_dir.join(format!("{}.json", figure.name));
                let spec = serde_json::to_string_pretty(&figure.figure).map_err(io::Error::other)?;
                fs::write(&path, spec)?;
                written.push(path);
            }
        }

        info!(dir = %dir.display(), files = written.len(), "Report written");
        Ok(written)
    }
}

#[tracing::instrument(skip_all)]
pub fn render_markdown_report(report: &EvaluationReport) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# Factuality Evaluation Report\n");
    let _ = writeln!(s, "- report_id: `{}`", report.id);
    let _ = writeln!(s, "- subject: `{}`", report.subject);
    let _ = writeln!(s, "- created_at: `{}`", report.created_at.to_rfc3339());

    for (name, summary) in &report.datasets {
        let _ = writeln!(s, "\n## {name}\n");
        match summary {
            DatasetSummary::Snowballing(sb) => {
                s.push_str("| topic | accuracy | scored | abstained | unparsed |\n");
                s.push_str("|-------|----------|--------|-----------|----------|\n");
                let rows = sb
                    .topics
                    .iter()
                    .map(|(t, c)| (t.as_str(), c))
                    .chain(std::iter::once((crate::snowballing::ALL_TOPICS, &sb.overall)));
                for (topic, c) in rows {
                    let _ = writeln!(
                        s,
                        "| {topic} | {:.4} | {} | {} | {} |",
                        c.accuracy, c.scored, c.abstained, c.unparsed_count
                    );
                }
            }
            DatasetSummary::SelfAware(c) => push_classification(&mut s, c),
            DatasetSummary::FreshQa(r) => {
                let _ = writeln!(s, "- accuracy: `{:.4}`", r.accuracy);
                let _ = writeln!(s, "- credited: `{}`", r.credited);
                let _ = writeln!(s, "- not_credited: `{}`", r.not_credited);
                let _ = writeln!(s, "- unparsed: `{}`", r.unparsed_count);
            }
            DatasetSummary::FreeText(f) => {
                let _ = writeln!(s, "- responses: `{}`", f.responses);
                let _ = writeln!(
                    s,
                    "- true_responses: `{}` ({:.2}%)",
                    f.true_responses, f.percentage_true_responses
                );
                let _ = writeln!(
                    s,
                    "- false_responses: `{}` ({:.2}%)",
                    f.false_responses, f.percentage_false_responses
                );
                let _ = writeln!(
                    s,
                    "- claims: `{}` (true {}, false {}, mixed {}, undefined {})",
                    f.claims.total(),
                    f.claims.true_claims,
                    f.claims.false_claims,
                    f.claims.mixed_claims,
                    f.claims.undefined_claims
                );
                let _ = writeln!(s, "- estimated_cost: `${:.4}`", f.estimated_cost);
                let _ = writeln!(s, "- total_time: `{:.2}s`", f.total_time_ms as f64 / 1000.0);
                let _ = writeln!(s, "- unparsed: `{}`", f.unparsed_count);
            }
            DatasetSummary::Checker(c) => {
                let _ = writeln!(s, "- level: `{:?}`", c.level);
                let _ = writeln!(s, "- num_samples: `{}`", c.num_samples);
                let _ = writeln!(s, "- total_time: `{:.2}s`", c.total_time);
                let _ = writeln!(s, "- total_cost: `${:.4}`", c.total_cost);
                s.push('\n');
                push_classification(&mut s, &c.classification);
            }
        }
        if let Some(missing) = report.missing_responses.get(name) {
            let _ = writeln!(s, "\n_{missing} question(s) had no response._");
        }
    }
    s
}

fn push_classification(s: &mut String, c: &ClassificationSummary) {
    let _ = writeln!(s, "- accuracy: `{:.4}`", c.accuracy);
    let _ = writeln!(s, "- scored: `{}`", c.scored);
    let _ = writeln!(s, "- abstained: `{}`", c.abstained);
    let _ = writeln!(s, "- unparsed: `{}`\n", c.unparsed_count);
    s.push_str("| positive class | precision | recall | f1 | support |\n");
    s.push_str("|----------------|-----------|--------|----|---------|\n");
    for (label, m) in &c.per_class {
        let _ = writeln!(
            s,
            "| {label} | {:.4} | {:.4} | {:.4} | {} |",
            m.precision, m.recall, m.f1, m.support
        );
    }

    let _ = write!(s, "\n| gold \\ predicted |");
    for column in &c.confusion.columns {
        let _ = write!(s, " {column} |");
    }
    let _ = write!(s, "\n|---|");
    for _ in &c.confusion.columns {
        s.push_str("---|");
    }
    s.push('\n');
    for (label, row) in c.confusion.labels.iter().zip(&c.confusion.counts) {
        let _ = write!(s, "| {label} |");
        for count in row {
            let _ = write!(s, " {count} |");
        }
        s.push('\n');
    }
}

#[tracing::instrument(skip_all)]
pub fn render_report(report: &EvaluationReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Markdown => Ok(render_markdown_report(report)),
        ReportFormat::JsonPretty => serde_json::to_string_pretty(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{ClassificationEvaluator, Prediction};
    use factcheck_config::AbstainPolicy;

    fn report() -> EvaluationReport {
        let summary = ClassificationEvaluator::binary("unanswerable", "answerable", AbstainPolicy::default())
            .evaluate_pairs(
                &["unanswerable", "answerable"],
                &[Prediction::label("unanswerable"), Prediction::label("unanswerable")],
            )
            .unwrap();
        EvaluationReport::new("model-a").with_dataset("selfaware", DatasetSummary::SelfAware(summary))
    }

    #[test]
    fn markdown_has_metrics_and_matrix() {
        let md = render_markdown_report(&report());
        assert!(md.contains("## selfaware"));
        assert!(md.contains("- accuracy: `0.5000`"));
        assert!(md.contains("| gold \\ predicted | unanswerable | answerable | abstain |"));
        assert!(md.contains("| answerable | 1 | 0 | 0 |"));
    }

    #[test]
    fn json_report_reads_back() {
        let report = report();
        let json = render_report(&report, ReportFormat::JsonPretty).unwrap();
        let back: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, report.id);
        assert_eq!(back.subject, "model-a");
        assert!(matches!(back.datasets["selfaware"], DatasetSummary::SelfAware(ref c) if c.scored == 2));
        assert!(json.contains("\"kind\": \"self_aware\""));
    }

    #[test]
    fn write_to_emits_report_and_figures() {
        let dir = tempfile::tempdir().unwrap();
        let written = report().write_to(dir.path()).unwrap();

        assert!(dir.path().join("report.md").exists());
        assert!(dir.path().join("report.json").exists());
        assert!(dir.path().join("figures/selfaware_metrics.json").exists());
        assert!(dir.path().join("figures/selfaware_confusion.json").exists());
        assert_eq!(written.len(), 4);
    }
}
