//! Plot-ready figure data.
//!
//! Figures are emitted as JSON specs; rendering them to images is left to
//! whatever plotting tool consumes the report.

use serde::{Deserialize, Serialize};

use crate::classification::ConfusionMatrix;
use crate::report::DatasetSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FigureSpec {
    Bar {
        title: String,
        categories: Vec<String>,
        series: Vec<Series>,
    },
    Heatmap {
        title: String,
        rows: Vec<String>,
        columns: Vec<String>,
        values: Vec<Vec<u64>>,
    },
    Pie {
        title: String,
        slices: Vec<Slice>,
    },
}

impl FigureSpec {
    pub fn confusion(title: impl Into<String>, matrix: &ConfusionMatrix) -> Self {
        FigureSpec::Heatmap {
            title: title.into(),
            rows: matrix.labels.clone(),
            columns: matrix.columns.clone(),
            values: matrix.counts.clone(),
        }
    }
}

/// A figure and the file stem it is written under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFigure {
    pub name: String,
    pub figure: FigureSpec,
}

/// Figures for one dataset's results.
pub fn figures_for(dataset: &str, summary: &DatasetSummary) -> Vec<NamedFigure> {
    let named = |suffix: &str, figure: FigureSpec| NamedFigure {
        name: format!("{dataset}_{suffix}"),
        figure,
    };

    match summary {
        DatasetSummary::Snowballing(s) => {
            let mut categories: Vec<String> = s.topics.keys().cloned().collect();
            let mut accuracy: Vec<f64> = s.topics.values().map(|t| t.accuracy).collect();
            categories.push(crate::snowballing::ALL_TOPICS.to_string());
            accuracy.push(s.overall.accuracy);
            vec![
                named(
                    "accuracy",
                    FigureSpec::Bar {
                        title: format!("{dataset}: accuracy by topic"),
                        categories,
                        series: vec![Series {
                            name: "accuracy".into(),
                            values: accuracy,
                        }],
                    },
                ),
                named(
                    "confusion",
                    FigureSpec::confusion(format!("{dataset}: confusion matrix"), &s.overall.confusion),
                ),
            ]
        }
        DatasetSummary::SelfAware(s) => {
            let categories: Vec<String> = s.per_class.keys().cloned().collect();
            let metric = |name: &str, f: fn(&crate::classification::ClassMetrics) -> f64| Series {
                name: name.to_string(),
                values: s.per_class.values().map(f).collect(),
            };
            vec![
                named(
                    "metrics",
                    FigureSpec::Bar {
                        title: format!("{dataset}: metrics by positive class"),
                        categories,
                        series: vec![
                            metric("precision", |m| m.precision),
                            metric("recall", |m| m.recall),
                            metric("f1", |m| m.f1),
                        ],
                    },
                ),
                named(
                    "confusion",
                    FigureSpec::confusion(format!("{dataset}: confusion matrix"), &s.confusion),
                ),
            ]
        }
        DatasetSummary::FreshQa(s) => vec![named(
            "accuracy",
            FigureSpec::Pie {
                title: format!("{dataset}: judged accuracy"),
                slices: vec![
                    Slice {
                        label: "credited".into(),
                        value: s.credited as f64,
                    },
                    Slice {
                        label: "not credited".into(),
                        value: s.not_credited as f64,
                    },
                ],
            },
        )],
        DatasetSummary::FreeText(s) => vec![named(
            "claims",
            FigureSpec::Bar {
                title: format!("{dataset}: claim verdicts"),
                categories: vec![
                    "true".into(),
                    "false".into(),
                    "mixed".into(),
                    "undefined".into(),
                ],
                series: vec![Series {
                    name: "claims".into(),
                    values: vec![
                        s.claims.true_claims as f64,
                        s.claims.false_claims as f64,
                        s.claims.mixed_claims as f64,
                        s.claims.undefined_claims as f64,
                    ],
                }],
            },
        )],
        DatasetSummary::Checker(s) => vec![named(
            "confusion",
            FigureSpec::confusion(format!("{dataset}: confusion matrix"), &s.classification.confusion),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshqa::RatingSummary;

    #[test]
    fn freshqa_gets_a_pie() {
        let summary = DatasetSummary::FreshQa(RatingSummary {
            accuracy: 0.75,
            credited: 3,
            not_credited: 1,
            unparsed_count: 0,
            unparsed: Vec::new(),
        });
        let figures = figures_for("freshqa", &summary);
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].name, "freshqa_accuracy");

        let json = serde_json::to_value(&figures[0].figure).unwrap();
        assert_eq!(json["type"], "pie");
        assert_eq!(json["slices"][0]["value"], 3.0);
    }
}
