//! Pipeline validation

use factcheck_pipeline::Pipeline;
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliResult;
use crate::output::{print_output, print_single, print_success, OutputFormat};
use crate::Context;

#[derive(Debug, Serialize, Tabled)]
struct StageRow {
    #[tabled(rename = "#")]
    index: usize,
    solver: String,
    kind: String,
    reads: String,
    writes: String,
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    shape: String,
    stages: Vec<StageRow>,
}

pub fn execute(ctx: &Context) -> CliResult<()> {
    let pipeline = Pipeline::from_config(&ctx.config, &ctx.registry)?;
    let stages: Vec<StageRow> = pipeline
        .descriptors()
        .enumerate()
        .map(|(index, d)| StageRow {
            index,
            solver: d.name.clone(),
            kind: d.kind.to_string(),
            reads: join(&d.input_keys),
            writes: join(&d.output_keys),
        })
        .collect();

    match ctx.format {
        OutputFormat::Table => {
            print_success(&format!("Pipeline is valid ({} shape)", pipeline.shape()));
            print_output(stages, ctx.format)
        }
        format => print_single(
            &ValidationOutput {
                shape: pipeline.shape().to_string(),
                stages,
            },
            format,
        ),
    }
}

fn join<T: std::fmt::Display>(keys: &[T]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
