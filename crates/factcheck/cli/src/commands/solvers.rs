//! Solver listing

use factcheck_types::CapabilityKind;
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliResult;
use crate::output::print_output;
use crate::Context;

#[derive(Debug, Serialize, Tabled)]
struct SolverRow {
    name: String,
    kind: String,
}

pub fn execute(kind: Option<&str>, ctx: &Context) -> CliResult<()> {
    let rows: Vec<SolverRow> = match kind {
        Some(kind) => {
            let kind: CapabilityKind = kind.parse()?;
            ctx.registry
                .list(kind)
                .into_iter()
                .map(|name| SolverRow {
                    name: name.to_string(),
                    kind: kind.to_string(),
                })
                .collect()
        }
        None => ctx
            .registry
            .list_all()
            .into_iter()
            .map(|(name, kind)| SolverRow {
                name: name.to_string(),
                kind: kind.to_string(),
            })
            .collect(),
    };
    print_output(rows, ctx.format)
}
