//! Core types shared by the factcheck crates.
//!
//! A fact-checking run threads a single [`State`] through an ordered chain of
//! solvers. Each solver is described by a [`SolverDescriptor`] naming its
//! [`CapabilityKind`], the state keys it reads and the keys it writes. During a
//! run a solver only ever sees a [`StageState`], which rejects access to keys
//! outside its declaration.
//!
//! Errors fall into four families, kept as separate enums so callers can tell
//! them apart:
//!
//! - [`ConfigError`]: malformed or unresolvable configuration
//! - [`ConfigValidationError`]: a pipeline that is structurally invalid
//! - [`ExecutionError`]: a failure while a run is in progress
//! - [`AggregationError`]: a failure while computing benchmark metrics

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod cancel;
pub mod claim;
pub mod descriptor;
pub mod error;
pub mod parameters;
pub mod run;
pub mod state;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use claim::{ClaimEvidence, ClaimVerdict, Evidence, Verdict};
pub use descriptor::{CapabilityKind, SolverDescriptor};
pub use error::{
    AggregationError, ConfigError, ConfigValidationError, ExecutionError, FactCheckError,
    FactCheckResult,
};
pub use parameters::{ParamValue, Parameters};
pub use run::{Flow, RunContext};
pub use state::{StageState, State, StateKey, StateRead, StateValue};
