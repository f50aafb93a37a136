//! Pipeline assembly and execution.
//!
//! A [`Pipeline`] is an ordered, validated chain of solvers. Validation checks
//! that every input key a stage reads is produced by the initial state or an
//! earlier stage, that capability kinds never go backwards, and classifies the
//! chain into a [`PipelineShape`].
//!
//! Runs are strictly sequential: a stage starts only after the previous one
//! has finished and its writes are visible. A run ends when every stage has
//! run, when a stage halts, on the first execution error, or on cancellation.

#![deny(unsafe_code)]

pub mod batch;
pub mod observer;
pub mod pipeline;
pub mod recorder;
pub mod shape;

pub use batch::{BatchInput, BatchRunner};
pub use observer::{FnObserver, NoopObserver, ObserverSet, StageEvent, StageObserver};
pub use pipeline::{Halted, Pipeline, RunReport};
pub use recorder::{JsonlRecorder, RunRecord};
pub use shape::{validate, PipelineShape};
