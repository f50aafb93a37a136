//! CLI command implementations

pub mod check;
pub mod evaluate;
pub mod solvers;
pub mod validate;
