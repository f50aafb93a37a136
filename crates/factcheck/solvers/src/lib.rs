//! Solvers and the solver registry.
//!
//! A [`Solver`] is one stage of a fact-checking pipeline. It declares its
//! [`CapabilityKind`](factcheck_types::CapabilityKind) and state contract
//! through a [`SolverDescriptor`](factcheck_types::SolverDescriptor) and is
//! constructed by name from a [`SolverRegistry`].
//!
//! The built-in solvers are local and deterministic:
//!
//! | name | kind |
//! |---|---|
//! | `abstain_detector` | claim processor |
//! | `sentence_claim_extractor` | claim processor |
//! | `corpus_retriever` | retriever |
//! | `evidence_overlap_verifier` | verifier |
//! | `constant_verifier` | verifier |
//! | `concat_response_regenerator` | verifier |

#![deny(unsafe_code)]

pub mod builtin;
pub mod registry;
pub mod solver;
pub mod text;

pub use registry::{SolverFactory, SolverRegistry};
pub use solver::Solver;
