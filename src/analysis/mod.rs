//! Escape analysis over reactive functions.
//!
//! This module provides the machinery behind scope pruning:
//! - The memoization lattice values are classified into
//! - The identifier/scope dependency graph and pass state
//! - Dependency collection over instructions
//! - The escape solver rooted at returned identifiers

pub mod collector;
pub mod dependency_graph;
pub mod escape_solver;
pub mod memoization;

pub use collector::{compute_memoization_inputs, CollectDependencies, MemoizationInputs};
pub use dependency_graph::{IdentifierNode, ScopeNode, State};
pub use escape_solver::EscapeSolver;
pub use memoization::MemoizationLevel;
