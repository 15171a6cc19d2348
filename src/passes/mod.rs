//! Optimization passes over reactive functions.

use serde::{Deserialize, Serialize};

pub mod prune_scopes;

pub use prune_scopes::prune_non_escaping_scopes;

/// Options controlling memoization decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoizationOptions {
    /// Memoize JSX elements and fragments unconditionally. Off by default:
    /// fresh JSX is cheap to rebuild and only retained when something it
    /// feeds into must stay memoized.
    pub memoize_jsx_elements: bool,
}

/// Summary of one pruning run, logged after the transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneStats {
    pub identifiers_memoized: usize,
    pub scopes_kept: usize,
    pub scopes_pruned: usize,
}
