//! The non-escaping scope pruner.
//!
//! Three phases over one reactive function: collect the identifier/scope
//! dependency graph, solve for the identifiers that must stay memoized, and
//! inline every scope whose outputs are not among them.

use std::collections::BTreeSet;

use crate::analysis::{CollectDependencies, EscapeSolver, State};
use crate::error::Result;
use crate::hir::{
    IdentifierId, ReactiveFunction, ReactiveFunctionTransform, ReactiveFunctionVisitor,
    ReactiveScopeBlock, ScopeIndex, Transformed,
};
use crate::passes::{MemoizationOptions, PruneStats};

/// Phase-three transform: keep a scope iff one of its outputs must stay
/// memoized, otherwise splice its instructions into the parent block.
struct PruneScopes<'a> {
    memoized: &'a BTreeSet<IdentifierId>,
    kept: usize,
    pruned: usize,
}

impl ReactiveFunctionTransform for PruneScopes<'_> {
    fn transform_scope(&mut self, scope_block: &mut ReactiveScopeBlock) -> Transformed {
        let scope = &scope_block.scope;
        let keep = scope
            .declarations
            .iter()
            .chain(scope.reassignments.iter())
            .any(|id| self.memoized.contains(id));
        if keep {
            self.kept += 1;
            Transformed::Keep
        } else {
            log::debug!("pruning scope {}", scope.id);
            self.pruned += 1;
            Transformed::ReplaceMany(std::mem::take(&mut scope_block.instructions))
        }
    }
}

/// Delete reactive scopes whose outputs never escape, inlining their
/// instructions. The function is mutated in place.
pub fn prune_non_escaping_scopes(
    fun: &mut ReactiveFunction,
    options: &MemoizationOptions,
) -> Result<()> {
    let scope_index = ScopeIndex::build(fun);
    let mut state = State::new();
    if let Some(id) = fun.id {
        state.declare(id);
    }
    for param in &fun.params {
        state.declare(param.identifier);
    }

    let mut collector = CollectDependencies::new(&mut state, options, &scope_index);
    collector.visit_function(fun);
    collector.finish()?;
    log::debug!("collected dependency graph:\n{}", state.debug_dump());

    let memoized = EscapeSolver::new(&mut state).solve()?;
    log::debug!(
        "memoized identifiers: [{}]",
        memoized
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut transform = PruneScopes {
        memoized: &memoized,
        kept: 0,
        pruned: 0,
    };
    transform.transform_function(fun);

    let stats = PruneStats {
        identifiers_memoized: memoized.len(),
        scopes_kept: transform.kept,
        scopes_pruned: transform.pruned,
    };
    log::debug!(
        "pruned non-escaping scopes: kept={} pruned={} memoized={}",
        stats.scopes_kept,
        stats.scopes_pruned,
        stats.identifiers_memoized
    );
    Ok(())
}
