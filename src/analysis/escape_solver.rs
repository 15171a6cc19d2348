//! Escape solving.
//!
//! Starting from the returned identifiers, walk the dependency graph and
//! decide which identifiers must stay memoized. Memoized identifiers force
//! the declared dependencies of every scope they belong to, which preserves
//! memoization of values that were merged into a shared scope.

use std::collections::BTreeSet;

use crate::analysis::{MemoizationLevel, State};
use crate::error::{Error, Result};
use crate::hir::{IdentifierId, ScopeId};

/// Phase-two traversal over the collected graph.
pub struct EscapeSolver<'a> {
    state: &'a mut State,
    memoized: BTreeSet<IdentifierId>,
}

impl<'a> EscapeSolver<'a> {
    pub fn new(state: &'a mut State) -> Self {
        Self {
            state,
            memoized: BTreeSet::new(),
        }
    }

    /// Compute the set of identifiers whose values must stay memoized.
    pub fn solve(mut self) -> Result<BTreeSet<IdentifierId>> {
        let returned: Vec<_> = self.state.returned().to_vec();
        for id in returned {
            self.visit(id, false)?;
        }
        Ok(self.memoized)
    }

    fn visit(&mut self, id: IdentifierId, force_memoize: bool) -> Result<bool> {
        let node = self
            .state
            .identifier_mut(id)
            .ok_or(Error::MissingIdentifierNode { id })?;

        // A revisit observes whatever has been decided so far; the tentative
        // `false` below keeps cycles from recursing forever.
        if node.seen {
            return Ok(node.memoized);
        }
        node.seen = true;
        node.memoized = false;

        let level = node.level;
        let dependencies: Vec<_> = node.dependencies.iter().copied().collect();
        let scopes: Vec<_> = node.scopes.iter().copied().collect();

        let mut has_memoized_dependency = false;
        for dependency in dependencies {
            if self.visit(dependency, false)? {
                has_memoized_dependency = true;
            }
        }

        let memoized = match level {
            MemoizationLevel::Memoized => true,
            MemoizationLevel::Conditional => has_memoized_dependency || force_memoize,
            MemoizationLevel::Unmemoized => force_memoize,
            MemoizationLevel::Never => false,
        };

        if memoized {
            log::debug!("{id} must stay memoized (level={level})");
            if let Some(node) = self.state.identifier_mut(id) {
                node.memoized = true;
            }
            self.memoized.insert(id);
            for scope in scopes {
                self.force_memoize_scope_dependencies(scope)?;
            }
        }
        Ok(memoized)
    }

    /// An escaping value inside the scope means every declared dependency of
    /// the scope must stay memoized to keep the scope's cache key stable.
    fn force_memoize_scope_dependencies(&mut self, id: ScopeId) -> Result<()> {
        let node = self
            .state
            .scope_mut(id)
            .ok_or(Error::MissingScopeNode { id })?;
        if node.seen {
            return Ok(());
        }
        node.seen = true;

        let dependencies: Vec<_> = node.dependencies.to_vec();
        for dependency in dependencies {
            self.visit(dependency, true)?;
        }
        Ok(())
    }
}
