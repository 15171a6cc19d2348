//! Pass-scoped dependency graph over identifiers and scopes.
//!
//! Identifier nodes record the joined memoization level, the identifiers a
//! value aliases, and the scopes the identifier belongs to. Scope nodes
//! record the scope's declared dependencies. Both carry the traversal marks
//! the escape solver flips. All of it is built during collection, read
//! during solving, and discarded after the transform.

use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

use crate::analysis::MemoizationLevel;
use crate::hir::{IdentifierId, ScopeId};

/// Graph vertex for one identifier.
#[derive(Debug)]
pub struct IdentifierNode {
    /// Joined level across every assignment of this identifier.
    pub level: MemoizationLevel,
    /// Identifiers this value aliases, sorted for deterministic traversal.
    pub dependencies: BTreeSet<IdentifierId>,
    /// Scopes this identifier belongs to.
    pub scopes: BTreeSet<ScopeId>,
    /// Solver output.
    pub memoized: bool,
    /// Traversal mark.
    pub seen: bool,
}

impl IdentifierNode {
    fn new() -> Self {
        Self {
            level: MemoizationLevel::Never,
            dependencies: BTreeSet::new(),
            scopes: BTreeSet::new(),
            memoized: false,
            seen: false,
        }
    }
}

/// Graph vertex for one scope.
#[derive(Debug)]
pub struct ScopeNode {
    /// The scope's declared dependencies, fixed at node creation.
    pub dependencies: SmallVec<[IdentifierId; 4]>,
    /// Traversal mark.
    pub seen: bool,
}

/// All state of one pruning run.
#[derive(Debug, Default)]
pub struct State {
    /// Collapses load-local indirections: `lvalue -> source`.
    definitions: HashMap<IdentifierId, IdentifierId>,
    identifiers: HashMap<IdentifierId, IdentifierNode>,
    scopes: HashMap<ScopeId, ScopeNode>,
    /// Identifiers reached by a `return`, in insertion order.
    returned: Vec<IdentifierId>,
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    /// Pre-declare an identifier (the function id, a parameter) that is
    /// never memoized on its own.
    pub fn declare(&mut self, id: IdentifierId) {
        self.node_mut(id);
    }

    /// Collapse a load-local indirection. Lookups that miss return the
    /// input unchanged.
    pub fn resolve(&self, id: IdentifierId) -> IdentifierId {
        self.definitions.get(&id).copied().unwrap_or(id)
    }

    /// Record `lvalue -> source`. The source is resolved first, so chains
    /// collapse to their root instead of under-resolving.
    pub fn record_definition(&mut self, lvalue: IdentifierId, source: IdentifierId) {
        let root = self.resolve(source);
        self.definitions.insert(lvalue, root);
    }

    /// Record an identifier reached by a `return`.
    pub fn record_return(&mut self, id: IdentifierId) {
        let id = self.resolve(id);
        if !self.returned.contains(&id) {
            self.returned.push(id);
        }
    }

    pub fn returned(&self) -> &[IdentifierId] {
        &self.returned
    }

    /// Join `level` into the identifier's node, creating it on first mention.
    pub fn join_level(&mut self, id: IdentifierId, level: MemoizationLevel) {
        let node = self.node_mut(id);
        node.level = node.level.join(level);
    }

    /// Record that `lvalue` aliases `rvalue`. Self-loops are dropped; both
    /// nodes exist afterwards.
    pub fn add_dependency(&mut self, lvalue: IdentifierId, rvalue: IdentifierId) {
        if lvalue == rvalue {
            return;
        }
        self.node_mut(rvalue);
        self.node_mut(lvalue).dependencies.insert(rvalue);
    }

    /// Add the scope to the identifier's membership set.
    pub fn associate_scope(&mut self, id: IdentifierId, scope: ScopeId) {
        self.node_mut(id).scopes.insert(scope);
    }

    /// Create the scope node with its declared dependencies. Re-adding an
    /// existing scope is a no-op: the first registration's dependencies stick.
    pub fn ensure_scope(&mut self, id: ScopeId, dependencies: SmallVec<[IdentifierId; 4]>) {
        self.scopes.entry(id).or_insert(ScopeNode {
            dependencies,
            seen: false,
        });
    }

    pub fn identifier(&self, id: IdentifierId) -> Option<&IdentifierNode> {
        self.identifiers.get(&id)
    }

    pub fn identifier_mut(&mut self, id: IdentifierId) -> Option<&mut IdentifierNode> {
        self.identifiers.get_mut(&id)
    }

    pub fn scope(&self, id: ScopeId) -> Option<&ScopeNode> {
        self.scopes.get(&id)
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut ScopeNode> {
        self.scopes.get_mut(&id)
    }

    fn node_mut(&mut self, id: IdentifierId) -> &mut IdentifierNode {
        self.identifiers.entry(id).or_insert_with(IdentifierNode::new)
    }

    /// Render the collected graph in sorted id order.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let mut identifier_ids: Vec<_> = self.identifiers.keys().copied().collect();
        identifier_ids.sort();
        for id in identifier_ids {
            let node = &self.identifiers[&id];
            let _ = writeln!(
                out,
                "{id} level={} deps=[{}] scopes=[{}]",
                node.level,
                join_ids(node.dependencies.iter()),
                join_ids(node.scopes.iter()),
            );
        }
        let mut scope_ids: Vec<_> = self.scopes.keys().copied().collect();
        scope_ids.sort();
        for id in scope_ids {
            let node = &self.scopes[&id];
            let _ = writeln!(out, "{id} deps=[{}]", join_ids(node.dependencies.iter()));
        }
        let _ = writeln!(out, "returned: [{}]", join_ids(self.returned.iter()));
        out
    }
}

fn join_ids<T: std::fmt::Display>(ids: impl Iterator<Item = T>) -> String {
    let mut out = String::new();
    for (i, id) in ids.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{id}");
    }
    out
}
