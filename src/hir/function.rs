//! Reactive functions: the statement tree the pruner consumes and rewrites.

use smallvec::SmallVec;
use std::collections::HashMap;

use crate::hir::{IdentifierId, InstructionId, InstructionRange, Place, ReactiveValue, ScopeId};

/// A function whose body is organized into reactive scopes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactiveFunction {
    pub id: Option<IdentifierId>,
    pub params: Vec<Place>,
    pub body: ReactiveBlock,
}

impl ReactiveFunction {
    pub fn new(id: Option<IdentifierId>, params: Vec<Place>, body: ReactiveBlock) -> Self {
        Self { id, params, body }
    }
}

/// Ordered list of reactive statements.
pub type ReactiveBlock = Vec<ReactiveStatement>;

#[derive(Debug, Clone, PartialEq)]
pub enum ReactiveStatement {
    Instruction(ReactiveInstruction),
    Terminal(ReactiveTerminalStatement),
    Scope(ReactiveScopeBlock),
}

/// One instruction: an optional write target and the value it evaluates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactiveInstruction {
    pub id: InstructionId,
    pub lvalue: Option<Place>,
    pub value: ReactiveValue,
}

impl ReactiveInstruction {
    pub fn new(id: InstructionId, lvalue: Option<Place>, value: ReactiveValue) -> Self {
        Self { id, lvalue, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReactiveTerminalStatement {
    pub terminal: ReactiveTerminal,
}

impl ReactiveTerminalStatement {
    pub fn new(terminal: ReactiveTerminal) -> Self {
        Self { terminal }
    }
}

/// Control flow leaving a block. `If` and `While` carry nested blocks that
/// the walkers descend into.
#[derive(Debug, Clone, PartialEq)]
pub enum ReactiveTerminal {
    Return {
        value: Option<Place>,
    },
    Throw {
        value: Place,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    If {
        test: Place,
        consequent: ReactiveBlock,
        alternate: Option<ReactiveBlock>,
    },
    While {
        test: Box<ReactiveValue>,
        body: ReactiveBlock,
    },
}

/// A region of instructions whose outputs are memoization candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactiveScopeBlock {
    pub scope: ReactiveScope,
    pub instructions: ReactiveBlock,
}

/// Metadata of one reactive scope, precomputed by scope formation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactiveScope {
    pub id: ScopeId,
    pub range: InstructionRange,
    /// External inputs of the scope, in dependency order.
    pub dependencies: SmallVec<[Place; 4]>,
    /// Identifiers the scope declares.
    pub declarations: Vec<IdentifierId>,
    /// Identifiers the scope reassigns.
    pub reassignments: Vec<IdentifierId>,
}

impl ReactiveScope {
    pub fn new(
        id: ScopeId,
        range: InstructionRange,
        dependencies: Vec<Place>,
        declarations: Vec<IdentifierId>,
        reassignments: Vec<IdentifierId>,
    ) -> Self {
        Self {
            id,
            range,
            dependencies: SmallVec::from_vec(dependencies),
            declarations,
            reassignments,
        }
    }
}

/// Per-scope metadata kept by the [`ScopeIndex`].
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub range: InstructionRange,
    pub dependencies: SmallVec<[Place; 4]>,
}

/// Side table mapping identifiers to the scopes that produce them.
///
/// Built by one walk over the function before analysis starts; stands in for
/// the scope back pointers that upstream stages keep on identifiers.
#[derive(Debug, Default)]
pub struct ScopeIndex {
    producers: HashMap<IdentifierId, SmallVec<[ScopeId; 1]>>,
    scopes: HashMap<ScopeId, ScopeInfo>,
}

impl ScopeIndex {
    pub fn build(fun: &ReactiveFunction) -> Self {
        let mut index = ScopeIndex::default();
        index.index_block(&fun.body);
        index
    }

    fn index_block(&mut self, block: &ReactiveBlock) {
        for statement in block {
            match statement {
                ReactiveStatement::Instruction(_) => {}
                ReactiveStatement::Scope(scope_block) => {
                    self.index_scope(&scope_block.scope);
                    self.index_block(&scope_block.instructions);
                }
                ReactiveStatement::Terminal(terminal) => match &terminal.terminal {
                    ReactiveTerminal::If {
                        consequent,
                        alternate,
                        ..
                    } => {
                        self.index_block(consequent);
                        if let Some(alternate) = alternate {
                            self.index_block(alternate);
                        }
                    }
                    ReactiveTerminal::While { body, .. } => self.index_block(body),
                    _ => {}
                },
            }
        }
    }

    fn index_scope(&mut self, scope: &ReactiveScope) {
        self.scopes.insert(
            scope.id,
            ScopeInfo {
                range: scope.range,
                dependencies: scope.dependencies.clone(),
            },
        );
        for id in scope.declarations.iter().chain(scope.reassignments.iter()) {
            let producers = self.producers.entry(*id).or_default();
            if !producers.contains(&scope.id) {
                producers.push(scope.id);
            }
        }
    }

    /// The scope active for `place` at instruction `at`, if any.
    ///
    /// A scope is active when it produces the place's identifier and its
    /// range covers the instruction.
    pub fn scope_for_place(&self, at: InstructionId, place: &Place) -> Option<(ScopeId, &ScopeInfo)> {
        let producers = self.producers.get(&place.identifier)?;
        for scope_id in producers {
            if let Some(info) = self.scopes.get(scope_id) {
                if info.range.contains(at) {
                    return Some((*scope_id, info));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{Effect, PrimitiveValue};

    fn scope_block(scope: ReactiveScope, instructions: ReactiveBlock) -> ReactiveStatement {
        ReactiveStatement::Scope(ReactiveScopeBlock {
            scope,
            instructions,
        })
    }

    #[test]
    fn test_scope_index_range_check() {
        let scope = ReactiveScope::new(
            ScopeId(0),
            InstructionRange::new(InstructionId(1), InstructionId(3)),
            vec![],
            vec![IdentifierId(5)],
            vec![],
        );
        let fun = ReactiveFunction::new(
            None,
            vec![],
            vec![scope_block(
                scope,
                vec![ReactiveStatement::Instruction(ReactiveInstruction::new(
                    InstructionId(1),
                    Some(Place::new(IdentifierId(5), Effect::Store)),
                    ReactiveValue::Primitive {
                        value: PrimitiveValue::Null,
                    },
                ))],
            )],
        );

        let index = ScopeIndex::build(&fun);
        let place = Place::read(IdentifierId(5));
        assert!(index.scope_for_place(InstructionId(1), &place).is_some());
        assert!(index.scope_for_place(InstructionId(3), &place).is_none());
        assert!(index
            .scope_for_place(InstructionId(1), &Place::read(IdentifierId(9)))
            .is_none());
    }

    #[test]
    fn test_scope_index_sees_nested_scopes() {
        let inner = ReactiveScope::new(
            ScopeId(1),
            InstructionRange::new(InstructionId(2), InstructionId(3)),
            vec![],
            vec![IdentifierId(7)],
            vec![],
        );
        let outer = ReactiveScope::new(
            ScopeId(0),
            InstructionRange::new(InstructionId(1), InstructionId(4)),
            vec![],
            vec![IdentifierId(6)],
            vec![],
        );
        let fun = ReactiveFunction::new(
            None,
            vec![],
            vec![scope_block(outer, vec![scope_block(inner, vec![])])],
        );

        let index = ScopeIndex::build(&fun);
        let place = Place::read(IdentifierId(7));
        let (scope_id, info) = index
            .scope_for_place(InstructionId(2), &place)
            .expect("inner scope should be indexed");
        assert_eq!(scope_id, ScopeId(1));
        assert!(info.dependencies.is_empty());
    }
}
