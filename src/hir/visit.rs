//! Traversal over reactive functions.
//!
//! Two walkers: a read-only visitor with per-instruction and per-terminal
//! hooks, and a mutating transform whose scope hook may replace a scope
//! statement with a flat statement sequence spliced in place.

use crate::hir::{
    ReactiveBlock, ReactiveFunction, ReactiveInstruction, ReactiveScopeBlock, ReactiveStatement,
    ReactiveTerminal, ReactiveTerminalStatement, ReactiveValue,
};

/// Read-only, in-order traversal of a reactive function.
pub trait ReactiveFunctionVisitor {
    fn visit_function(&mut self, fun: &ReactiveFunction) {
        self.visit_block(&fun.body);
    }

    fn visit_block(&mut self, block: &ReactiveBlock) {
        for statement in block {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, statement: &ReactiveStatement) {
        match statement {
            ReactiveStatement::Instruction(instruction) => self.visit_instruction(instruction),
            ReactiveStatement::Terminal(terminal) => self.visit_terminal(terminal),
            ReactiveStatement::Scope(scope_block) => self.visit_scope(scope_block),
        }
    }

    fn visit_scope(&mut self, scope_block: &ReactiveScopeBlock) {
        self.visit_block(&scope_block.instructions);
    }

    fn visit_instruction(&mut self, instruction: &ReactiveInstruction) {
        self.traverse_instruction(instruction);
    }

    /// Descend into instructions nested inside compound values.
    fn traverse_instruction(&mut self, instruction: &ReactiveInstruction) {
        self.visit_value(&instruction.value);
    }

    fn visit_value(&mut self, value: &ReactiveValue) {
        match value {
            ReactiveValue::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.visit_value(test.as_ref());
                self.visit_value(consequent.as_ref());
                self.visit_value(alternate.as_ref());
            }
            ReactiveValue::Logical { left, right, .. } => {
                self.visit_value(left.as_ref());
                self.visit_value(right.as_ref());
            }
            ReactiveValue::Sequence {
                instructions,
                value,
            } => {
                for instruction in instructions {
                    self.visit_instruction(instruction);
                }
                self.visit_value(value.as_ref());
            }
            _ => {}
        }
    }

    fn visit_terminal(&mut self, terminal: &ReactiveTerminalStatement) {
        self.traverse_terminal(terminal);
    }

    /// Descend into blocks nested inside a terminal.
    fn traverse_terminal(&mut self, terminal: &ReactiveTerminalStatement) {
        match &terminal.terminal {
            ReactiveTerminal::If {
                consequent,
                alternate,
                ..
            } => {
                self.visit_block(consequent);
                if let Some(alternate) = alternate {
                    self.visit_block(alternate);
                }
            }
            ReactiveTerminal::While { body, .. } => self.visit_block(body),
            _ => {}
        }
    }
}

/// Outcome of transforming one scope statement.
#[derive(Debug)]
pub enum Transformed {
    /// Leave the scope statement unchanged.
    Keep,
    /// Splice these statements in place of the scope statement.
    ReplaceMany(Vec<ReactiveStatement>),
}

/// Mutating top-down walker. Nested scopes are transformed before their
/// parent scope is decided, so inner rewrites happen regardless of the
/// outer outcome.
pub trait ReactiveFunctionTransform {
    fn transform_function(&mut self, fun: &mut ReactiveFunction) {
        self.transform_block(&mut fun.body);
    }

    fn transform_block(&mut self, block: &mut ReactiveBlock) {
        let mut i = 0;
        while i < block.len() {
            let replacement = match &mut block[i] {
                ReactiveStatement::Instruction(_) => None,
                ReactiveStatement::Terminal(terminal) => {
                    self.transform_terminal(terminal);
                    None
                }
                ReactiveStatement::Scope(scope_block) => {
                    self.transform_block(&mut scope_block.instructions);
                    match self.transform_scope(scope_block) {
                        Transformed::Keep => None,
                        Transformed::ReplaceMany(statements) => Some(statements),
                    }
                }
            };
            match replacement {
                Some(statements) => {
                    let advance = statements.len();
                    block.splice(i..=i, statements);
                    i += advance;
                }
                None => i += 1,
            }
        }
    }

    fn transform_terminal(&mut self, terminal: &mut ReactiveTerminalStatement) {
        match &mut terminal.terminal {
            ReactiveTerminal::If {
                consequent,
                alternate,
                ..
            } => {
                self.transform_block(consequent);
                if let Some(alternate) = alternate {
                    self.transform_block(alternate);
                }
            }
            ReactiveTerminal::While { body, .. } => self.transform_block(body),
            _ => {}
        }
    }

    fn transform_scope(&mut self, _scope_block: &mut ReactiveScopeBlock) -> Transformed {
        Transformed::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{
        IdentifierId, InstructionId, InstructionRange, Place, PrimitiveValue, ReactiveScope,
        ScopeId,
    };

    fn primitive_instruction(id: u32) -> ReactiveStatement {
        ReactiveStatement::Instruction(ReactiveInstruction::new(
            InstructionId(id),
            None,
            ReactiveValue::Primitive {
                value: PrimitiveValue::Number(id as f64),
            },
        ))
    }

    fn scope_statement(scope_id: u32, instructions: ReactiveBlock) -> ReactiveStatement {
        ReactiveStatement::Scope(ReactiveScopeBlock {
            scope: ReactiveScope::new(
                ScopeId(scope_id),
                InstructionRange::new(InstructionId(0), InstructionId(100)),
                vec![],
                vec![],
                vec![],
            ),
            instructions,
        })
    }

    /// Inlines every scope it sees and records the order of decisions.
    struct InlineAll {
        decided: Vec<ScopeId>,
    }

    impl ReactiveFunctionTransform for InlineAll {
        fn transform_scope(&mut self, scope_block: &mut ReactiveScopeBlock) -> Transformed {
            self.decided.push(scope_block.scope.id);
            Transformed::ReplaceMany(std::mem::take(&mut scope_block.instructions))
        }
    }

    #[test]
    fn test_replace_many_splices_in_order() {
        let mut block = vec![
            primitive_instruction(0),
            scope_statement(0, vec![primitive_instruction(1), primitive_instruction(2)]),
            primitive_instruction(3),
        ];
        let mut transform = InlineAll { decided: vec![] };
        transform.transform_block(&mut block);

        assert_eq!(
            block,
            vec![
                primitive_instruction(0),
                primitive_instruction(1),
                primitive_instruction(2),
                primitive_instruction(3),
            ]
        );
    }

    #[test]
    fn test_nested_scope_decided_before_parent() {
        let mut block = vec![scope_statement(
            0,
            vec![scope_statement(1, vec![primitive_instruction(1)])],
        )];
        let mut transform = InlineAll { decided: vec![] };
        transform.transform_block(&mut block);

        assert_eq!(transform.decided, vec![ScopeId(1), ScopeId(0)]);
        assert_eq!(block, vec![primitive_instruction(1)]);
    }

    #[test]
    fn test_transform_descends_into_terminal_blocks() {
        let mut block = vec![ReactiveStatement::Terminal(ReactiveTerminalStatement::new(
            ReactiveTerminal::If {
                test: Place::read(IdentifierId(0)),
                consequent: vec![scope_statement(2, vec![primitive_instruction(4)])],
                alternate: None,
            },
        ))];
        let mut transform = InlineAll { decided: vec![] };
        transform.transform_block(&mut block);

        assert_eq!(transform.decided, vec![ScopeId(2)]);
        match &block[0] {
            ReactiveStatement::Terminal(terminal) => match &terminal.terminal {
                ReactiveTerminal::If { consequent, .. } => {
                    assert_eq!(consequent, &vec![primitive_instruction(4)]);
                }
                other => panic!("unexpected terminal: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }
}
