//! Dependency collection.
//!
//! Walks every instruction of a reactive function, classifies its value into
//! lvalues (with memoization levels) and rvalues, and records the resulting
//! aliasing edges, scope memberships, load-local indirections, and returned
//! identifiers into the pass [`State`].

use smallvec::SmallVec;

use crate::analysis::{MemoizationLevel, State};
use crate::error::{Error, Result};
use crate::hir::{
    ArrayPatternItem, InstructionId, JsxAttribute, JsxTag, ObjectPatternProperty, Pattern, Place,
    ReactiveFunctionVisitor, ReactiveInstruction, ReactiveTerminal, ReactiveTerminalStatement,
    ReactiveValue, ScopeIndex,
};
use crate::passes::MemoizationOptions;

/// A produced lvalue together with the level its classification reports.
#[derive(Debug, Clone, Copy)]
pub struct LeveledPlace {
    pub place: Place,
    pub level: MemoizationLevel,
}

/// Classification of one value: the lvalues it produces and the rvalues
/// whose identity its result may alias.
#[derive(Debug, Default)]
pub struct MemoizationInputs {
    pub lvalues: SmallVec<[LeveledPlace; 2]>,
    pub rvalues: SmallVec<[Place; 4]>,
}

impl MemoizationInputs {
    fn with_lvalue(lvalue: Option<&Place>, level: MemoizationLevel) -> Self {
        let mut inputs = MemoizationInputs::default();
        if let Some(place) = lvalue {
            inputs.lvalues.push(LeveledPlace {
                place: *place,
                level,
            });
        }
        inputs
    }
}

/// Classify `value`, with `lvalue` as the instruction's optional write target.
pub fn compute_memoization_inputs(
    value: &ReactiveValue,
    lvalue: Option<&Place>,
    options: &MemoizationOptions,
) -> Result<MemoizationInputs> {
    match value {
        // The test is evaluated for control only; the result aliases the
        // branch values.
        ReactiveValue::Conditional {
            consequent,
            alternate,
            ..
        } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            inputs
                .rvalues
                .extend(compute_memoization_inputs(consequent.as_ref(), None, options)?.rvalues);
            inputs
                .rvalues
                .extend(compute_memoization_inputs(alternate.as_ref(), None, options)?.rvalues);
            Ok(inputs)
        }
        ReactiveValue::Logical { left, right, .. } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            inputs
                .rvalues
                .extend(compute_memoization_inputs(left.as_ref(), None, options)?.rvalues);
            inputs
                .rvalues
                .extend(compute_memoization_inputs(right.as_ref(), None, options)?.rvalues);
            Ok(inputs)
        }
        // Only the final value flows out of a sequence.
        ReactiveValue::Sequence { value, .. } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            inputs
                .rvalues
                .extend(compute_memoization_inputs(value.as_ref(), None, options)?.rvalues);
            Ok(inputs)
        }

        ReactiveValue::JsxElement {
            tag,
            attributes,
            children,
        } => {
            let mut inputs = MemoizationInputs::with_lvalue(lvalue, jsx_level(options));
            if let JsxTag::Place(place) = tag {
                inputs.rvalues.push(*place);
            }
            for attribute in attributes {
                match attribute {
                    JsxAttribute::Named { value, .. } => inputs.rvalues.push(*value),
                    JsxAttribute::Spread { argument } => inputs.rvalues.push(*argument),
                }
            }
            if let Some(children) = children {
                inputs.rvalues.extend(children.iter().copied());
            }
            Ok(inputs)
        }
        ReactiveValue::JsxFragment { children } => {
            let mut inputs = MemoizationInputs::with_lvalue(lvalue, jsx_level(options));
            inputs.rvalues.extend(children.iter().copied());
            Ok(inputs)
        }

        // Identity-comparable results: nothing to alias.
        ReactiveValue::Primitive { .. }
        | ReactiveValue::TemplateLiteral { .. }
        | ReactiveValue::JsxText { .. }
        | ReactiveValue::Binary { .. }
        | ReactiveValue::Unary { .. }
        | ReactiveValue::LoadGlobal { .. }
        | ReactiveValue::PropertyDelete { .. }
        | ReactiveValue::ComputedDelete { .. } => Ok(MemoizationInputs::with_lvalue(
            lvalue,
            MemoizationLevel::Never,
        )),

        ReactiveValue::TypeCast { value } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            inputs.rvalues.push(*value);
            Ok(inputs)
        }
        ReactiveValue::LoadLocal { place } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            inputs.rvalues.push(*place);
            Ok(inputs)
        }
        ReactiveValue::DeclareLocal { lvalue: declared } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Unmemoized);
            inputs.lvalues.push(LeveledPlace {
                place: declared.place,
                level: MemoizationLevel::Unmemoized,
            });
            Ok(inputs)
        }
        ReactiveValue::StoreLocal {
            lvalue: stored,
            value,
        } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            inputs.lvalues.push(LeveledPlace {
                place: stored.place,
                level: MemoizationLevel::Conditional,
            });
            inputs.rvalues.push(*value);
            Ok(inputs)
        }
        ReactiveValue::Destructure { pattern, value, .. } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            collect_pattern_slots(pattern, &mut inputs);
            inputs.rvalues.push(*value);
            Ok(inputs)
        }
        // The key of a computed load is evaluated, never aliased.
        ReactiveValue::PropertyLoad { object, .. }
        | ReactiveValue::ComputedLoad { object, .. } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            inputs.rvalues.push(*object);
            Ok(inputs)
        }
        ReactiveValue::ComputedStore { object, value, .. } => {
            let mut inputs =
                MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Conditional);
            inputs.lvalues.push(LeveledPlace {
                place: *object,
                level: MemoizationLevel::Conditional,
            });
            inputs.rvalues.push(*value);
            Ok(inputs)
        }

        // Fresh references: the result cannot be compared by identity, and
        // any operand the value may capture or mutate must stay memoized
        // with it.
        ReactiveValue::Array { .. }
        | ReactiveValue::Object { .. }
        | ReactiveValue::New { .. }
        | ReactiveValue::Call { .. }
        | ReactiveValue::MethodCall { .. }
        | ReactiveValue::OptionalCall { .. }
        | ReactiveValue::PropertyStore { .. }
        | ReactiveValue::Function { .. }
        | ReactiveValue::RegExpLiteral { .. }
        | ReactiveValue::TaggedTemplate { .. } => {
            let mut inputs = MemoizationInputs::with_lvalue(lvalue, MemoizationLevel::Memoized);
            value.for_each_operand(|place| {
                if place.effect.is_mutable() {
                    inputs.lvalues.push(LeveledPlace {
                        place: *place,
                        level: MemoizationLevel::Memoized,
                    });
                }
                inputs.rvalues.push(*place);
            });
            Ok(inputs)
        }

        ReactiveValue::Unsupported { loc } => Err(Error::UnsupportedNode { loc: *loc }),
    }
}

fn jsx_level(options: &MemoizationOptions) -> MemoizationLevel {
    if options.memoize_jsx_elements {
        MemoizationLevel::Memoized
    } else {
        MemoizationLevel::Unmemoized
    }
}

fn collect_pattern_slots(pattern: &Pattern, inputs: &mut MemoizationInputs) {
    match pattern {
        Pattern::Array(items) => {
            for item in items {
                match item {
                    ArrayPatternItem::Item(place) => inputs.lvalues.push(LeveledPlace {
                        place: *place,
                        level: MemoizationLevel::Conditional,
                    }),
                    // A rest slot allocates a fresh array.
                    ArrayPatternItem::Spread(place) => inputs.lvalues.push(LeveledPlace {
                        place: *place,
                        level: MemoizationLevel::Memoized,
                    }),
                    ArrayPatternItem::Hole => {}
                }
            }
        }
        Pattern::Object(properties) => {
            for property in properties {
                match property {
                    ObjectPatternProperty::Property { place, .. } => {
                        inputs.lvalues.push(LeveledPlace {
                            place: *place,
                            level: MemoizationLevel::Conditional,
                        })
                    }
                    // A rest slot allocates a fresh object.
                    ObjectPatternProperty::Spread(place) => inputs.lvalues.push(LeveledPlace {
                        place: *place,
                        level: MemoizationLevel::Memoized,
                    }),
                }
            }
        }
    }
}

/// Phase-one visitor that fills the pass state.
pub struct CollectDependencies<'a> {
    state: &'a mut State,
    options: &'a MemoizationOptions,
    scope_index: &'a ScopeIndex,
    error: Option<Error>,
}

impl<'a> CollectDependencies<'a> {
    pub fn new(
        state: &'a mut State,
        options: &'a MemoizationOptions,
        scope_index: &'a ScopeIndex,
    ) -> Self {
        Self {
            state,
            options,
            scope_index,
            error: None,
        }
    }

    /// The first error encountered during the walk, if any.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn collect_instruction(&mut self, instruction: &ReactiveInstruction) -> Result<()> {
        let inputs = compute_memoization_inputs(
            &instruction.value,
            instruction.lvalue.as_ref(),
            self.options,
        )?;

        let rvalue_ids: SmallVec<[_; 4]> = inputs
            .rvalues
            .iter()
            .map(|place| self.state.resolve(place.identifier))
            .collect();

        for lvalue in &inputs.lvalues {
            let lvalue_id = self.state.resolve(lvalue.place.identifier);
            self.state.join_level(lvalue_id, lvalue.level);
            for &rvalue_id in &rvalue_ids {
                self.state.add_dependency(lvalue_id, rvalue_id);
            }
        }

        for place in inputs
            .lvalues
            .iter()
            .map(|lvalue| &lvalue.place)
            .chain(inputs.rvalues.iter())
        {
            self.visit_operand(instruction.id, place);
        }

        if let (ReactiveValue::LoadLocal { place }, Some(lvalue)) =
            (&instruction.value, &instruction.lvalue)
        {
            self.state
                .record_definition(lvalue.identifier, place.identifier);
        }
        Ok(())
    }

    /// Associate the place with the scope active at this instruction,
    /// creating the scope node from its declared dependencies on first
    /// sight.
    fn visit_operand(&mut self, at: InstructionId, place: &Place) {
        let Some((scope_id, info)) = self.scope_index.scope_for_place(at, place) else {
            return;
        };
        let dependencies: SmallVec<[_; 4]> = info
            .dependencies
            .iter()
            .map(|dep| self.state.resolve(dep.identifier))
            .collect();
        self.state.ensure_scope(scope_id, dependencies);
        let id = self.state.resolve(place.identifier);
        self.state.associate_scope(id, scope_id);
    }
}

impl ReactiveFunctionVisitor for CollectDependencies<'_> {
    fn visit_instruction(&mut self, instruction: &ReactiveInstruction) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.collect_instruction(instruction) {
            self.error = Some(error);
            return;
        }
        self.traverse_instruction(instruction);
    }

    fn visit_terminal(&mut self, terminal: &ReactiveTerminalStatement) {
        if self.error.is_some() {
            return;
        }
        if let ReactiveTerminal::Return { value: Some(place) } = &terminal.terminal {
            self.state.record_return(place.identifier);
        }
        self.traverse_terminal(terminal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{Effect, IdentifierId, LValue, ObjectProperty, SourceLocation};

    fn options() -> MemoizationOptions {
        MemoizationOptions::default()
    }

    fn levels_of(inputs: &MemoizationInputs) -> Vec<(IdentifierId, MemoizationLevel)> {
        inputs
            .lvalues
            .iter()
            .map(|lvalue| (lvalue.place.identifier, lvalue.level))
            .collect()
    }

    #[test]
    fn test_primitive_is_never() {
        let inputs = compute_memoization_inputs(
            &ReactiveValue::Primitive {
                value: crate::hir::PrimitiveValue::Boolean(true),
            },
            Some(&Place::read(IdentifierId(1))),
            &options(),
        )
        .unwrap();
        assert_eq!(
            levels_of(&inputs),
            vec![(IdentifierId(1), MemoizationLevel::Never)]
        );
        assert!(inputs.rvalues.is_empty());
    }

    #[test]
    fn test_object_captures_are_promoted() {
        let value = ReactiveValue::Object {
            properties: vec![
                ObjectProperty::Property {
                    key: "a".to_string(),
                    value: Place::new(IdentifierId(2), Effect::Capture),
                },
                ObjectProperty::Property {
                    key: "b".to_string(),
                    value: Place::new(IdentifierId(3), Effect::Read),
                },
            ],
        };
        let inputs =
            compute_memoization_inputs(&value, Some(&Place::read(IdentifierId(4))), &options())
                .unwrap();
        assert_eq!(
            levels_of(&inputs),
            vec![
                (IdentifierId(4), MemoizationLevel::Memoized),
                (IdentifierId(2), MemoizationLevel::Memoized),
            ]
        );
        let rvalues: Vec<_> = inputs.rvalues.iter().map(|p| p.identifier).collect();
        assert_eq!(rvalues, vec![IdentifierId(2), IdentifierId(3)]);
    }

    #[test]
    fn test_conditional_drops_test_operands() {
        let value = ReactiveValue::Conditional {
            test: Box::new(ReactiveValue::LoadLocal {
                place: Place::read(IdentifierId(1)),
            }),
            consequent: Box::new(ReactiveValue::LoadLocal {
                place: Place::read(IdentifierId(2)),
            }),
            alternate: Box::new(ReactiveValue::LoadLocal {
                place: Place::read(IdentifierId(3)),
            }),
        };
        let inputs =
            compute_memoization_inputs(&value, Some(&Place::read(IdentifierId(4))), &options())
                .unwrap();
        assert_eq!(
            levels_of(&inputs),
            vec![(IdentifierId(4), MemoizationLevel::Conditional)]
        );
        let rvalues: Vec<_> = inputs.rvalues.iter().map(|p| p.identifier).collect();
        assert_eq!(rvalues, vec![IdentifierId(2), IdentifierId(3)]);
    }

    #[test]
    fn test_jsx_level_follows_policy() {
        let value = ReactiveValue::JsxFragment { children: vec![] };
        let lvalue = Place::read(IdentifierId(1));

        let inputs = compute_memoization_inputs(&value, Some(&lvalue), &options()).unwrap();
        assert_eq!(
            levels_of(&inputs),
            vec![(IdentifierId(1), MemoizationLevel::Unmemoized)]
        );

        let memoize_jsx = MemoizationOptions {
            memoize_jsx_elements: true,
        };
        let inputs = compute_memoization_inputs(&value, Some(&lvalue), &memoize_jsx).unwrap();
        assert_eq!(
            levels_of(&inputs),
            vec![(IdentifierId(1), MemoizationLevel::Memoized)]
        );
    }

    #[test]
    fn test_destructure_rest_slot_is_memoized() {
        let value = ReactiveValue::Destructure {
            kind: crate::hir::InstructionKind::Const,
            pattern: Pattern::Object(vec![
                ObjectPatternProperty::Property {
                    key: "a".to_string(),
                    place: Place::new(IdentifierId(1), Effect::Store),
                },
                ObjectPatternProperty::Spread(Place::new(IdentifierId(2), Effect::Store)),
            ]),
            value: Place::read(IdentifierId(0)),
        };
        let inputs = compute_memoization_inputs(&value, None, &options()).unwrap();
        assert_eq!(
            levels_of(&inputs),
            vec![
                (IdentifierId(1), MemoizationLevel::Conditional),
                (IdentifierId(2), MemoizationLevel::Memoized),
            ]
        );
        let rvalues: Vec<_> = inputs.rvalues.iter().map(|p| p.identifier).collect();
        assert_eq!(rvalues, vec![IdentifierId(0)]);
    }

    #[test]
    fn test_store_local_adds_both_targets() {
        let value = ReactiveValue::StoreLocal {
            lvalue: LValue::new(
                Place::new(IdentifierId(1), Effect::Store),
                crate::hir::InstructionKind::Reassign,
            ),
            value: Place::read(IdentifierId(2)),
        };
        let inputs =
            compute_memoization_inputs(&value, Some(&Place::read(IdentifierId(3))), &options())
                .unwrap();
        assert_eq!(
            levels_of(&inputs),
            vec![
                (IdentifierId(3), MemoizationLevel::Conditional),
                (IdentifierId(1), MemoizationLevel::Conditional),
            ]
        );
    }

    #[test]
    fn test_unsupported_node_is_fatal() {
        let err = compute_memoization_inputs(
            &ReactiveValue::Unsupported {
                loc: SourceLocation::new(3, 14),
            },
            None,
            &options(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedNode {
                loc: SourceLocation::new(3, 14)
            }
        );
    }
}
