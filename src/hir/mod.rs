//! High-level intermediate representation of reactive functions.
//!
//! The types here are the contract with earlier compilation stages: opaque
//! ids, places with effects, the reactive value taxonomy, and the statement
//! tree organized into reactive scopes. The pruner consumes this
//! representation and rewrites it in place.

pub mod function;
pub mod ids;
pub mod place;
pub mod value;
pub mod visit;

pub use function::{
    ReactiveBlock, ReactiveFunction, ReactiveInstruction, ReactiveScope, ReactiveScopeBlock,
    ReactiveStatement, ReactiveTerminal, ReactiveTerminalStatement, ScopeIndex, ScopeInfo,
};
pub use ids::{IdentifierId, InstructionId, InstructionRange, ScopeId, SourceLocation};
pub use place::{Effect, Place};
pub use value::{
    ArrayElement, ArrayPatternItem, BinaryOperator, CallArg, InstructionKind, JsxAttribute, JsxTag,
    LValue, LogicalOperator, ObjectPatternProperty, ObjectProperty, Pattern, PrimitiveValue,
    ReactiveValue, UnaryOperator,
};
pub use visit::{ReactiveFunctionTransform, ReactiveFunctionVisitor, Transformed};
