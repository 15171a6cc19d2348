//! Reactive-opt-rs: reactive scope memoization optimizer for React-style HIR
//!
//! This library decides which reactive scopes of a compiled function are
//! worth memoizing across re-renders and prunes the rest, inlining their
//! instructions. A value earns memoization only if it flows, directly or
//! through aliases, into a return value; scopes that share interleaved
//! values keep their dependencies memoized transitively.

pub mod analysis;
pub mod error;
pub mod hir;
pub mod passes;

pub use error::{Error, Result};
pub use passes::{prune_non_escaping_scopes, MemoizationOptions, PruneStats};

// Re-export commonly used types
pub use analysis::MemoizationLevel;
pub use hir::{ReactiveFunction, ReactiveValue};
