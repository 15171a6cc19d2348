//! The memoization lattice.

use std::fmt;

/// How a value participates in memoization decisions.
///
/// Ordered `Never < Unmemoized < Conditional < Memoized`; joining two levels
/// takes the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoizationLevel {
    /// Identity-comparable (primitives); never worth memoizing.
    Never,
    /// Not identity-comparable, but only memoized when forced.
    Unmemoized,
    /// Memoized iff some dependency or a forcing scope is memoized.
    Conditional,
    /// Always memoized when reachable from a return.
    Memoized,
}

impl MemoizationLevel {
    /// Lattice join: the stricter level wins.
    pub fn join(self, other: Self) -> Self {
        self.max(other)
    }
}

impl fmt::Display for MemoizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoizationLevel::Never => "never",
            MemoizationLevel::Unmemoized => "unmemoized",
            MemoizationLevel::Conditional => "conditional",
            MemoizationLevel::Memoized => "memoized",
        };
        f.write_str(name)
    }
}
