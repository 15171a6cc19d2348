use miette::Diagnostic;
use thiserror::Error;

use crate::hir::{IdentifierId, ScopeId, SourceLocation};

/// Result type for pruner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Custom error types for the scope pruner
///
/// Every error here is fatal: the pass either produces a valid pruned
/// function or aborts the compilation. Nothing is retried.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unexpected unsupported node at {loc}")]
    #[diagnostic(code(reactive_opt::unsupported_node))]
    UnsupportedNode { loc: SourceLocation },

    #[error("no identifier node recorded for {id}")]
    #[diagnostic(code(reactive_opt::missing_identifier_node))]
    MissingIdentifierNode { id: IdentifierId },

    #[error("no scope node recorded for {id}")]
    #[diagnostic(code(reactive_opt::missing_scope_node))]
    MissingScopeNode { id: ScopeId },

    #[error("internal error: {message}")]
    #[diagnostic(code(reactive_opt::internal_error))]
    Internal { message: String },
}

impl Error {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }
}
