//! Error types for template compilation and execution.
//!
//! The engine distinguishes sharply between two failure classes:
//!
//! - **Structural/programmer errors** are fatal. They abort compilation of
//!   the enclosing template (no partial template is ever produced) or, at
//!   execution time, abort the render with a [`RuntimeError`].
//! - **Resolution misses** (member not found, ambiguous overload) are NOT
//!   errors. They surface as the unresolvable sentinel value or a dropped
//!   write, and are reported through the binding-event sink instead.

use thiserror::Error;

use crate::span::Span;

/// Fatal errors raised while lowering a template into its executable graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// The left-hand side of an assignment is a reserved, externally-supplied
    /// binding. Rejected at compile time, never deferred to execution.
    #[error("cannot assign to global variable '{name}' at {span}")]
    AssignmentToGlobal { name: String, span: Span },

    /// A node has an invalid shape (bad arity, dangling id, wrong kind in a
    /// position that requires another).
    #[error("malformed node at {span}: {message}")]
    MalformedNode { message: String, span: Span },

    /// An invariant inside the compiler was violated.
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Fatal errors raised while executing a compiled template.
///
/// Unresolved members never produce these; only programmer-error conditions
/// do (null required arguments, malformed graph shapes, host callables
/// reporting misuse).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A required argument was absent where the contract demands a value.
    #[error("required argument '{name}' was null")]
    NullArgument { name: String },

    /// A graph id did not resolve to a node. Only possible for graphs
    /// assembled by hand rather than through the builder.
    #[error("dangling node reference {index}")]
    DanglingNode { index: u32 },

    /// A host callable rejected its receiver or arguments. This indicates a
    /// registration mistake, not a template-author mistake.
    #[error("host member '{member}' fault: {message}")]
    HostFault { member: String, message: String },
}

/// Errors raised while registering host types with the registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("type '{name}' is already registered")]
    DuplicateType { name: String },

    #[error("base type of '{name}' is not registered")]
    UnknownBase { name: String },
}
