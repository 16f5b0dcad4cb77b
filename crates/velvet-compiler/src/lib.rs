//! The velvet template compiler core.
//!
//! Lowers an already-parsed template into an executable graph and decides,
//! for every member access and assignment, which host member to bind to, how
//! to convert argument and result values safely, and how to cache that
//! decision so repeated executions against the same host type skip the
//! reflective lookup.
//!
//! ## Modules
//!
//! - [`conversion`]: the type compatibility oracle and primitive widening
//! - [`overload`]: applicability filtering and better-function-member ranking
//! - [`binder`]: call sites with their single-entry monomorphic caches
//! - [`graph`]: the immutable expression/node arenas and builder surface
//! - [`ops`]: binary operator evaluation
//! - [`assignment`]: left-hand-side classification and write compilation
//! - [`foreach`]: the nine-section loop compiler
//! - [`eval`]: the execution contract (render context, evaluator)
//!
//! Resolution misses never fail a render: member reads degrade to an
//! unresolvable sentinel that the output pipeline replaces with the literal
//! reference text, and writes without a target drop silently. Both record
//! binding events for the embedder's logging.

pub mod assignment;
pub mod binder;
pub mod conversion;
pub mod eval;
pub mod foreach;
pub mod graph;
pub mod ops;
pub mod overload;

pub use assignment::{AssignTarget, Assignment, compile_assignment};
pub use binder::{BinderDescription, CallSite, CallSiteKind};
pub use conversion::{Conversion, can_convert, is_widening, widen_value};
pub use eval::{Context, RenderOutput};
pub use foreach::{ForeachLoop, Section, SectionedBody, compile_foreach};
pub use graph::{CallSiteId, Expr, ExprId, Node, NodeId, Template, TemplateGraph, VarScope};
pub use ops::{BinaryOp, eval_binary};
pub use overload::{
    BindingResult, Specificity, best_function_member, is_better_function_member, resolve_method,
};

// Re-export the error types alongside the operations that raise them.
pub use velvet_core::{CompilationError, RuntimeError};
