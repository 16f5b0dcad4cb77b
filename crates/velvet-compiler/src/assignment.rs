//! Assignment compilation.
//!
//! An assignment's left-hand side decides the write operation at compile
//! time:
//!
//! - a plain variable compiles to a direct context store;
//! - a property or indexer access compiles to a write through a freshly
//!   allocated write binder;
//! - a method-call result or literal is not assignable and compiles to a
//!   no-op (recorded as a binding event when executed);
//! - a reserved, externally-supplied binding is rejected here, at compile
//!   time - never deferred to execution.
//!
//! Binder-mediated writes suppress absent results: the right-hand side is
//! evaluated exactly once into a temporary and the store only happens when a
//! value is present, so an absent right-hand side leaves the target's prior
//! value untouched. Direct variable stores do not suppress - the context
//! tolerates null.

use velvet_core::{CompilationError, Span};

use crate::binder::CallSite;
use crate::graph::{Expr, ExprId, TemplateGraph, VarScope};

/// The compiled write operation for an assignment's left-hand side.
#[derive(Debug)]
pub enum AssignTarget {
    /// Direct store into the render context.
    Variable { name: String },
    /// Property write through a member-write binder.
    Property {
        target: ExprId,
        name: String,
        site: crate::graph::CallSiteId,
    },
    /// Indexer write through an indexer-write binder.
    Index {
        target: ExprId,
        args: Vec<ExprId>,
        site: crate::graph::CallSiteId,
    },
    /// The left-hand side is not assignable; the assignment is a no-op.
    Discard { description: String },
}

/// A compiled assignment node.
#[derive(Debug)]
pub struct Assignment {
    pub target: AssignTarget,
    pub rhs: ExprId,
    pub span: Span,
}

/// Classify a left-hand side and produce the compiled assignment.
///
/// Fails only for structural problems: a dangling id, or assignment to a
/// global binding.
pub fn compile_assignment(
    graph: &mut TemplateGraph,
    lhs: ExprId,
    rhs: ExprId,
    span: Span,
) -> Result<Assignment, CompilationError> {
    if graph.expr(rhs).is_none() {
        return Err(CompilationError::MalformedNode {
            message: "assignment right-hand side is a dangling reference".to_string(),
            span,
        });
    }

    // Read what we need out of the graph before allocating write sites.
    enum Classified {
        Variable(String),
        Global(String),
        Property(ExprId, String),
        Index(ExprId, Vec<ExprId>),
        Discard(&'static str),
    }

    let classified = match graph.expr(lhs) {
        None => {
            return Err(CompilationError::MalformedNode {
                message: "assignment left-hand side is a dangling reference".to_string(),
                span,
            });
        }
        Some(Expr::Reference {
            name,
            scope: VarScope::Global,
            ..
        }) => Classified::Global(name.clone()),
        Some(Expr::Reference { name, .. }) => Classified::Variable(name.clone()),
        Some(Expr::Property { target, name, .. }) => Classified::Property(*target, name.clone()),
        Some(Expr::Index { target, args, .. }) => Classified::Index(*target, args.clone()),
        Some(Expr::MethodCall { .. }) => Classified::Discard("method-call result"),
        Some(Expr::Literal(_) | Expr::ListLiteral(_) | Expr::MapLiteral(_)) => {
            Classified::Discard("literal")
        }
        Some(Expr::Binary { .. }) => Classified::Discard("operator result"),
    };

    let target = match classified {
        Classified::Global(name) => {
            return Err(CompilationError::AssignmentToGlobal { name, span });
        }
        Classified::Variable(name) => AssignTarget::Variable { name },
        Classified::Property(target, name) => {
            let site = graph.add_site(CallSite::new_write(&name));
            AssignTarget::Property { target, name, site }
        }
        Classified::Index(target, args) => {
            let site = graph.add_site(CallSite::new_index_set(args.len()));
            AssignTarget::Index { target, args, site }
        }
        Classified::Discard(kind) => AssignTarget::Discard {
            description: format!("{kind} at {span}"),
        },
    };

    Ok(Assignment { target, rhs, span })
}
