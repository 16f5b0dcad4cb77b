//! The compiled template graph.
//!
//! AST lowering (external to this crate) produces an immutable graph of
//! expression and render nodes. All mutable state - the call-site caches -
//! lives in a separate arena of [`CallSite`]s addressed by [`CallSiteId`],
//! so the tree itself never changes after compilation and can be walked by
//! any number of rendering threads at once.
//!
//! The `add_*`/builder methods below are the lowering collaborator's
//! construction surface. Nodes carry the source text they were lowered from
//! where rendering needs it for unresolvable-reference fallback.

use velvet_core::{Span, Value};

use crate::assignment::Assignment;
use crate::binder::CallSite;
use crate::foreach::{ForeachLoop, Section};
use crate::ops::BinaryOp;

/// Handle to an expression in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub(crate) u32);

/// Handle to a render node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// Handle to a call site owned by the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSiteId(pub(crate) u32);

/// Where a reference resolves: the render context's own variables, or the
/// reserved externally-supplied bindings (which are read-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Local,
    Global,
}

/// A value-producing expression.
#[derive(Debug)]
pub enum Expr {
    Literal(Value),
    ListLiteral(Vec<ExprId>),
    /// Product of the external dictionary mini-parser: ordered key/value
    /// pairs whose values may be constants or expressions.
    MapLiteral(Vec<(String, ExprId)>),
    Reference {
        name: String,
        scope: VarScope,
        span: Span,
    },
    Property {
        target: ExprId,
        name: String,
        site: CallSiteId,
        span: Span,
    },
    Index {
        target: ExprId,
        args: Vec<ExprId>,
        site: CallSiteId,
        span: Span,
    },
    MethodCall {
        target: ExprId,
        name: String,
        args: Vec<ExprId>,
        site: CallSiteId,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        span: Span,
    },
}

/// A render node: produces output or performs an effect.
#[derive(Debug)]
pub enum Node {
    /// Raw template text.
    Text(String),
    /// Render an expression; an unresolvable result falls back to the
    /// literal source text.
    Output { expr: ExprId, source: String },
    /// A compiled assignment.
    Set(Assignment),
    If {
        condition: ExprId,
        then_branch: Vec<NodeId>,
        else_branch: Vec<NodeId>,
    },
    Foreach(ForeachLoop),
    /// A section marker inside a loop body. Consumed by the section scan;
    /// renders nothing if it survives anywhere else.
    SectionMarker(Section),
}

/// Arena storage for a compiled template: immutable nodes plus the owned
/// call-site state they reference by id.
#[derive(Debug, Default)]
pub struct TemplateGraph {
    exprs: Vec<Expr>,
    nodes: Vec<Node>,
    sites: Vec<CallSite>,
}

impl TemplateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn add_site(&mut self, site: CallSite) -> CallSiteId {
        let id = CallSiteId(self.sites.len() as u32);
        self.sites.push(site);
        id
    }

    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.0 as usize)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn site(&self, id: CallSiteId) -> Option<&CallSite> {
        self.sites.get(id.0 as usize)
    }

    /// All call sites, for telemetry sweeps.
    pub fn sites(&self) -> impl Iterator<Item = (CallSiteId, &CallSite)> {
        self.sites
            .iter()
            .enumerate()
            .map(|(index, site)| (CallSiteId(index as u32), site))
    }

    // ------------------------------------------------------------------
    // Lowering conveniences
    // ------------------------------------------------------------------

    pub fn literal(&mut self, value: impl Into<Value>) -> ExprId {
        self.add_expr(Expr::Literal(value.into()))
    }

    /// A context-variable reference.
    pub fn reference(&mut self, name: &str) -> ExprId {
        self.add_expr(Expr::Reference {
            name: name.to_string(),
            scope: VarScope::Local,
            span: Span::default(),
        })
    }

    /// A reference to a reserved, externally-supplied binding.
    pub fn global_reference(&mut self, name: &str) -> ExprId {
        self.add_expr(Expr::Reference {
            name: name.to_string(),
            scope: VarScope::Global,
            span: Span::default(),
        })
    }

    /// A property access; allocates its read call site.
    pub fn property(&mut self, target: ExprId, name: &str) -> ExprId {
        let site = self.add_site(CallSite::new_read(name));
        self.add_expr(Expr::Property {
            target,
            name: name.to_string(),
            site,
            span: Span::default(),
        })
    }

    /// An indexer access; allocates its read call site.
    pub fn index(&mut self, target: ExprId, args: Vec<ExprId>) -> ExprId {
        let site = self.add_site(CallSite::new_index_get(args.len()));
        self.add_expr(Expr::Index {
            target,
            args,
            site,
            span: Span::default(),
        })
    }

    /// A method call; allocates its invoke call site.
    pub fn method_call(&mut self, target: ExprId, name: &str, args: Vec<ExprId>) -> ExprId {
        let site = self.add_site(CallSite::new_invoke(name, args.len()));
        self.add_expr(Expr::MethodCall {
            target,
            name: name.to_string(),
            args,
            site,
            span: Span::default(),
        })
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.add_expr(Expr::Binary {
            op,
            left,
            right,
            span: Span::default(),
        })
    }

    pub fn text(&mut self, text: &str) -> NodeId {
        self.add_node(Node::Text(text.to_string()))
    }

    /// An output node. `source` is the literal template text substituted
    /// when the expression is unresolvable.
    pub fn output(&mut self, expr: ExprId, source: &str) -> NodeId {
        self.add_node(Node::Output {
            expr,
            source: source.to_string(),
        })
    }
}

/// A compiled template: the graph plus its root node sequence.
#[derive(Debug)]
pub struct Template {
    graph: TemplateGraph,
    roots: Vec<NodeId>,
}

impl Template {
    pub fn new(graph: TemplateGraph, roots: Vec<NodeId>) -> Self {
        Self { graph, roots }
    }

    pub fn graph(&self) -> &TemplateGraph {
        &self.graph
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::CallSiteKind;

    #[test]
    fn builder_allocates_sites_per_occurrence() {
        let mut graph = TemplateGraph::new();
        let target = graph.reference("customer");
        let first = graph.property(target, "Name");
        let second = graph.property(target, "Name");

        // Two syntactic occurrences, two independent call sites.
        let (Some(Expr::Property { site: a, .. }), Some(Expr::Property { site: b, .. })) =
            (graph.expr(first), graph.expr(second))
        else {
            panic!("expected property expressions");
        };
        assert_ne!(a, b);
        assert_eq!(graph.sites().count(), 2);
    }

    #[test]
    fn describe_exposes_site_shape() {
        let mut graph = TemplateGraph::new();
        let target = graph.reference("order");
        let amount = graph.literal(Value::I32(3));
        let call = graph.method_call(target, "Total", vec![amount]);

        let Some(Expr::MethodCall { site, .. }) = graph.expr(call) else {
            panic!("expected method call");
        };
        let description = graph.site(*site).unwrap().describe();
        assert_eq!(description.kind, CallSiteKind::Invoke);
        assert_eq!(description.name, "Total");
        assert_eq!(description.arity, 1);
    }
}
