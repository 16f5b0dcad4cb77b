//! Iteration-section compilation.
//!
//! A loop body may be partitioned into nine sections by marker directives: a
//! marker switches the "current section" for everything after it, and
//! unmarked content belongs to `each`. The compiled loop dispatches sections
//! per iteration:
//!
//! - `before-all` once before the first element, `after-all` once after the
//!   last;
//! - per element, in order: `before` (first element only), `odd`/`even` by
//!   1-based parity, `between` (every element but the first), `each`, and
//!   `after` (last element only);
//! - a source that is not enumerable, or enumerates nothing, runs only
//!   `no-data`.
//!
//! Detecting the last element needs one element of lookahead, since the
//! underlying sequence is consumed as a forward-only cursor.

use velvet_core::{CompilationError, Span};

use crate::graph::{Expr, ExprId, NodeId, TemplateGraph, VarScope};

/// The nine section slots of a loop body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    BeforeAll,
    Before,
    Each,
    Odd,
    Even,
    Between,
    After,
    AfterAll,
    NoData,
}

impl Section {
    /// Number of section slots.
    pub const COUNT: usize = 9;

    /// Parse a marker directive name, case-insensitively.
    pub fn parse(name: &str) -> Option<Section> {
        Some(match name.to_ascii_lowercase().as_str() {
            "beforeall" => Section::BeforeAll,
            "before" => Section::Before,
            "each" => Section::Each,
            "odd" => Section::Odd,
            "even" => Section::Even,
            "between" => Section::Between,
            "after" => Section::After,
            "afterall" => Section::AfterAll,
            "nodata" => Section::NoData,
            _ => return None,
        })
    }

    fn index(self) -> usize {
        match self {
            Section::BeforeAll => 0,
            Section::Before => 1,
            Section::Each => 2,
            Section::Odd => 3,
            Section::Even => 4,
            Section::Between => 5,
            Section::After => 6,
            Section::AfterAll => 7,
            Section::NoData => 8,
        }
    }
}

/// A loop body partitioned into its section slots. Built once per loop
/// compilation, immutable afterwards.
#[derive(Debug, Default)]
pub struct SectionedBody {
    parts: [Vec<NodeId>; Section::COUNT],
}

impl SectionedBody {
    /// Partition a body by its section markers.
    ///
    /// Marker nodes switch the current section and are consumed; everything
    /// else lands in the current section, starting with `each`.
    pub fn from_nodes(graph: &TemplateGraph, body: &[NodeId]) -> Self {
        let mut parts: [Vec<NodeId>; Section::COUNT] = Default::default();
        let mut current = Section::Each;

        for &id in body {
            if let Some(crate::graph::Node::SectionMarker(section)) = graph.node(id) {
                current = *section;
                continue;
            }
            parts[current.index()].push(id);
        }

        Self { parts }
    }

    /// The nodes of one section, possibly empty.
    pub fn section(&self, section: Section) -> &[NodeId] {
        &self.parts[section.index()]
    }

    /// Whether any content was assigned to the section.
    pub fn is_defined(&self, section: Section) -> bool {
        !self.parts[section.index()].is_empty()
    }
}

/// A compiled sectioned loop.
#[derive(Debug)]
pub struct ForeachLoop {
    /// The enumerable-producing expression, evaluated once.
    pub source: ExprId,
    /// Name of the per-iteration item binding.
    pub item: String,
    /// Name of the per-iteration 1-based index binding.
    pub index_name: String,
    pub body: SectionedBody,
    pub span: Span,
}

/// Compile a sectioned loop.
///
/// The item binding must be a plain context-variable reference; a reserved
/// external binding cannot be the loop item because iteration writes to it
/// every pass.
pub fn compile_foreach(
    graph: &TemplateGraph,
    source: ExprId,
    item: ExprId,
    index_name: &str,
    body: &[NodeId],
    span: Span,
) -> Result<ForeachLoop, CompilationError> {
    if graph.expr(source).is_none() {
        return Err(CompilationError::MalformedNode {
            message: "loop source is a dangling reference".to_string(),
            span,
        });
    }

    let item_name = match graph.expr(item) {
        Some(Expr::Reference {
            name,
            scope: VarScope::Global,
            ..
        }) => {
            return Err(CompilationError::AssignmentToGlobal {
                name: name.clone(),
                span,
            });
        }
        Some(Expr::Reference { name, .. }) => name.clone(),
        _ => {
            return Err(CompilationError::MalformedNode {
                message: "loop item must be a variable reference".to_string(),
                span,
            });
        }
    };

    Ok(ForeachLoop {
        source,
        item: item_name,
        index_name: index_name.to_string(),
        body: SectionedBody::from_nodes(graph, body),
        span,
    })
}
