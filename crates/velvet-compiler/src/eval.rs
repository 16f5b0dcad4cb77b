//! Template execution.
//!
//! The execution contract for a compiled graph: evaluate once, produce a
//! value (possibly the unresolvable sentinel) or perform a side-effecting
//! write, and never fault for unresolved members - only for programmer
//! errors such as dangling graph ids or host-callable misuse.
//!
//! `render` may be called concurrently on the same [`Template`] from many
//! threads, each with its own [`Context`]; the call-site caches tolerate the
//! races by copy-on-write replacement.

use std::collections::HashMap;

use rustc_hash::FxHashMap;

use velvet_core::{BindingEvent, BindingEvents, RuntimeError, Value};
use velvet_registry::HostRegistry;

use crate::assignment::{AssignTarget, Assignment};
use crate::foreach::{ForeachLoop, Section};
use crate::graph::{Expr, Node, NodeId, Template, TemplateGraph, VarScope};
use crate::ops::{self, BinaryOp};

/// The variable environment of one render pass.
///
/// Locals are the template's own bindings; globals are the reserved,
/// externally-supplied bindings, readable but never assignable from template
/// code (the assignment compiler rejects them before execution).
#[derive(Debug, Default)]
pub struct Context {
    locals: FxHashMap<String, Value>,
    globals: FxHashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a context variable.
    pub fn set(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    /// Unbind a context variable, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.locals.remove(name)
    }

    /// Bind a reserved external value.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    /// Resolve a name: context variables shadow globals.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }

    /// Resolve a name among the context variables only.
    pub fn get_local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Resolve a name among the reserved external bindings only.
    pub fn get_global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }
}

/// The result of one render pass.
#[derive(Debug)]
pub struct RenderOutput {
    /// The rendered text.
    pub text: String,
    /// Binding events recorded during the pass, in order.
    pub events: Vec<BindingEvent>,
}

impl Template {
    /// Render this template against a host registry and variable context.
    pub fn render(
        &self,
        registry: &HostRegistry,
        ctx: &mut Context,
    ) -> Result<RenderOutput, RuntimeError> {
        let events = BindingEvents::new();
        let mut text = String::new();
        {
            let mut evaluator = Evaluator {
                registry,
                graph: self.graph(),
                events: &events,
                ctx,
                out: &mut text,
            };
            for &root in self.roots() {
                evaluator.exec_node(root)?;
            }
        }
        Ok(RenderOutput {
            text,
            events: events.drain(),
        })
    }
}

struct Evaluator<'a> {
    registry: &'a HostRegistry,
    graph: &'a TemplateGraph,
    events: &'a BindingEvents,
    ctx: &'a mut Context,
    out: &'a mut String,
}

impl Evaluator<'_> {
    fn exec_node(&mut self, id: NodeId) -> Result<(), RuntimeError> {
        let graph = self.graph;
        let node = graph
            .node(id)
            .ok_or(RuntimeError::DanglingNode { index: id.0 })?;

        match node {
            Node::Text(text) => {
                self.out.push_str(text);
                Ok(())
            }
            Node::Output { expr, source } => {
                let value = self.eval_expr(*expr)?;
                if matches!(value, Value::Unresolvable) {
                    // Compatibility contract: a bad reference renders as its
                    // literal source text, never as a render failure.
                    self.out.push_str(source);
                } else {
                    self.out.push_str(&value.render());
                }
                Ok(())
            }
            Node::Set(assignment) => self.exec_assignment(assignment),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(*condition)?.is_truthy() {
                    self.exec_nodes(then_branch)
                } else {
                    self.exec_nodes(else_branch)
                }
            }
            Node::Foreach(each) => self.exec_foreach(each),
            Node::SectionMarker(_) => Ok(()),
        }
    }

    fn exec_nodes(&mut self, ids: &[NodeId]) -> Result<(), RuntimeError> {
        for &id in ids {
            self.exec_node(id)?;
        }
        Ok(())
    }

    fn eval_expr(&mut self, id: crate::graph::ExprId) -> Result<Value, RuntimeError> {
        let graph = self.graph;
        let expr = graph
            .expr(id)
            .ok_or(RuntimeError::DanglingNode { index: id.0 })?;

        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::ListLiteral(items) => {
                let mut values = Vec::with_capacity(items.len());
                for &item in items {
                    values.push(self.eval_expr(item)?);
                }
                Ok(Value::List(values))
            }
            Expr::MapLiteral(entries) => {
                let mut map = HashMap::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval_expr(*value)?);
                }
                Ok(Value::Map(map))
            }
            Expr::Reference { name, scope, .. } => {
                let found = match scope {
                    VarScope::Local => self.ctx.get(name),
                    VarScope::Global => self.ctx.get_global(name),
                };
                Ok(found.cloned().unwrap_or(Value::Unresolvable))
            }
            Expr::Property { target, site, .. } => {
                let receiver = self.eval_expr(*target)?;
                let site = graph
                    .site(*site)
                    .ok_or(RuntimeError::DanglingNode { index: site.0 })?;
                site.read_member(self.registry, self.events, &receiver)
            }
            Expr::Index { target, args, site, .. } => {
                let receiver = self.eval_expr(*target)?;
                let mut values = Vec::with_capacity(args.len());
                for &arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                if let Some(found) = index_builtin(&receiver, &values) {
                    return Ok(found);
                }
                let site = graph
                    .site(*site)
                    .ok_or(RuntimeError::DanglingNode { index: site.0 })?;
                site.index_get(self.registry, self.events, &receiver, &values)
            }
            Expr::MethodCall { target, args, site, .. } => {
                let receiver = self.eval_expr(*target)?;
                let mut values = Vec::with_capacity(args.len());
                for &arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                let site = graph
                    .site(*site)
                    .ok_or(RuntimeError::DanglingNode { index: site.0 })?;
                site.invoke_member(self.registry, self.events, &receiver, &values)
            }
            Expr::Binary { op, left, right, .. } => {
                let lhs = self.eval_expr(*left)?;
                Ok(match *op {
                    BinaryOp::And => {
                        Value::Bool(lhs.is_truthy() && self.eval_expr(*right)?.is_truthy())
                    }
                    BinaryOp::Or => {
                        Value::Bool(lhs.is_truthy() || self.eval_expr(*right)?.is_truthy())
                    }
                    op => {
                        let rhs = self.eval_expr(*right)?;
                        ops::eval_binary(op, &lhs, &rhs)
                    }
                })
            }
        }
    }

    fn exec_assignment(&mut self, assignment: &Assignment) -> Result<(), RuntimeError> {
        let graph = self.graph;
        match &assignment.target {
            AssignTarget::Variable { name } => {
                // Direct store, no suppression: context variables tolerate
                // null.
                let value = self.eval_expr(assignment.rhs)?;
                self.ctx.set(name, value);
                Ok(())
            }
            AssignTarget::Property { target, site, .. } => {
                // RHS evaluated exactly once; an absent result leaves the
                // target's prior value untouched.
                let value = self.eval_expr(assignment.rhs)?;
                if value.is_absent() {
                    return Ok(());
                }
                let receiver = self.eval_expr(*target)?;
                let site = graph
                    .site(*site)
                    .ok_or(RuntimeError::DanglingNode { index: site.0 })?;
                site.write_member(self.registry, self.events, &receiver, value)
            }
            AssignTarget::Index { target, args, site } => {
                let value = self.eval_expr(assignment.rhs)?;
                if value.is_absent() {
                    return Ok(());
                }
                let receiver = self.eval_expr(*target)?;
                if matches!(receiver, Value::List(_) | Value::Map(_)) {
                    // Built-in collections are value-typed in the engine;
                    // their slots have no shared storage to write into.
                    self.events.record(BindingEvent::AssignmentDropped {
                        target: format!("built-in collection at {}", assignment.span),
                    });
                    return Ok(());
                }
                let mut index_args = Vec::with_capacity(args.len() + 1);
                for &arg in args {
                    index_args.push(self.eval_expr(arg)?);
                }
                index_args.push(value);
                let site = graph
                    .site(*site)
                    .ok_or(RuntimeError::DanglingNode { index: site.0 })?;
                site.index_set(self.registry, self.events, &receiver, &index_args)
            }
            AssignTarget::Discard { description } => {
                self.events.record(BindingEvent::AssignmentDropped {
                    target: description.clone(),
                });
                Ok(())
            }
        }
    }

    fn exec_foreach(&mut self, each: &ForeachLoop) -> Result<(), RuntimeError> {
        let source = self.eval_expr(each.source)?;

        // Anything that does not enumerate - including null - runs only the
        // no-data section. So does an empty sequence.
        let Value::List(items) = source else {
            return self.exec_section(each, Section::NoData);
        };
        if items.is_empty() {
            return self.exec_section(each, Section::NoData);
        }

        // Save whatever the loop bindings held so they do not leak into the
        // surrounding scope.
        let saved_item = self.ctx.get_local(&each.item).cloned();
        let saved_index = self.ctx.get_local(&each.index_name).cloned();

        self.exec_section(each, Section::BeforeAll)?;

        let mut iter = items.into_iter();
        // One element of lookahead: the sequence is a forward-only cursor,
        // and the `after` section needs to know the final element.
        let mut pending = iter.next();
        let mut index = 0usize;

        while let Some(current) = pending {
            pending = iter.next();
            index += 1;
            let is_final = pending.is_none();

            self.ctx.set(&each.item, current);
            self.ctx.set(&each.index_name, Value::I32(index as i32));

            if index == 1 {
                self.exec_section(each, Section::Before)?;
            }
            if index % 2 == 1 {
                self.exec_section(each, Section::Odd)?;
            } else {
                self.exec_section(each, Section::Even)?;
            }
            if index > 1 {
                self.exec_section(each, Section::Between)?;
            }
            self.exec_section(each, Section::Each)?;
            if is_final {
                self.exec_section(each, Section::After)?;
            }
        }

        self.exec_section(each, Section::AfterAll)?;

        match saved_item {
            Some(value) => self.ctx.set(&each.item, value),
            None => {
                self.ctx.remove(&each.item);
            }
        }
        match saved_index {
            Some(value) => self.ctx.set(&each.index_name, value),
            None => {
                self.ctx.remove(&each.index_name);
            }
        }
        Ok(())
    }

    fn exec_section(&mut self, each: &ForeachLoop, section: Section) -> Result<(), RuntimeError> {
        // Sections run in the loop's own lexical scope, so they see the
        // current item and index bindings.
        self.exec_nodes(each.body.section(section))
    }
}

/// Index access on the engine's built-in collections, bypassing binders.
fn index_builtin(target: &Value, args: &[Value]) -> Option<Value> {
    match (target, args) {
        (Value::List(items), [index]) => {
            let position = usize::try_from(index.as_i64()?).ok()?;
            Some(items.get(position).cloned().unwrap_or(Value::Unresolvable))
        }
        (Value::Map(entries), [Value::Str(key)]) => {
            Some(entries.get(key).cloned().unwrap_or(Value::Unresolvable))
        }
        _ => None,
    }
}
