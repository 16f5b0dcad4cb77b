//! velvet - a template-language compiler with dynamic host-object binding.
//!
//! Templates reference host objects whose concrete types are unknown until
//! the first render. This crate compiles a lowered template into an
//! immutable expression graph whose member accesses run through cached,
//! type-specialized call sites: the first execution against a host type
//! resolves the member (overload selection, implicit widening, rest
//! parameters), later executions against the same type reuse the cached
//! binding, and a changed type rebinds.
//!
//! Unresolved references never fail a render - they fall back to the
//! literal reference text, matching the template language's historical
//! behavior.
//!
//! ## Crates
//!
//! - `velvet-core`: values, host-type identity, errors, binding events
//! - `velvet-registry`: the explicit registration table describing host types
//! - `velvet-compiler`: conversion, overload resolution, call-site binders,
//!   assignment and loop compilation, execution
//!
//! ## Example
//!
//! ```
//! use velvet::{
//!     Context, HostRegistry, HostTypeEntry, PropertyCandidate, Template, TemplateGraph, Value,
//!     primitives,
//! };
//!
//! struct Customer {
//!     name: String,
//! }
//!
//! let mut registry = HostRegistry::new();
//! registry
//!     .register_type(HostTypeEntry::new("Customer").with_property(
//!         PropertyCandidate::readonly::<Customer>("Name", primitives::STRING, |customer| {
//!             Value::Str(customer.name.clone())
//!         }),
//!     ))
//!     .unwrap();
//!
//! let mut graph = TemplateGraph::new();
//! let hello = graph.text("Hello, ");
//! let customer = graph.reference("customer");
//! let name = graph.property(customer, "Name");
//! let out = graph.output(name, "$customer.Name");
//! let template = Template::new(graph, vec![hello, out]);
//!
//! let mut ctx = Context::new();
//! ctx.set(
//!     "customer",
//!     Value::Object(velvet::ObjectHandle::new(
//!         velvet::TypeHash::from_name("Customer"),
//!         "Customer",
//!         Customer { name: "Ada".to_string() },
//!     )),
//! );
//!
//! let rendered = template.render(&registry, &mut ctx).unwrap();
//! assert_eq!(rendered.text, "Hello, Ada");
//! ```

pub use velvet_core::{
    BindingEvent, BindingEvents, CompilationError, ObjectHandle, RegistrationError, RuntimeError,
    Span, TypeHash, Value, primitives,
};

pub use velvet_registry::{
    HostRegistry, HostTypeEntry, MemberCandidate, MemberFilter, MethodCandidate, NativeFn,
    PropertyCandidate, PropertyLookup, Receiver,
};

pub use velvet_compiler::{
    AssignTarget, Assignment, BinaryOp, BinderDescription, BindingResult, CallSite, CallSiteId,
    CallSiteKind, Context, Conversion, Expr, ExprId, ForeachLoop, Node, NodeId, RenderOutput,
    Section, SectionedBody, Specificity, Template, TemplateGraph, VarScope, best_function_member,
    can_convert, compile_assignment, compile_foreach, eval_binary, is_better_function_member,
    is_widening, resolve_method, widen_value,
};
