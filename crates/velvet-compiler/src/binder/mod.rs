//! Call-site binders.
//!
//! Every syntactic member access in a template - property read, member or
//! indexer write, method invocation - owns one [`CallSite`]. The site starts
//! unbound; the first execution against a host value resolves the member,
//! builds a guarded execution fragment, and caches it keyed by the observed
//! host type (plus the observed argument shape for invoke sites). Later
//! executions against the same shape reuse the fragment without touching the
//! resolver; a different shape rebinds and replaces the cached entry.
//!
//! The cache is deliberately monomorphic: at most one live fragment per
//! site. A new observed type evicts the old entry, which bounds memory and
//! keeps the guard a single comparison.
//!
//! ## Concurrency
//!
//! A compiled template may render on many threads at once. Binding is a pure
//! function of (type, argument shape), so the cache uses copy-on-write
//! replacement: the new fragment is built fully before being installed, and
//! two threads racing to rebind merely duplicate work - whichever install
//! wins, every execution still runs a correct fragment. Nothing blocks
//! beyond the pointer swap.
//!
//! Resolution failures never escape a binder. Reads degrade to the
//! unresolvable sentinel, writes drop silently; both record a binding event.

mod invoke;
mod read;
mod write;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use velvet_core::{TypeHash, Value};
use velvet_registry::{HostRegistry, MethodCandidate, PropertyCandidate, Receiver};

use crate::conversion::{Conversion, widen_value};

/// What a call site does when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSiteKind {
    Read,
    Write,
    Invoke,
}

/// Diagnostic description of a call site, for telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderDescription {
    pub kind: CallSiteKind,
    pub name: String,
    pub arity: usize,
}

/// The bound operation inside a cached fragment.
#[derive(Debug)]
enum BoundOp {
    PropertyGet(Arc<PropertyCandidate>),
    PropertySet(Arc<PropertyCandidate>),
    /// Member-read fallback through the single-string-parameter indexer.
    StringIndexGet(Arc<MethodCandidate>),
    /// Member-write fallback through the string-keyed indexer setter.
    StringIndexSet(Arc<MethodCandidate>),
    /// Method invocation or indexer read.
    Call {
        candidate: Arc<MethodCandidate>,
        conversions: Vec<Conversion>,
    },
    /// Indexer write.
    Store {
        candidate: Arc<MethodCandidate>,
        conversions: Vec<Conversion>,
    },
    /// Terminal advisory outcome for this observed shape. Re-attempted only
    /// when the observed type changes.
    Unresolvable,
}

/// A guarded, type-specialized execution fragment.
#[derive(Debug)]
struct CompiledBinding {
    guard_type: TypeHash,
    /// Observed argument shape, present for invoke/indexer sites.
    guard_args: Option<Box<[Option<TypeHash>]>>,
    op: BoundOp,
}

/// One call site: a per-occurrence, re-enterable binding unit with its
/// single-entry cache.
#[derive(Debug)]
pub struct CallSite {
    kind: CallSiteKind,
    name: String,
    arity: usize,
    cache: RwLock<Option<Arc<CompiledBinding>>>,
    bind_count: AtomicUsize,
}

impl CallSite {
    /// A member-read site.
    pub fn new_read(name: &str) -> Self {
        Self::new(CallSiteKind::Read, name, 0)
    }

    /// A member-write site.
    pub fn new_write(name: &str) -> Self {
        Self::new(CallSiteKind::Write, name, 1)
    }

    /// A method-invocation site with the given argument count.
    pub fn new_invoke(name: &str, arity: usize) -> Self {
        Self::new(CallSiteKind::Invoke, name, arity)
    }

    /// An indexer-read site with the given index count.
    pub fn new_index_get(arity: usize) -> Self {
        Self::new(CallSiteKind::Read, "[]", arity)
    }

    /// An indexer-write site with the given index count (the written value
    /// is not part of the arity).
    pub fn new_index_set(arity: usize) -> Self {
        Self::new(CallSiteKind::Write, "[]", arity)
    }

    fn new(kind: CallSiteKind, name: &str, arity: usize) -> Self {
        Self {
            kind,
            name: name.to_string(),
            arity,
            cache: RwLock::new(None),
            bind_count: AtomicUsize::new(0),
        }
    }

    /// Diagnostic description: kind, member name, arity.
    pub fn describe(&self) -> BinderDescription {
        BinderDescription {
            kind: self.kind,
            name: self.name.clone(),
            arity: self.arity,
        }
    }

    /// The member name this site binds.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many times this site has run member resolution. Cache hits do not
    /// resolve, so a site observing a stable type counts once.
    pub fn bind_count(&self) -> usize {
        self.bind_count.load(Ordering::Relaxed)
    }

    /// Fetch the cached fragment if its guard matches the observed shape.
    fn lookup(
        &self,
        target_type: TypeHash,
        arg_shape: Option<&[Option<TypeHash>]>,
    ) -> Option<Arc<CompiledBinding>> {
        let cache = match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let binding = cache.as_ref()?;
        if binding.guard_type != target_type {
            return None;
        }
        if binding.guard_args.as_deref() != arg_shape {
            return None;
        }
        Some(Arc::clone(binding))
    }

    /// Install a freshly built fragment, evicting whatever was cached.
    ///
    /// Built fully before the swap; a racing install is tolerated - the
    /// loser's work is wasted, never wrong.
    fn install(
        &self,
        guard_type: TypeHash,
        guard_args: Option<Box<[Option<TypeHash>]>>,
        op: BoundOp,
    ) -> Arc<CompiledBinding> {
        self.bind_count.fetch_add(1, Ordering::Relaxed);
        let binding = Arc::new(CompiledBinding {
            guard_type,
            guard_args,
            op,
        });
        let mut cache = match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cache = Some(Arc::clone(&binding));
        binding
    }
}

/// Run `f` against the receiver storage of `target`.
///
/// Host objects expose their shared slot, so mutation is observed by every
/// alias. Engine value types are copied into a temporary; members registered
/// on them are expected to be pure.
fn with_receiver<R>(target: &Value, f: impl FnOnce(&mut Receiver) -> R) -> Option<R> {
    match target {
        Value::Object(handle) => Some(handle.with(f)),
        Value::Str(v) => {
            let mut copy = v.clone();
            Some(f(&mut copy))
        }
        Value::List(v) => {
            let mut copy = v.clone();
            Some(f(&mut copy))
        }
        Value::Map(v) => {
            let mut copy = v.clone();
            Some(f(&mut copy))
        }
        Value::Bool(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::I8(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::I16(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::I32(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::I64(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::U8(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::U16(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::U32(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::U64(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::F32(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::F64(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::Char(v) => {
            let mut copy = *v;
            Some(f(&mut copy))
        }
        Value::Null | Value::Unresolvable => None,
    }
}

/// Apply a non-rest conversion tag to an argument.
fn apply_conversion(value: &Value, conversion: &Conversion) -> Value {
    match conversion {
        Conversion::Identity => value.clone(),
        Conversion::Widen { to } => widen_value(value, *to).unwrap_or_else(|| value.clone()),
        // Rest packing is handled during argument assembly.
        Conversion::RestPack { element } => {
            widen_value(value, *element).unwrap_or_else(|| value.clone())
        }
    }
}

/// Convert the supplied arguments into the final parameter list, packing
/// rest arguments into a freshly allocated list when the binding calls for
/// it.
fn assemble_arguments(
    candidate: &MethodCandidate,
    conversions: &[Conversion],
    args: &[Value],
) -> Vec<Value> {
    let mut assembled = Vec::with_capacity(candidate.params.len());
    let mut rest: Option<Vec<Value>> = None;

    for (value, conversion) in args.iter().zip(conversions.iter()) {
        match conversion {
            Conversion::RestPack { .. } => {
                rest.get_or_insert_with(Vec::new)
                    .push(apply_conversion(value, conversion));
            }
            other => assembled.push(apply_conversion(value, other)),
        }
    }

    // A rest candidate always receives its rest list, even an empty one -
    // unless the caller passed the list through directly.
    if candidate.has_rest() && assembled.len() < candidate.params.len() {
        assembled.push(Value::List(rest.unwrap_or_default()));
    }

    assembled
}

/// Format an argument shape for binding events.
fn format_arg_types(registry: &HostRegistry, shape: &[Option<TypeHash>]) -> String {
    shape
        .iter()
        .map(|arg| match arg {
            Some(hash) => registry.type_name(*hash),
            None => "null".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
