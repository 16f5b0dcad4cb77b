//! Member candidates and native callables.
//!
//! A [`MemberCandidate`] describes one overload of a property or method on a
//! host type: its name, declared parameter types, optional trailing rest
//! parameter, and return type. Candidates are immutable once registered; the
//! resolver hands out `Arc`s so call-site caches can hold them without
//! copying.
//!
//! Host code reaches the engine as type-erased callables. The typed
//! constructors downcast the receiver and report a [`RuntimeError::HostFault`]
//! on mismatch - a mismatch means the registration lied about the type, which
//! is a programmer error, not a template error.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use velvet_core::{RuntimeError, TypeHash, Value, primitives};

/// Receiver passed to host callables: the type-erased boxed host value.
pub type Receiver = dyn Any + Send + Sync;

type MethodFn = dyn Fn(&mut Receiver, &[Value]) -> Result<Value, RuntimeError> + Send + Sync;
type GetterFn = dyn Fn(&mut Receiver) -> Result<Value, RuntimeError> + Send + Sync;
type SetterFn = dyn Fn(&mut Receiver, Value) -> Result<(), RuntimeError> + Send + Sync;

/// Type-erased native method implementation.
#[derive(Clone)]
pub struct NativeFn(Arc<MethodFn>);

impl NativeFn {
    /// Wrap a raw type-erased callable.
    pub fn new(
        f: impl Fn(&mut Receiver, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    /// Wrap a callable typed on the concrete receiver.
    pub fn typed<T: Any>(
        member: &str,
        f: impl Fn(&mut T, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        let member = member.to_string();
        Self::new(move |receiver, args| match receiver.downcast_mut::<T>() {
            Some(typed) => f(typed, args),
            None => Err(RuntimeError::HostFault {
                member: member.clone(),
                message: "receiver type does not match registration".to_string(),
            }),
        })
    }

    /// Invoke against a receiver with already-converted arguments.
    #[inline]
    pub fn call(&self, receiver: &mut Receiver, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.0)(receiver, args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeFn")
    }
}

/// Type-erased property getter.
///
/// Getters take the receiver mutably: the engine must tolerate getters with
/// observable side effects, and those must act on the shared storage.
#[derive(Clone)]
pub struct PropertyGetter(Arc<GetterFn>);

impl PropertyGetter {
    pub fn typed<T: Any>(
        member: &str,
        f: impl Fn(&mut T) -> Value + Send + Sync + 'static,
    ) -> Self {
        let member = member.to_string();
        Self(Arc::new(move |receiver| match receiver.downcast_mut::<T>() {
            Some(typed) => Ok(f(typed)),
            None => Err(RuntimeError::HostFault {
                member: member.clone(),
                message: "receiver type does not match registration".to_string(),
            }),
        }))
    }

    #[inline]
    pub fn get(&self, receiver: &mut Receiver) -> Result<Value, RuntimeError> {
        (self.0)(receiver)
    }
}

impl fmt::Debug for PropertyGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PropertyGetter")
    }
}

/// Type-erased property setter.
#[derive(Clone)]
pub struct PropertySetter(Arc<SetterFn>);

impl PropertySetter {
    pub fn typed<T: Any>(
        member: &str,
        f: impl Fn(&mut T, Value) + Send + Sync + 'static,
    ) -> Self {
        let member = member.to_string();
        Self(Arc::new(
            move |receiver, value| match receiver.downcast_mut::<T>() {
                Some(typed) => {
                    f(typed, value);
                    Ok(())
                }
                None => Err(RuntimeError::HostFault {
                    member: member.clone(),
                    message: "receiver type does not match registration".to_string(),
                }),
            },
        ))
    }

    #[inline]
    pub fn set(&self, receiver: &mut Receiver, value: Value) -> Result<(), RuntimeError> {
        (self.0)(receiver, value)
    }
}

impl fmt::Debug for PropertySetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PropertySetter")
    }
}

/// One property on a host type.
#[derive(Debug, Clone)]
pub struct PropertyCandidate {
    /// Member name as registered.
    pub name: String,
    /// Declared type of the property value.
    pub data_type: TypeHash,
    getter: Option<PropertyGetter>,
    setter: Option<PropertySetter>,
}

impl PropertyCandidate {
    /// A read-only property.
    pub fn readonly<T: Any>(
        name: &str,
        data_type: TypeHash,
        getter: impl Fn(&mut T) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            getter: Some(PropertyGetter::typed(name, getter)),
            setter: None,
        }
    }

    /// A read-write property.
    pub fn read_write<T: Any>(
        name: &str,
        data_type: TypeHash,
        getter: impl Fn(&mut T) -> Value + Send + Sync + 'static,
        setter: impl Fn(&mut T, Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            getter: Some(PropertyGetter::typed(name, getter)),
            setter: Some(PropertySetter::typed(name, setter)),
        }
    }

    /// A write-only property.
    pub fn writeonly<T: Any>(
        name: &str,
        data_type: TypeHash,
        setter: impl Fn(&mut T, Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            getter: None,
            setter: Some(PropertySetter::typed(name, setter)),
        }
    }

    pub fn can_read(&self) -> bool {
        self.getter.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.setter.is_some()
    }

    /// Read the property, if readable.
    pub fn get(&self, receiver: &mut Receiver) -> Option<Result<Value, RuntimeError>> {
        self.getter.as_ref().map(|g| g.get(receiver))
    }

    /// Write the property, if writable.
    pub fn set(
        &self,
        receiver: &mut Receiver,
        value: Value,
    ) -> Option<Result<(), RuntimeError>> {
        self.setter.as_ref().map(|s| s.set(receiver, value))
    }
}

/// One method overload on a host type.
///
/// When `rest` is set, the final entry of `params` is the declared type of
/// the rest parameter itself (the list type) and `rest` holds its element
/// type. This mirrors how a trailing variable-arguments parameter is declared:
/// the parameter is an array, the elements have the element type.
#[derive(Debug, Clone)]
pub struct MethodCandidate {
    /// Member name as registered.
    pub name: String,
    /// Declared parameter types, in order.
    pub params: Vec<TypeHash>,
    /// Element type of the trailing rest parameter, if any.
    pub rest: Option<TypeHash>,
    /// Declared return type; `primitives::VOID` for "no value".
    pub return_type: TypeHash,
    invoke: NativeFn,
}

impl MethodCandidate {
    pub fn new(name: &str, params: Vec<TypeHash>, return_type: TypeHash, invoke: NativeFn) -> Self {
        Self {
            name: name.to_string(),
            params,
            rest: None,
            return_type,
            invoke,
        }
    }

    /// Append a trailing rest parameter with the given element type.
    pub fn with_rest(mut self, element_type: TypeHash) -> Self {
        self.params.push(primitives::LIST);
        self.rest = Some(element_type);
        self
    }

    /// Whether the final parameter is a rest parameter.
    #[inline]
    pub fn has_rest(&self) -> bool {
        self.rest.is_some()
    }

    /// Number of parameters that are not the rest parameter.
    #[inline]
    pub fn fixed_param_count(&self) -> usize {
        self.params.len() - usize::from(self.has_rest())
    }

    /// Whether the declared return is "no value".
    #[inline]
    pub fn returns_void(&self) -> bool {
        self.return_type == primitives::VOID
    }

    /// Invoke with already-converted, already-packed arguments.
    #[inline]
    pub fn invoke(&self, receiver: &mut Receiver, args: &[Value]) -> Result<Value, RuntimeError> {
        self.invoke.call(receiver, args)
    }
}

/// A member found by enumeration: either a property or a method overload.
#[derive(Debug, Clone)]
pub enum MemberCandidate {
    Property(Arc<PropertyCandidate>),
    Method(Arc<MethodCandidate>),
}

impl MemberCandidate {
    pub fn name(&self) -> &str {
        match self {
            MemberCandidate::Property(p) => &p.name,
            MemberCandidate::Method(m) => &m.name,
        }
    }
}

bitflags! {
    /// What [`list_public_instance_members`] should enumerate and how names
    /// are matched.
    ///
    /// [`list_public_instance_members`]: crate::HostRegistry::list_public_instance_members
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemberFilter: u8 {
        const PROPERTIES = 0b0001;
        const METHODS = 0b0010;
        const IGNORE_CASE = 0b0100;
    }
}

impl MemberFilter {
    /// Whether `registered` matches `requested` under this filter.
    pub fn name_matches(&self, registered: &str, requested: &str) -> bool {
        if self.contains(MemberFilter::IGNORE_CASE) {
            registered.eq_ignore_ascii_case(requested)
        } else {
            registered == requested
        }
    }
}
