//! Host reflection service for the velvet template engine.
//!
//! The engine resolves members against host objects at render time, which
//! requires something reflection-shaped. This crate provides it as an
//! explicit registration table: embedders describe each host type once
//! (properties, method overloads, indexers, subtype facts) and the compiler
//! queries those descriptions through [`HostRegistry`].
//!
//! ```
//! use velvet_core::{Value, primitives};
//! use velvet_registry::{HostRegistry, HostTypeEntry, PropertyCandidate};
//!
//! let mut registry = HostRegistry::new();
//! registry
//!     .register_type(HostTypeEntry::new("Customer").with_property(
//!         PropertyCandidate::readonly::<String>("Name", primitives::STRING, |name| {
//!             Value::Str(name.clone())
//!         }),
//!     ))
//!     .unwrap();
//! ```

mod member;
mod registry;

pub use member::{
    MemberCandidate, MemberFilter, MethodCandidate, NativeFn, PropertyCandidate, PropertyGetter,
    PropertySetter, Receiver,
};
pub use registry::{HostRegistry, HostTypeEntry, PropertyLookup};
