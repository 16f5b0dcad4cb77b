//! Shared handles to host-supplied objects.
//!
//! Host objects reach the engine as type-erased values behind a shared,
//! mutable slot. The handle IS the storage location: every clone of a handle
//! aliases the same slot, so a member call that mutates the receiver is
//! observed by every later access through the same template variable. This is
//! how the engine upholds its unbox-in-place contract for value-type hosts -
//! a counter struct read three times through one variable reports 0, 1, 2,
//! never 0, 0, 0.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::type_hash::TypeHash;

/// A shared, mutable, type-erased host object.
#[derive(Clone)]
pub struct ObjectHandle {
    type_hash: TypeHash,
    type_name: Arc<str>,
    slot: Arc<Mutex<Box<dyn Any + Send + Sync>>>,
}

impl ObjectHandle {
    /// Box a host value into a fresh shared slot.
    pub fn new<T: Any + Send + Sync>(type_hash: TypeHash, type_name: &str, value: T) -> Self {
        Self {
            type_hash,
            type_name: Arc::from(type_name),
            slot: Arc::new(Mutex::new(Box::new(value))),
        }
    }

    /// The registered type of the boxed value.
    #[inline]
    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    /// The registered type name, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Run `f` against the boxed value, holding the slot lock for the
    /// duration. Mutations act on the shared storage, not a copy.
    pub fn with<R>(&self, f: impl FnOnce(&mut (dyn Any + Send + Sync)) -> R) -> R {
        // A poisoned lock still holds valid data; binding is pure per
        // (type, args) so a panicked writer cannot leave a torn value.
        let mut guard = match self.slot.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(guard.as_mut())
    }

    /// Clone the boxed value out, if it has the expected concrete type.
    pub fn extract<T: Any + Clone>(&self) -> Option<T> {
        self.with(|any| (any as &dyn Any).downcast_ref::<T>().cloned())
    }

    /// Whether two handles alias the same slot.
    #[inline]
    pub fn ptr_eq(&self, other: &ObjectHandle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHandle<{}>", self.type_name)
    }
}
