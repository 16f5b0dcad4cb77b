//! Type compatibility checking.
//!
//! Decides whether a value of one observed runtime type may be used where a
//! parameter declares another, and what operation that use requires. This is
//! the foundation both of overload applicability ("can this argument go in
//! this slot at all?") and of specificity ranking ("which of two applicable
//! overloads is closer to the arguments?").
//!
//! ## Conversion law
//!
//! 1. A null argument converts to anything except a non-nullable primitive.
//! 2. Identity always converts.
//! 3. Reference widening per the registry: base classes, interfaces, and the
//!    universal object root.
//! 4. The fixed primitive widening table - see [`primitive`]. Nothing else:
//!    no narrowing, no user-defined conversions.

pub mod primitive;

pub use primitive::{is_widening, widen_value};

use velvet_core::{TypeHash, primitives};
use velvet_registry::HostRegistry;

/// The operation an argument needs to fit its parameter slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// No conversion needed (identity, null, or reference widening).
    Identity,
    /// Primitive widening to the target type.
    Widen {
        /// Target type of the widening.
        to: TypeHash,
    },
    /// The argument belongs to a trailing rest parameter and is packed into
    /// the freshly allocated rest array.
    RestPack {
        /// Element type of the rest parameter.
        element: TypeHash,
    },
}

impl Conversion {
    /// Whether this conversion leaves the value untouched.
    #[inline]
    pub fn is_exact(&self) -> bool {
        matches!(self, Conversion::Identity)
    }
}

/// Whether a value of observed type `from` may be used where `to` is
/// declared. `None` is the observed type of a null argument.
///
/// Total function: never fails, never consults anything but the registry's
/// already-resident type facts.
pub fn can_convert(registry: &HostRegistry, from: Option<TypeHash>, to: TypeHash) -> bool {
    let Some(from) = from else {
        // Null converts to any reference-like target.
        return !primitives::is_primitive(to);
    };

    if from == to || registry.is_assignable(from, to) {
        return true;
    }

    is_widening(from, to)
}

/// The conversion required to pass `from` where `to` is declared.
///
/// Callers must have established convertibility (via [`can_convert`] or
/// overload applicability); reference widenings come back as `Identity`
/// because the uniform value representation makes them free.
pub fn conversion_to(registry: &HostRegistry, from: Option<TypeHash>, to: TypeHash) -> Conversion {
    match from {
        None => Conversion::Identity,
        Some(from) if from == to => Conversion::Identity,
        Some(from) if is_widening(from, to) => Conversion::Widen { to },
        Some(_) => Conversion::Identity,
    }
}
