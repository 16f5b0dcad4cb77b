//! TypeHash - identity handles for host types.
//!
//! Every host type visible to the template engine is identified by a
//! deterministic 64-bit hash of its registered name. Hashes are the engine's
//! `RuntimeTypeDescriptor`: opaque, cheap to copy, comparable for identity.
//! The engine never inspects a hash beyond equality; all structural facts
//! about a type (members, base type, interfaces) live in the host registry.
//!
//! ```
//! use velvet_core::TypeHash;
//!
//! let a = TypeHash::from_name("Customer");
//! let b = TypeHash::from_name("Customer");
//! assert_eq!(a, b);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-mixing constant so type hashes never collide with other hash
/// domains an embedder may derive from the same names.
const TYPE_DOMAIN: u64 = 0x2fac10b63a6cc57c;

/// A deterministic 64-bit hash identifying a host type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a registered type name.
    ///
    /// The same name always produces the same hash.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(TYPE_DOMAIN ^ xxh64(name.as_bytes(), 0))
    }

    /// Whether this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw hash value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for TypeHash {
    fn default() -> Self {
        TypeHash::EMPTY
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

/// Well-known hashes for the engine's built-in value types.
///
/// Precomputed so they are usable in const contexts and `match` guards.
pub mod primitives {
    use super::TypeHash;

    /// No value (a member whose declared return is "no value").
    pub const VOID: TypeHash = TypeHash(0xe4b3797ddcf989ea);
    /// Boolean.
    pub const BOOL: TypeHash = TypeHash(0x1e0c8fa4cced99c1);
    /// Signed 8-bit integer.
    pub const INT8: TypeHash = TypeHash(0x2b44191092e74388);
    /// Signed 16-bit integer.
    pub const INT16: TypeHash = TypeHash(0x95aebfc985e9b115);
    /// Signed 32-bit integer.
    pub const INT32: TypeHash = TypeHash(0x4f5e5320cd1c92bf);
    /// Signed 64-bit integer.
    pub const INT64: TypeHash = TypeHash(0x7d6c550df59a1924);
    /// Unsigned 8-bit integer.
    pub const UINT8: TypeHash = TypeHash(0x0e8b2d31cdfa9716);
    /// Unsigned 16-bit integer.
    pub const UINT16: TypeHash = TypeHash(0x269d68dfde65ae7f);
    /// Unsigned 32-bit integer.
    pub const UINT32: TypeHash = TypeHash(0x543fb8f520aa3e26);
    /// Unsigned 64-bit integer.
    pub const UINT64: TypeHash = TypeHash(0x32ba58d17fda82dd);
    /// 32-bit float.
    pub const FLOAT: TypeHash = TypeHash(0x02d5a2fddaf5bb69);
    /// 64-bit float.
    pub const DOUBLE: TypeHash = TypeHash(0xeb125587f6c2a79b);
    /// Unicode scalar.
    pub const CHAR: TypeHash = TypeHash(0x6c1fd83b09a2e457);
    /// String.
    pub const STRING: TypeHash = TypeHash(0x7a8d5fb1ba695978);
    /// Built-in list (also the declared type of a rest parameter).
    pub const LIST: TypeHash = TypeHash(0x91c4be02d5f3a86e);
    /// Built-in string-keyed map.
    pub const MAP: TypeHash = TypeHash(0xd04a2c7e88b61f35);
    /// Universal reference root. Every value converts to it.
    pub const OBJECT: TypeHash = TypeHash(0x48f1a93c5e07d2ba);
    /// The type of the unresolvable sentinel. Never registered, so no
    /// member ever resolves against it.
    pub const UNRESOLVED: TypeHash = TypeHash(0xba5e0fd7412c9e83);

    /// Non-nullable primitives: a null argument can never convert to these.
    pub fn is_primitive(hash: TypeHash) -> bool {
        matches!(
            hash,
            BOOL | INT8
                | INT16
                | INT32
                | INT64
                | UINT8
                | UINT16
                | UINT32
                | UINT64
                | FLOAT
                | DOUBLE
                | CHAR
        )
    }

    /// Numeric primitives participating in the widening table.
    pub fn is_numeric(hash: TypeHash) -> bool {
        is_primitive(hash) && hash != BOOL
    }

    /// Readable name for a well-known hash, used in diagnostics.
    pub fn name_of(hash: TypeHash) -> Option<&'static str> {
        Some(match hash {
            VOID => "void",
            BOOL => "bool",
            INT8 => "int8",
            INT16 => "int16",
            INT32 => "int32",
            INT64 => "int64",
            UINT8 => "uint8",
            UINT16 => "uint16",
            UINT32 => "uint32",
            UINT64 => "uint64",
            FLOAT => "float",
            DOUBLE => "double",
            CHAR => "char",
            STRING => "string",
            LIST => "list",
            MAP => "map",
            OBJECT => "object",
            UNRESOLVED => "unresolved",
            _ => return None,
        })
    }
}
