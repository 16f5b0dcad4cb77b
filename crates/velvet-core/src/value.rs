//! The uniform runtime value.
//!
//! Every expression in a compiled template evaluates to a [`Value`]. The
//! numeric variants deliberately preserve their width and signedness instead
//! of collapsing to `i64`/`f64`: overload resolution selects members by the
//! *observed* runtime type, so `I16(3)` and `I64(3)` must be distinguishable
//! when a host type overloads on both.
//!
//! Two variants carry engine-internal meaning:
//!
//! - [`Value::Null`] is the absent value. As an argument it converts to any
//!   reference-like parameter (null-aware overload selection).
//! - [`Value::Unresolvable`] is the sentinel produced when a member cannot be
//!   bound. Rendering substitutes the literal reference text for it; it never
//!   aborts a render.

use std::collections::HashMap;
use std::fmt;

use crate::object::ObjectHandle;
use crate::type_hash::{TypeHash, primitives};

/// A runtime value flowing through a compiled template.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Sentinel for a reference that could not be bound.
    Unresolvable,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(String),
    /// Built-in sequence; also the shape of a packed rest-argument array.
    List(Vec<Value>),
    /// Built-in string-keyed map (the product of the dictionary mini-parser).
    Map(HashMap<String, Value>),
    /// Host object behind a shared slot.
    Object(ObjectHandle),
}

impl Value {
    /// The observed runtime type, or `None` for the absent value.
    ///
    /// `None` is what drives null-aware conversion in the resolver: a null
    /// argument is convertible to any parameter that is not a non-nullable
    /// primitive.
    pub fn type_hash(&self) -> Option<TypeHash> {
        Some(match self {
            Value::Null => return None,
            Value::Unresolvable => primitives::UNRESOLVED,
            Value::Bool(_) => primitives::BOOL,
            Value::I8(_) => primitives::INT8,
            Value::I16(_) => primitives::INT16,
            Value::I32(_) => primitives::INT32,
            Value::I64(_) => primitives::INT64,
            Value::U8(_) => primitives::UINT8,
            Value::U16(_) => primitives::UINT16,
            Value::U32(_) => primitives::UINT32,
            Value::U64(_) => primitives::UINT64,
            Value::F32(_) => primitives::FLOAT,
            Value::F64(_) => primitives::DOUBLE,
            Value::Char(_) => primitives::CHAR,
            Value::Str(_) => primitives::STRING,
            Value::List(_) => primitives::LIST,
            Value::Map(_) => primitives::MAP,
            Value::Object(handle) => handle.type_hash(),
        })
    }

    /// Readable type name for diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Object(handle) => handle.type_name().to_string(),
            other => primitives::name_of(other.type_hash().unwrap_or(TypeHash::EMPTY))
                .unwrap_or("unknown")
                .to_string(),
        }
    }

    /// Whether this is the absent value or the unresolvable sentinel.
    ///
    /// Both count as "no value" for assignment suppression.
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Null | Value::Unresolvable)
    }

    /// Template truthiness: absent and `false` are falsey, all else truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Unresolvable | Value::Bool(false))
    }

    /// Numeric view as `f64`, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match *self {
            Value::I8(v) => v as f64,
            Value::I16(v) => v as f64,
            Value::I32(v) => v as f64,
            Value::I64(v) => v as f64,
            Value::U8(v) => v as f64,
            Value::U16(v) => v as f64,
            Value::U32(v) => v as f64,
            Value::U64(v) => v as f64,
            Value::F32(v) => v as f64,
            Value::F64(v) => v,
            Value::Char(v) => v as u32 as f64,
            _ => return None,
        })
    }

    /// Integer view as `i64`, if an integer variant (or char).
    pub fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            Value::I8(v) => v as i64,
            Value::I16(v) => v as i64,
            Value::I32(v) => v as i64,
            Value::I64(v) => v,
            Value::U8(v) => v as i64,
            Value::U16(v) => v as i64,
            Value::U32(v) => v as i64,
            Value::U64(v) => i64::try_from(v).ok()?,
            Value::Char(v) => v as u32 as i64,
            _ => return None,
        })
    }

    /// Whether this value is a floating-point variant.
    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, Value::F32(_) | Value::F64(_))
    }

    /// Whether this value participates in numeric promotion.
    pub fn is_numeric(&self) -> bool {
        self.type_hash().is_some_and(primitives::is_numeric)
    }

    /// The string written to template output for this value.
    ///
    /// Absent values render as nothing; the unresolvable sentinel is handled
    /// upstream (output nodes substitute the literal source text).
    pub fn render(&self) -> String {
        match self {
            Value::Null | Value::Unresolvable => String::new(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) | (Unresolvable, Unresolvable) => true,
            (Bool(a), Bool(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Object(a), Object(b)) => a.ptr_eq(b),
            // Numerics compare by value across widths; 3i16 == 3i64.
            (a, b) if a.is_numeric() && b.is_numeric() => {
                if a.is_float() || b.is_float() {
                    a.as_f64() == b.as_f64()
                } else {
                    match (a.as_i64(), b.as_i64()) {
                        (Some(x), Some(y)) => x == y,
                        // Only u64 above i64::MAX misses; compare as f64.
                        _ => a.as_f64() == b.as_f64(),
                    }
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Unresolvable => write!(f, "<unresolvable>"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                // Sorted so output is stable across runs.
                let mut keys: Vec<_> = entries.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}={}", entries[*key])?;
                }
                write!(f, "}}")
            }
            Value::Object(handle) => write!(f, "{}", handle.type_name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
