//! The fixed primitive widening table.
//!
//! Signed and unsigned integers widen to strictly larger integers of a
//! signedness that can represent every source value, every integer widens to
//! both float widths, char widens like a 32-bit scalar, and f32 widens to
//! f64. Narrowing is never implicit.

use velvet_core::type_hash::primitives::*;
use velvet_core::{TypeHash, Value};

/// Whether `from` implicitly widens to `to`.
pub fn is_widening(from: TypeHash, to: TypeHash) -> bool {
    let targets: &[TypeHash] = match from {
        INT8 => &[INT16, INT32, INT64, FLOAT, DOUBLE],
        UINT8 => &[INT16, UINT16, INT32, UINT32, INT64, UINT64, FLOAT, DOUBLE],
        INT16 => &[INT32, INT64, FLOAT, DOUBLE],
        UINT16 => &[INT32, UINT32, INT64, UINT64, FLOAT, DOUBLE],
        INT32 => &[INT64, FLOAT, DOUBLE],
        UINT32 => &[INT64, UINT64, FLOAT, DOUBLE],
        INT64 => &[FLOAT, DOUBLE],
        UINT64 => &[FLOAT, DOUBLE],
        // char is a 32-bit scalar here, so 16-bit targets are excluded.
        CHAR => &[INT32, UINT32, INT64, UINT64, FLOAT, DOUBLE],
        FLOAT => &[DOUBLE],
        _ => return false,
    };
    targets.contains(&to)
}

/// Apply a widening to a runtime value.
///
/// Returns `None` when the pair is not in the table (callers fall back to
/// passing the value through untouched, which is correct for identity and
/// reference widenings).
pub fn widen_value(value: &Value, to: TypeHash) -> Option<Value> {
    let from = value.type_hash()?;
    if from == to {
        return Some(value.clone());
    }
    if !is_widening(from, to) {
        return None;
    }

    // Every table entry is loss-free, so going through the i64/f64 views
    // cannot truncate.
    Some(match to {
        INT16 => Value::I16(value.as_i64()? as i16),
        UINT16 => Value::U16(value.as_i64()? as u16),
        INT32 => Value::I32(value.as_i64()? as i32),
        UINT32 => Value::U32(value.as_i64()? as u32),
        INT64 => Value::I64(value.as_i64()?),
        UINT64 => Value::U64(value.as_i64()? as u64),
        FLOAT => Value::F32(value.as_f64()? as f32),
        DOUBLE => Value::F64(value.as_f64()?),
        _ => return None,
    })
}
