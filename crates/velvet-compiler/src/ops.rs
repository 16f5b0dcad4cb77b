//! Binary operator evaluation.
//!
//! Arithmetic follows the template language's tolerance rules: an absent
//! operand, a non-numeric operand (outside string concatenation), overflow,
//! or division by zero all yield null rather than faulting the render.
//! Comparisons between incomparable values are simply false.

use velvet_core::Value;

/// Binary operator kinds consumed from AST lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Logical operators short-circuit; the evaluator checks this before
    /// evaluating the right operand.
    #[inline]
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Evaluate a binary operation over two already-evaluated operands.
pub fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
            arithmetic(op, left, right)
        }
        BinaryOp::Equal => Value::Bool(left == right),
        BinaryOp::NotEqual => Value::Bool(left != right),
        BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => compare(op, left, right),
        BinaryOp::And => Value::Bool(left.is_truthy() && right.is_truthy()),
        BinaryOp::Or => Value::Bool(left.is_truthy() || right.is_truthy()),
    }
}

fn add(left: &Value, right: &Value) -> Value {
    if left.is_absent() || right.is_absent() {
        return Value::Null;
    }
    if left.is_numeric() && right.is_numeric() {
        return arithmetic(BinaryOp::Add, left, right);
    }
    // String concatenation on either side.
    if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        return Value::Str(format!("{left}{right}"));
    }
    Value::Null
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Value {
    if !left.is_numeric() || !right.is_numeric() {
        return Value::Null;
    }

    // Integer lane unless a float is involved or a u64 exceeds i64 range.
    if !left.is_float() && !right.is_float() {
        if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                BinaryOp::Multiply => a.checked_mul(b),
                BinaryOp::Divide => a.checked_div(b),
                BinaryOp::Modulo => a.checked_rem(b),
                _ => None,
            };
            return result.map(Value::I64).unwrap_or(Value::Null);
        }
    }

    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Value::Null;
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => {
            if b == 0.0 {
                return Value::Null;
            }
            a / b
        }
        BinaryOp::Modulo => {
            if b == 0.0 {
                return Value::Null;
            }
            a % b
        }
        _ => return Value::Null,
    };
    Value::F64(result)
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Value {
    let ordering = if left.is_numeric() && right.is_numeric() {
        match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    } else if let (Value::Str(a), Value::Str(b)) = (left, right) {
        Some(a.cmp(b))
    } else {
        None
    };

    let Some(ordering) = ordering else {
        return Value::Bool(false);
    };
    let holds = match op {
        BinaryOp::LessThan => ordering.is_lt(),
        BinaryOp::LessThanOrEqual => ordering.is_le(),
        BinaryOp::GreaterThan => ordering.is_gt(),
        BinaryOp::GreaterThanOrEqual => ordering.is_ge(),
        _ => false,
    };
    Value::Bool(holds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(eval_binary(BinaryOp::Add, &Value::I32(2), &Value::I16(3)), Value::I64(5));
        assert_eq!(
            eval_binary(BinaryOp::Divide, &Value::I64(7), &Value::I32(2)),
            Value::I64(3)
        );
    }

    #[test]
    fn float_contaminates_the_lane() {
        assert_eq!(
            eval_binary(BinaryOp::Multiply, &Value::I32(2), &Value::F64(1.5)),
            Value::F64(3.0)
        );
    }

    #[test]
    fn failure_yields_null_not_a_fault() {
        assert_eq!(eval_binary(BinaryOp::Divide, &Value::I32(1), &Value::I32(0)), Value::Null);
        assert_eq!(
            eval_binary(BinaryOp::Add, &Value::I64(i64::MAX), &Value::I64(1)),
            Value::Null
        );
        assert_eq!(eval_binary(BinaryOp::Add, &Value::Null, &Value::I32(1)), Value::Null);
        assert_eq!(
            eval_binary(BinaryOp::Subtract, &Value::Str("x".into()), &Value::I32(1)),
            Value::Null
        );
    }

    #[test]
    fn string_concatenation_on_add() {
        assert_eq!(
            eval_binary(BinaryOp::Add, &Value::Str("a".into()), &Value::I32(1)),
            Value::Str("a1".into())
        );
    }

    #[test]
    fn incomparable_comparisons_are_false() {
        assert_eq!(
            eval_binary(BinaryOp::LessThan, &Value::Str("a".into()), &Value::I32(1)),
            Value::Bool(false)
        );
        assert_eq!(
            eval_binary(BinaryOp::LessThan, &Value::Str("a".into()), &Value::Str("b".into())),
            Value::Bool(true)
        );
        assert_eq!(
            eval_binary(BinaryOp::GreaterThan, &Value::I16(4), &Value::F32(3.5)),
            Value::Bool(true)
        );
    }
}
