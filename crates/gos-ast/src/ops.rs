use std::fmt;

use gos_lex::{PrimValue, TokenKind};

/// Runtime operator semantics, shared by the Optimizer (constant folding),
/// the Compiler/VM pair, and the tree-walking reference interpreter.
///
/// Sharing one implementation is what makes the "constant-folding
/// equivalence" property in §8 a structural guarantee rather than something
/// that has to be kept in sync by hand across three call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpError {
    DivByZero,
    TypeMismatch { op: TokenKind },
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpError::DivByZero => write!(f, "division by zero"),
            OpError::TypeMismatch { op } => write!(f, "type mismatch for operator {op:?}"),
        }
    }
}

fn truncate_i64(n: f64) -> i64 {
    n.trunc() as i64
}

/// Evaluates a binary operator over two already-evaluated operands.
///
/// `&&`/`||` (the comparison-level tokens) and `&`/`|` (the logical-level
/// tokens) share the same non-short-circuiting bitwise-over-truncated-i64
/// semantics as the VM's `LOG_AND`/`LOG_OR` opcodes — §5 guarantees every
/// `BinOp` evaluates both operands regardless of which spelling was used,
/// so there is no short-circuit distinction to preserve.
pub fn apply_binop(op: TokenKind, left: &PrimValue, right: &PrimValue) -> Result<PrimValue, OpError> {
    use PrimValue::*;
    use TokenKind as T;
    match op {
        T::Add => match (left, right) {
            (Number(a), Number(b)) => Ok(Number(a + b)),
            (Str(a), Str(b)) => Ok(Str(format!("{a}{b}"))),
            _ => Err(OpError::TypeMismatch { op }),
        },
        T::Sub => numeric_binop(op, left, right, |a, b| a - b),
        T::Mul => numeric_binop(op, left, right, |a, b| a * b),
        T::Div => match (left, right) {
            (Number(_), Number(b)) if *b == 0.0 => Err(OpError::DivByZero),
            (Number(a), Number(b)) => Ok(Number(a / b)),
            _ => Err(OpError::TypeMismatch { op }),
        },
        T::Eq => Ok(Bool(values_equal(left, right))),
        T::Ne => Ok(Bool(!values_equal(left, right))),
        T::Gt => compare(op, left, right, |o| o == std::cmp::Ordering::Greater),
        T::Ge => compare(op, left, right, |o| o != std::cmp::Ordering::Less),
        T::Lt => compare(op, left, right, |o| o == std::cmp::Ordering::Less),
        T::Le => compare(op, left, right, |o| o != std::cmp::Ordering::Greater),
        T::And | T::BitAnd => bitwise(op, left, right, |a, b| a & b),
        T::Or | T::BitOr => bitwise(op, left, right, |a, b| a | b),
        T::Xor => bitwise(op, left, right, |a, b| a ^ b),
        _ => Err(OpError::TypeMismatch { op }),
    }
}

fn numeric_binop(op: TokenKind, left: &PrimValue, right: &PrimValue, f: impl Fn(f64, f64) -> f64) -> Result<PrimValue, OpError> {
    match (left, right) {
        (PrimValue::Number(a), PrimValue::Number(b)) => Ok(PrimValue::Number(f(*a, *b))),
        _ => Err(OpError::TypeMismatch { op }),
    }
}

fn bitwise(op: TokenKind, left: &PrimValue, right: &PrimValue, f: impl Fn(i64, i64) -> i64) -> Result<PrimValue, OpError> {
    match (left, right) {
        (PrimValue::Number(a), PrimValue::Number(b)) => Ok(PrimValue::Number(f(truncate_i64(*a), truncate_i64(*b)) as f64)),
        _ => Err(OpError::TypeMismatch { op }),
    }
}

fn compare(op: TokenKind, left: &PrimValue, right: &PrimValue, f: impl Fn(std::cmp::Ordering) -> bool) -> Result<PrimValue, OpError> {
    match left.partial_cmp_value(right) {
        Some(ord) => Ok(PrimValue::Bool(f(ord))),
        None => Err(OpError::TypeMismatch { op }),
    }
}

fn values_equal(left: &PrimValue, right: &PrimValue) -> bool {
    match (left, right) {
        (PrimValue::Number(a), PrimValue::Number(b)) => a == b,
        (PrimValue::Str(a), PrimValue::Str(b)) => a == b,
        (PrimValue::Bool(a), PrimValue::Bool(b)) => a == b,
        (PrimValue::Unit, PrimValue::Unit) => true,
        _ => false,
    }
}

/// Evaluates the two unary operators the Optimizer is allowed to fold
/// through: negation and logical-not. `Pos`/`Inc`/`Dec` are never folded
/// (§4.4: "must not fold through nodes whose op is not explicitly listed
/// above") and are handled directly by the Compiler/VM/tree-walker instead.
pub fn apply_unary(op: TokenKind, arg: &PrimValue) -> Result<PrimValue, OpError> {
    match op {
        TokenKind::Neg => match arg {
            PrimValue::Number(n) => Ok(PrimValue::Number(-n)),
            _ => Err(OpError::TypeMismatch { op }),
        },
        TokenKind::Not => Ok(PrimValue::Bool(!arg.is_truthy())),
        _ => Err(OpError::TypeMismatch { op }),
    }
}

/// `POS` is a no-op over any value (VM §4.6: "kept for symmetry").
pub fn apply_pos(arg: &PrimValue) -> PrimValue {
    arg.clone()
}

/// `INC`/`DEC`: numeric increment/decrement by one, yielding the updated
/// value (§9 open question: resolved as pre-increment-style, matching the
/// VM's "unary over top-of-stack" wording — there is no separate "old
/// value" slot for a post-increment reading).
pub fn apply_step(op: TokenKind, arg: &PrimValue, delta: f64) -> Result<PrimValue, OpError> {
    match arg {
        PrimValue::Number(n) => Ok(PrimValue::Number(n + delta)),
        _ => Err(OpError::TypeMismatch { op }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gos_lex::PrimValue::*;

    #[test]
    fn add_numbers_and_strings() {
        assert_eq!(apply_binop(TokenKind::Add, &Number(1.0), &Number(2.0)), Ok(Number(3.0)));
        assert_eq!(
            apply_binop(TokenKind::Add, &Str("a".into()), &Str("b".into())),
            Ok(Str("ab".into()))
        );
    }

    #[test]
    fn div_by_zero_errors() {
        assert_eq!(apply_binop(TokenKind::Div, &Number(1.0), &Number(0.0)), Err(OpError::DivByZero));
    }

    #[test]
    fn comparisons() {
        assert_eq!(apply_binop(TokenKind::Lt, &Number(1.0), &Number(2.0)), Ok(Bool(true)));
        assert_eq!(apply_binop(TokenKind::Ge, &Number(2.0), &Number(2.0)), Ok(Bool(true)));
        assert_eq!(apply_binop(TokenKind::Lt, &Str("a".into()), &Str("b".into())), Ok(Bool(true)));
    }

    #[test]
    fn bitwise_over_truncated_numbers() {
        assert_eq!(apply_binop(TokenKind::BitAnd, &Number(6.0), &Number(3.0)), Ok(Number(2.0)));
        assert_eq!(apply_binop(TokenKind::BitOr, &Number(4.0), &Number(1.0)), Ok(Number(5.0)));
        assert_eq!(apply_binop(TokenKind::Xor, &Number(5.0), &Number(3.0)), Ok(Number(6.0)));
    }

    #[test]
    fn unary_neg_and_not() {
        assert_eq!(apply_unary(TokenKind::Neg, &Number(4.0)), Ok(Number(-4.0)));
        assert_eq!(apply_unary(TokenKind::Not, &Bool(false)), Ok(Bool(true)));
        assert_eq!(apply_unary(TokenKind::Not, &Number(0.0)), Ok(Bool(true)));
    }

    #[test]
    fn type_mismatch_on_mixed_operands() {
        assert_eq!(
            apply_binop(TokenKind::Add, &Number(1.0), &Str("x".into())),
            Err(OpError::TypeMismatch { op: TokenKind::Add })
        );
    }
}
