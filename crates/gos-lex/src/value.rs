use std::cmp::Ordering;
use std::fmt;

/// The one runtime value type the language has: a 64-bit float doing double
/// duty for integers and floats, a UTF-8 string, a boolean, or unit.
///
/// Numbers are never split into an integer/float pair — §9's open question
/// on `DIV` is resolved in favor of treating every number as an `f64`
/// uniformly, since nothing downstream (Compiler, VM, tree-walker) carries a
/// distinct integer representation.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimValue {
    Number(f64),
    Str(String),
    Bool(bool),
    Unit,
}

impl PrimValue {
    /// §4.6's truthiness table: 0, "", false, and unit are falsy; everything
    /// else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            PrimValue::Number(n) => *n != 0.0,
            PrimValue::Str(s) => !s.is_empty(),
            PrimValue::Bool(b) => *b,
            PrimValue::Unit => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PrimValue::Number(_) => "number",
            PrimValue::Str(_) => "string",
            PrimValue::Bool(_) => "bool",
            PrimValue::Unit => "unit",
        }
    }
}

impl fmt::Display for PrimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            PrimValue::Str(s) => write!(f, "{s}"),
            PrimValue::Bool(b) => write!(f, "{b}"),
            PrimValue::Unit => write!(f, "null"),
        }
    }
}

/// Equality is by value; ordering is only defined between two numbers or
/// two strings (mixed-type or boolean/unit comparisons are a runtime error,
/// reported by whichever caller — Optimizer, VM, or tree-walker — asked for
/// the ordering).
impl PartialEq<f64> for PrimValue {
    fn eq(&self, other: &f64) -> bool {
        matches!(self, PrimValue::Number(n) if n == other)
    }
}

impl PrimValue {
    pub fn partial_cmp_value(&self, other: &PrimValue) -> Option<Ordering> {
        match (self, other) {
            (PrimValue::Number(a), PrimValue::Number(b)) => a.partial_cmp(b),
            (PrimValue::Str(a), PrimValue::Str(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}
