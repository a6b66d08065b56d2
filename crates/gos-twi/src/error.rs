use std::fmt;

use gos_ast::ops::OpError;
use gos_util::{Diagnostic, Phase};

/// Errors the reference tree-walking interpreter can raise. Shares its
/// vocabulary with `gos_compile::CompileError` where the underlying problem
/// is the same (undefined name, wrong arity, a `++`/`--` over a
/// non-variable) even though here they surface at run time rather than
/// compile time, since the interpreter does no separate static pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwiError {
    UndefinedVariable(String),
    UndefinedFunction(String),
    UndefinedLabel(String),
    DuplicateFunction(String),
    InvalidIncDecOperand,
    ArityMismatch { name: String, expected: usize, found: usize },
    UnexpectedControlFlow,
    EvalRequiresString,
    EvalUnsupported,
    Op(OpError),
}

impl fmt::Display for TwiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TwiError::UndefinedVariable(name) => write!(f, "undefined variable '{name}'"),
            TwiError::UndefinedFunction(name) => write!(f, "undefined function '{name}'"),
            TwiError::UndefinedLabel(name) => write!(f, "goto references undefined label '{name}'"),
            TwiError::DuplicateFunction(name) => write!(f, "function '{name}' declared more than once"),
            TwiError::InvalidIncDecOperand => write!(f, "'++'/'--' can only apply to a variable"),
            TwiError::ArityMismatch { name, expected, found } => {
                write!(f, "function '{name}' expects {expected} argument(s), got {found}")
            }
            TwiError::UnexpectedControlFlow => write!(f, "'return'/'exit'/'goto' used where a value was expected"),
            TwiError::EvalRequiresString => write!(f, "eval requires a string operand"),
            TwiError::EvalUnsupported => write!(f, "this interpreter was not given an eval hook"),
            TwiError::Op(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TwiError {}

impl From<OpError> for TwiError {
    fn from(err: OpError) -> Self {
        TwiError::Op(err)
    }
}

impl From<TwiError> for Diagnostic {
    fn from(err: TwiError) -> Self {
        Diagnostic::new(Phase::Vm, err.to_string())
    }
}

pub type TwiResult<T> = Result<T, TwiError>;
