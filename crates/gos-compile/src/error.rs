use std::fmt;

use gos_lex::TokenKind;
use gos_util::{Diagnostic, Phase};

/// Errors the Compiler can raise (§7 and §4.5's emission rules): references
/// to names that were never declared, functions called with the wrong
/// arity, a `goto` whose label is never defined anywhere in the program,
/// two functions sharing a name, `++`/`--` over a non-variable operand, and
/// the two forms of table exhaustion (more locals or call arguments than
/// the encoding can address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    UndefinedVariable(String),
    UndefinedFunction(String),
    UndefinedLabel(String),
    DuplicateFunction(String),
    InvalidIncDecOperand,
    ArityMismatch { name: String, expected: u8, found: usize },
    TooManyLocals,
    TooManyArgs,
    UnsupportedOperator(TokenKind),
    CodeTooLarge,
    TooManyConstants,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UndefinedVariable(name) => write!(f, "undefined variable '{name}'"),
            CompileError::UndefinedFunction(name) => write!(f, "undefined function '{name}'"),
            CompileError::UndefinedLabel(name) => write!(f, "goto references undefined label '{name}'"),
            CompileError::DuplicateFunction(name) => write!(f, "function '{name}' declared more than once"),
            CompileError::InvalidIncDecOperand => write!(f, "'++'/'--' can only apply to a variable"),
            CompileError::ArityMismatch { name, expected, found } => {
                write!(f, "function '{name}' expects {expected} argument(s), got {found}")
            }
            CompileError::TooManyLocals => write!(f, "too many local variables in one function"),
            CompileError::TooManyArgs => write!(f, "too many arguments in one call"),
            CompileError::UnsupportedOperator(op) => write!(f, "operator {op:?} has no bytecode form"),
            CompileError::CodeTooLarge => write!(f, "chunk code exceeds the 65,536-byte addressable limit"),
            CompileError::TooManyConstants => write!(f, "more than 256 distinct constants in one chunk"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<CompileError> for Diagnostic {
    fn from(err: CompileError) -> Self {
        Diagnostic::new(Phase::Compiler, err.to_string())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
