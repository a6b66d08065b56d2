use std::fmt;

use crate::Span;

/// Which pipeline phase produced a diagnostic.
///
/// Kept as a small closed enum rather than a free-form string so callers can
/// match on it (e.g. the CLI driver exits non-zero uniformly, but a test can
/// still assert "this failure came from the Preprocessor").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preprocessor,
    Lexer,
    Parser,
    Compiler,
    Vm,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Preprocessor => "Preprocessor",
            Phase::Lexer => "Lexer",
            Phase::Parser => "Parser",
            Phase::Compiler => "Compiler",
            Phase::Vm => "VM",
        };
        write!(f, "{name}")
    }
}

/// A fatal, phase-tagged error.
///
/// Every phase's own error enum (`PreprocessError`, `LexError`, `ParseError`,
/// `CompileError`, `VmError`) implements `From<Self> for Diagnostic` so a
/// driver can report any pipeline failure uniformly without needing to know
/// which phase produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Diagnostic { phase, message: message.into(), span: None }
    }

    pub fn at(phase: Phase, message: impl Into<String>, span: Span) -> Self {
        Diagnostic { phase, message: message.into(), span: Some(span) }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}: {} ({span})", self.phase, self.message),
            None => write!(f, "{}: {}", self.phase, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}
