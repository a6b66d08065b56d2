use std::fmt;

use gos_compile::CompileError;
use gos_par::ParseError;
use gos_pre::PreprocessError;
use gos_twi::TwiError;
use gos_util::Diagnostic;
use gos_vm::VmError;

/// Union of every phase's error type (§7), so a caller driving the whole
/// pipeline can propagate with a single `?` instead of matching on which
/// phase failed. Each variant still converts into a phase-tagged
/// `Diagnostic` the same way its inner error would on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum GosError {
    Preprocess(PreprocessError),
    Parse(ParseError),
    Compile(CompileError),
    Vm(VmError),
    Twi(TwiError),
}

impl fmt::Display for GosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GosError::Preprocess(e) => write!(f, "{e}"),
            GosError::Parse(e) => write!(f, "{e}"),
            GosError::Compile(e) => write!(f, "{e}"),
            GosError::Vm(e) => write!(f, "{e}"),
            GosError::Twi(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GosError {}

impl From<PreprocessError> for GosError {
    fn from(err: PreprocessError) -> Self {
        GosError::Preprocess(err)
    }
}

impl From<ParseError> for GosError {
    fn from(err: ParseError) -> Self {
        GosError::Parse(err)
    }
}

impl From<CompileError> for GosError {
    fn from(err: CompileError) -> Self {
        GosError::Compile(err)
    }
}

impl From<VmError> for GosError {
    fn from(err: VmError) -> Self {
        GosError::Vm(err)
    }
}

impl From<TwiError> for GosError {
    fn from(err: TwiError) -> Self {
        GosError::Twi(err)
    }
}

impl From<GosError> for Diagnostic {
    fn from(err: GosError) -> Self {
        match err {
            GosError::Preprocess(e) => e.into(),
            GosError::Parse(e) => e.into(),
            GosError::Compile(e) => e.into(),
            GosError::Vm(e) => e.into(),
            GosError::Twi(e) => e.into(),
        }
    }
}

pub type GosResult<T> = Result<T, GosError>;
