use std::fmt;

use gos_ast::ops::OpError;
use gos_util::{Diagnostic, Phase};

/// Failure modes the VM can hit while executing an otherwise-valid `Chunk`
/// (§4.6): stack underflow, an unrecognized opcode byte, a jump outside the
/// code array, a slot index past the frame's local count, and the
/// operator-level errors (`DivByZero`/`TypeMismatch`) shared with the
/// Optimizer and tree-walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    StackUnderflow,
    StackOverflow,
    InvalidOpcode(u8),
    InvalidJumpTarget(u16),
    SlotOutOfRange(u8),
    ConstantOutOfRange(u8),
    EvalRequiresString,
    EvalUnsupported,
    Op(OpError),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::StackUnderflow => write!(f, "operand stack underflow"),
            VmError::StackOverflow => write!(f, "operand stack exceeded its configured depth cap"),
            VmError::InvalidOpcode(b) => write!(f, "invalid opcode byte 0x{b:02X}"),
            VmError::InvalidJumpTarget(t) => write!(f, "jump target {t} is outside the code array"),
            VmError::SlotOutOfRange(s) => write!(f, "slot {s} is out of range for the current frame"),
            VmError::ConstantOutOfRange(i) => write!(f, "constant index {i} is out of range"),
            VmError::EvalRequiresString => write!(f, "eval requires a string operand"),
            VmError::EvalUnsupported => write!(f, "this VM was not given an eval hook"),
            VmError::Op(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for VmError {}

impl From<OpError> for VmError {
    fn from(err: OpError) -> Self {
        VmError::Op(err)
    }
}

impl From<VmError> for Diagnostic {
    fn from(err: VmError) -> Self {
        Diagnostic::new(Phase::Vm, err.to_string())
    }
}

pub type VmResult<T> = Result<T, VmError>;
