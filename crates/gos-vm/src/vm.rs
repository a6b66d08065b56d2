use gos_ast::ops::{apply_binop, apply_pos, apply_step, apply_unary};
use gos_bc::{Chunk, Opcode};
use gos_lex::{PrimValue, TokenKind};
use smallvec::SmallVec;

use crate::error::{VmError, VmResult};
use crate::io::{parse_input_line, Io};

/// Why execution stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum VmOutcome {
    /// Ran off the end via `HALT` (falling off the top-level script).
    Halted,
    /// Ran `exit <status>`.
    Exited(PrimValue),
}

struct Frame {
    return_ip: usize,
    base_slot: usize,
}

/// Tunable limits for a `Vm` run (§4.6: "implementations may cap [the
/// stack] and report overflow"). The default cap is large enough that no
/// realistic program hits it; `with_max_stack` lowers it for tests that
/// want to observe `VmError::StackOverflow` directly via `Vm::with_config`.
#[derive(Debug, Clone, Copy)]
pub struct VmConfig {
    pub max_stack: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig { max_stack: 1 << 20 }
    }
}

/// The fetch-decode-execute loop over a compiled `Chunk` (§4.6).
///
/// `eval_hook`, when present, is called with the string argument of an
/// `EVAL` instruction and is expected to run it through the whole pipeline
/// (preprocess → lex → parse → optimize → compile → run) and return its
/// result — wiring that back through here would make this crate depend on
/// every earlier phase, so the orchestrator supplies it instead.
pub struct Vm<'c, IO: Io> {
    chunk: &'c Chunk,
    io: IO,
    eval_hook: Option<Box<dyn FnMut(&str) -> VmResult<PrimValue> + 'c>>,
    stack: SmallVec<[PrimValue; 32]>,
    slots: Vec<PrimValue>,
    frames: SmallVec<[Frame; 8]>,
    ip: usize,
    max_stack: usize,
}

impl<'c, IO: Io> Vm<'c, IO> {
    pub fn new(chunk: &'c Chunk, io: IO) -> Self {
        Self::with_config(chunk, io, VmConfig::default())
    }

    pub fn with_config(chunk: &'c Chunk, io: IO, config: VmConfig) -> Self {
        Vm {
            chunk,
            io,
            eval_hook: None,
            stack: SmallVec::new(),
            slots: vec![PrimValue::Unit; chunk.max_slot as usize],
            frames: SmallVec::new(),
            ip: 0,
            max_stack: config.max_stack,
        }
    }

    pub fn with_eval_hook(mut self, hook: impl FnMut(&str) -> VmResult<PrimValue> + 'c) -> Self {
        self.eval_hook = Some(Box::new(hook));
        self
    }

    pub fn into_io(self) -> IO {
        self.io
    }

    pub fn run(&mut self) -> VmResult<VmOutcome> {
        loop {
            let opcode = self.fetch_opcode()?;
            match opcode {
                Opcode::PushConst => {
                    let idx = self.fetch_u8()?;
                    let value = self.chunk.constants.get(idx as usize).ok_or(VmError::ConstantOutOfRange(idx))?.clone();
                    self.push(value)?;
                }
                Opcode::LoadVar => {
                    let slot = self.fetch_u8()?;
                    let value = self.slot(slot)?.clone();
                    self.push(value)?;
                }
                Opcode::StoreVar => {
                    let slot = self.fetch_u8()?;
                    let value = self.peek()?.clone();
                    *self.slot_mut(slot) = value;
                }
                Opcode::Pop => {
                    self.pop()?;
                }

                Opcode::Add => self.binop(TokenKind::Add)?,
                Opcode::Sub => self.binop(TokenKind::Sub)?,
                Opcode::Mul => self.binop(TokenKind::Mul)?,
                Opcode::Div => self.binop(TokenKind::Div)?,
                Opcode::Eq => self.binop(TokenKind::Eq)?,
                Opcode::Ne => self.binop(TokenKind::Ne)?,
                Opcode::Gt => self.binop(TokenKind::Gt)?,
                Opcode::Ge => self.binop(TokenKind::Ge)?,
                Opcode::Lt => self.binop(TokenKind::Lt)?,
                Opcode::Le => self.binop(TokenKind::Le)?,
                Opcode::LogAnd => self.binop(TokenKind::And)?,
                Opcode::LogOr => self.binop(TokenKind::Or)?,
                Opcode::LogXor => self.binop(TokenKind::Xor)?,

                Opcode::Neg => {
                    let a = self.pop()?;
                    self.push(apply_unary(TokenKind::Neg, &a)?)?;
                }
                Opcode::Not => {
                    let a = self.pop()?;
                    self.push(apply_unary(TokenKind::Not, &a)?)?;
                }
                Opcode::Pos => {
                    let a = self.pop()?;
                    self.push(apply_pos(&a))?;
                }
                Opcode::Inc => {
                    let a = self.pop()?;
                    self.push(apply_step(TokenKind::Inc, &a, 1.0)?)?;
                }
                Opcode::Dec => {
                    let a = self.pop()?;
                    self.push(apply_step(TokenKind::Dec, &a, -1.0)?)?;
                }

                Opcode::Jump => {
                    let target = self.fetch_u16()?;
                    self.jump_to(target)?;
                }
                Opcode::JumpIfFalse => {
                    let target = self.fetch_u16()?;
                    let cond = self.pop()?;
                    if !cond.is_truthy() {
                        self.jump_to(target)?;
                    }
                }

                Opcode::Call => {
                    let target = self.fetch_u16()?;
                    let argc = self.fetch_u8()?;
                    self.call(target, argc)?;
                }
                Opcode::Return => {
                    let value = self.pop()?;
                    if let Some(frame) = self.frames.pop() {
                        self.slots.truncate(frame.base_slot);
                        self.ip = frame.return_ip;
                    }
                    self.push(value)?;
                }

                Opcode::Out => {
                    let value = self.pop()?;
                    self.io.write_out(&value);
                }
                Opcode::In => {
                    let slot = self.fetch_u8()?;
                    let value = self.io.read_in().map(|line| parse_input_line(&line)).unwrap_or(PrimValue::Unit);
                    *self.slot_mut(slot) = value.clone();
                    self.push(value)?;
                }

                Opcode::Exit => {
                    let status = self.pop()?;
                    return Ok(VmOutcome::Exited(status));
                }
                Opcode::Eval => {
                    let code = self.pop()?;
                    let PrimValue::Str(src) = code else {
                        return Err(VmError::EvalRequiresString);
                    };
                    let hook = self.eval_hook.as_mut().ok_or(VmError::EvalUnsupported)?;
                    let result = hook(&src)?;
                    self.push(result)?;
                }
                Opcode::Halt => return Ok(VmOutcome::Halted),
            }
        }
    }

    fn base_slot(&self) -> usize {
        self.frames.last().map(|f| f.base_slot).unwrap_or(0)
    }

    fn slot(&self, slot: u8) -> VmResult<&PrimValue> {
        self.slots.get(self.base_slot() + slot as usize).ok_or(VmError::SlotOutOfRange(slot))
    }

    /// Writes never fail: a frame's slot array starts sized to only its
    /// `argc` parameters (§4.6's `CALL` moves just the argument values onto
    /// the slot array) and grows as each further local is declared, so the
    /// first `STORE_VAR` for a given slot always extends it on demand.
    fn slot_mut(&mut self, slot: u8) -> &mut PrimValue {
        let idx = self.base_slot() + slot as usize;
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, PrimValue::Unit);
        }
        &mut self.slots[idx]
    }

    fn push(&mut self, value: PrimValue) -> VmResult<()> {
        if self.stack.len() >= self.max_stack {
            return Err(VmError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> VmResult<PrimValue> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    fn peek(&self) -> VmResult<&PrimValue> {
        self.stack.last().ok_or(VmError::StackUnderflow)
    }

    fn binop(&mut self, op: TokenKind) -> VmResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(apply_binop(op, &a, &b)?)
    }

    fn jump_to(&mut self, target: u16) -> VmResult<()> {
        if target as usize > self.chunk.len() {
            return Err(VmError::InvalidJumpTarget(target));
        }
        self.ip = target as usize;
        Ok(())
    }

    /// `CALL` (§4.6): push a frame, move `argc` values off the stack onto
    /// the end of the slot array as the callee's locals, jump straight to
    /// `target` — no function-table indirection, the same as `JUMP`.
    fn call(&mut self, target: u16, argc: u8) -> VmResult<()> {
        let base = self.slots.len();
        self.slots.resize(base + argc as usize, PrimValue::Unit);
        for i in (0..argc as usize).rev() {
            self.slots[base + i] = self.pop()?;
        }
        self.frames.push(Frame { return_ip: self.ip, base_slot: base });
        self.ip = target as usize;
        Ok(())
    }

    fn fetch_u8(&mut self) -> VmResult<u8> {
        let b = *self.chunk.code.get(self.ip).ok_or(VmError::InvalidJumpTarget(self.ip.min(u16::MAX as usize) as u16))?;
        self.ip += 1;
        Ok(b)
    }

    fn fetch_u16(&mut self) -> VmResult<u16> {
        let hi = self.fetch_u8()?;
        let lo = self.fetch_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn fetch_opcode(&mut self) -> VmResult<Opcode> {
        let byte = self.fetch_u8()?;
        Opcode::from_byte(byte).ok_or(VmError::InvalidOpcode(byte))
    }
}

/// Runs `chunk` to completion with no `eval` support.
pub fn run(chunk: &Chunk, io: impl Io) -> VmResult<(VmOutcome, impl Io)> {
    let mut vm = Vm::new(chunk, io);
    let outcome = vm.run()?;
    Ok((outcome, vm.into_io()))
}
