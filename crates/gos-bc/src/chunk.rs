use gos_lex::PrimValue;

/// A fully compiled program (§3): a triple of instruction stream, constant
/// pool, and the top-level script's local slot count. Function
/// addresses/arities are Compiler-internal state (§4.5's per-scope function
/// table) baked directly into each `CALL`'s operand, not carried here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<PrimValue>,
    pub max_slot: u16,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    pub fn push_u8(&mut self, byte: u8) {
        self.code.push(byte);
    }

    /// Writes `value` big-endian (§4.6: jump/call targets and indices are
    /// big-endian in the code stream regardless of the file's framing
    /// endianness).
    pub fn push_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Patches a previously-emitted `u16` target at `offset`.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        self.code[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub fn add_constant(&mut self, value: PrimValue) -> u16 {
        if let Some(idx) = self.constants.iter().position(|c| c == &value) {
            return idx as u16;
        }
        let idx = self.constants.len();
        self.constants.push(value);
        idx as u16
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}
