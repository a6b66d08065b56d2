//! Bytecode definitions (§4.6) and the Serializer (§4.7) shared by the
//! Compiler and the VM.

mod chunk;
mod opcode;
mod serialize;

pub use chunk::Chunk;
pub use opcode::Opcode;
pub use serialize::{read_chunk, write_chunk, SerializeError, SerializeResult, MAGIC, VERSION};
