//! The Serializer (§4.7): a bit-exact binary encoding of a `Chunk`.
//!
//! Framing (lengths, counts, the constant pool) is little-endian
//! throughout, read and written with `byteorder`. Jump/call targets baked
//! into the code stream itself are the one exception: they are written
//! big-endian, matching how the Compiler emits them and the VM reads them
//! directly out of the instruction stream without going through this
//! module.

use std::fmt;
use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use gos_lex::PrimValue;

use crate::chunk::Chunk;

pub const MAGIC: [u8; 4] = [0x47, 0x4F, 0x53, 0x42];
pub const VERSION: u16 = 1;

const TAG_UNIT: u8 = 0;
const TAG_NUMBER: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_STR: u8 = 3;

#[derive(Debug)]
pub enum SerializeError {
    Io(io::Error),
    BadMagic,
    UnsupportedVersion(u16),
    BadConstantTag(u8),
    Utf8,
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::Io(e) => write!(f, "io error: {e}"),
            SerializeError::BadMagic => write!(f, "not a Gos bytecode file (bad magic)"),
            SerializeError::UnsupportedVersion(v) => write!(f, "unsupported bytecode version {v}"),
            SerializeError::BadConstantTag(t) => write!(f, "unknown constant tag {t}"),
            SerializeError::Utf8 => write!(f, "invalid utf-8 in bytecode string"),
        }
    }
}

impl std::error::Error for SerializeError {}

impl From<io::Error> for SerializeError {
    fn from(e: io::Error) -> Self {
        SerializeError::Io(e)
    }
}

pub type SerializeResult<T> = Result<T, SerializeError>;

pub fn write_chunk<W: Write>(mut w: W, chunk: &Chunk) -> SerializeResult<()> {
    w.write_all(&MAGIC)?;
    w.write_u16::<LE>(VERSION)?;

    w.write_u32::<LE>(chunk.code.len() as u32)?;
    w.write_all(&chunk.code)?;

    w.write_u16::<LE>(chunk.constants.len() as u16)?;
    for constant in &chunk.constants {
        write_constant(&mut w, constant)?;
    }

    w.write_u16::<LE>(chunk.max_slot)?;
    Ok(())
}

fn write_constant<W: Write>(w: &mut W, value: &PrimValue) -> SerializeResult<()> {
    match value {
        PrimValue::Unit => {
            w.write_u8(TAG_UNIT)?;
        }
        PrimValue::Number(n) => {
            w.write_u8(TAG_NUMBER)?;
            w.write_f64::<LE>(*n)?;
        }
        PrimValue::Bool(b) => {
            w.write_u8(TAG_BOOL)?;
            w.write_u8(*b as u8)?;
        }
        PrimValue::Str(s) => {
            w.write_u8(TAG_STR)?;
            w.write_u32::<LE>(s.len() as u32)?;
            w.write_all(s.as_bytes())?;
        }
    }
    Ok(())
}

pub fn read_chunk<R: Read>(mut r: R) -> SerializeResult<Chunk> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SerializeError::BadMagic);
    }
    let version = r.read_u16::<LE>()?;
    if version != VERSION {
        return Err(SerializeError::UnsupportedVersion(version));
    }

    let code_len = r.read_u32::<LE>()? as usize;
    let mut code = vec![0u8; code_len];
    r.read_exact(&mut code)?;

    let const_count = r.read_u16::<LE>()?;
    let mut constants = Vec::with_capacity(const_count as usize);
    for _ in 0..const_count {
        constants.push(read_constant(&mut r)?);
    }

    let max_slot = r.read_u16::<LE>()?;

    Ok(Chunk { code, constants, max_slot })
}

fn read_constant<R: Read>(r: &mut R) -> SerializeResult<PrimValue> {
    let tag = r.read_u8()?;
    Ok(match tag {
        TAG_UNIT => PrimValue::Unit,
        TAG_NUMBER => PrimValue::Number(r.read_f64::<LE>()?),
        TAG_BOOL => PrimValue::Bool(r.read_u8()? != 0),
        TAG_STR => {
            let len = r.read_u32::<LE>()? as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            PrimValue::Str(String::from_utf8(buf).map_err(|_| SerializeError::Utf8)?)
        }
        other => return Err(SerializeError::BadConstantTag(other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_empty_chunk() {
        let chunk = Chunk::new();
        let mut buf = Vec::new();
        write_chunk(&mut buf, &chunk).unwrap();
        assert_eq!(read_chunk(&buf[..]).unwrap(), chunk);
    }

    #[test]
    fn round_trips_constants() {
        let mut chunk = Chunk::new();
        chunk.add_constant(PrimValue::Number(42.0));
        chunk.add_constant(PrimValue::Str("hi".into()));
        chunk.add_constant(PrimValue::Bool(true));
        chunk.add_constant(PrimValue::Unit);
        chunk.push_u8(0x1F);
        chunk.max_slot = 5;

        let mut buf = Vec::new();
        write_chunk(&mut buf, &chunk).unwrap();
        assert_eq!(read_chunk(&buf[..]).unwrap(), chunk);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = [0u8; 16];
        assert!(matches!(read_chunk(&bytes[..]), Err(SerializeError::BadMagic)));
    }

    #[test]
    fn rejects_unknown_constant_tag() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // empty code
        buf.extend_from_slice(&1u16.to_le_bytes()); // one constant
        buf.push(0xFF); // unknown tag
        assert!(matches!(read_chunk(&buf[..]), Err(SerializeError::BadConstantTag(0xFF))));
    }

    #[test]
    fn jump_targets_are_big_endian_in_the_code_stream() {
        let mut chunk = Chunk::new();
        chunk.push_u8(0x17); // JUMP
        chunk.push_u16(0x00AB);
        assert_eq!(&chunk.code[1..3], &[0x00, 0xAB]);
    }
}
