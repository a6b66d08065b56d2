use gos_bc::{Chunk, Opcode};

/// Renders `chunk` in the text format §6 specifies: a header, one line per
/// instruction (`AAAA: OPCODE operands ; annotation`), the constant pool,
/// the code length, and a closing separator.
pub fn disassemble(chunk: &Chunk) -> String {
    let mut out = String::new();
    out.push_str("=== Bytecode ===\n");

    let mut ip = 0usize;
    while ip < chunk.code.len() {
        let addr = ip;
        let Some(opcode) = Opcode::from_byte(chunk.code[ip]) else {
            out.push_str(&format!("{addr:04}: <invalid opcode 0x{:02X}>\n", chunk.code[ip]));
            ip += 1;
            continue;
        };
        ip += 1;

        let (operands, annotation) = match opcode {
            Opcode::PushConst | Opcode::LoadVar | Opcode::StoreVar | Opcode::In => {
                let idx = read_u8(chunk, &mut ip);
                let note = if opcode == Opcode::PushConst {
                    chunk.constants.get(idx as usize).map(|v| format!("{v:?}")).unwrap_or_else(|| "?".to_owned())
                } else {
                    format!("slot {idx}")
                };
                (format!("{idx}"), note)
            }
            Opcode::Jump | Opcode::JumpIfFalse => {
                let target = read_u16(chunk, &mut ip);
                (format!("{target}"), format!("-> {target:04}"))
            }
            Opcode::Call => {
                let target = read_u16(chunk, &mut ip);
                let argc = read_u8(chunk, &mut ip);
                (format!("{target} {argc}"), format!("-> {target:04} argc={argc}"))
            }
            _ => (String::new(), String::new()),
        };

        if annotation.is_empty() {
            out.push_str(&format!("{addr:04}: {}\n", opcode.mnemonic()));
        } else {
            out.push_str(&format!("{addr:04}: {:<14} {:<6} ; {annotation}\n", opcode.mnemonic(), operands));
        }
    }

    out.push_str("--- constants ---\n");
    for (i, value) in chunk.constants.iter().enumerate() {
        out.push_str(&format!("{i:04}: {value:?}\n"));
    }

    out.push_str(&format!("code length: {}\n", chunk.code.len()));
    out.push_str("================\n");
    out
}

fn read_u8(chunk: &Chunk, ip: &mut usize) -> u8 {
    let b = chunk.code[*ip];
    *ip += 1;
    b
}

fn read_u16(chunk: &Chunk, ip: &mut usize) -> u16 {
    let hi = read_u8(chunk, ip);
    let lo = read_u8(chunk, ip);
    u16::from_be_bytes([hi, lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use gos::{compile_source, PrimValue};

    #[test]
    fn disassembles_a_simple_chunk() {
        let chunk = compile_source("out 1 + 2").unwrap();
        let text = disassemble(&chunk);
        assert!(text.starts_with("=== Bytecode ===\n"));
        assert!(text.contains("PUSH_CONST"));
        assert!(text.contains("ADD"));
        assert!(text.contains("OUT"));
        assert!(text.ends_with("================\n"));
    }

    #[test]
    fn annotates_jump_targets_and_constants() {
        let chunk = compile_source("let n = 3 while n > 0 { n-- }").unwrap();
        let text = disassemble(&chunk);
        assert!(text.contains("JUMP_IF_FALSE"));
        assert!(text.contains(&format!("{:?}", PrimValue::Number(3.0))));
    }
}
