//! Compiler phase (§4.5): lowers an AST into a `gos_bc::Chunk`.

mod compiler;
mod error;

pub use compiler::compile;
pub use error::{CompileError, CompileResult};

#[cfg(test)]
mod tests {
    use super::*;
    use gos_bc::Opcode;
    use gos_lex::PrimValue;
    use gos_par::parse;

    fn compiled(src: &str) -> gos_bc::Chunk {
        let ast = parse(src).unwrap();
        compile(&ast).unwrap()
    }

    #[test]
    fn constants_are_deduplicated() {
        let chunk = compiled("1 1 1");
        assert_eq!(chunk.constants.iter().filter(|c| **c == PrimValue::Number(1.0)).count(), 1);
    }

    #[test]
    fn var_decl_then_use() {
        let chunk = compiled("let x = 1 x + 1");
        assert!(chunk.code.contains(&(Opcode::StoreVar as u8)));
        assert!(chunk.code.contains(&(Opcode::LoadVar as u8)));
    }

    #[test]
    fn undefined_variable_errors() {
        let ast = parse("x + 1").unwrap();
        assert_eq!(compile(&ast), Err(CompileError::UndefinedVariable("x".into())));
    }

    #[test]
    fn inc_over_non_variable_errors() {
        let ast = gos_ast::Node::Program {
            body: vec![gos_ast::Node::UnaryOp {
                op: gos_lex::TokenKind::Inc,
                argument: Box::new(gos_ast::Node::Val { value: PrimValue::Number(1.0) }),
            }],
        };
        assert_eq!(compile(&ast), Err(CompileError::InvalidIncDecOperand));
    }

    #[test]
    fn forward_call_to_later_declared_function_compiles() {
        let chunk = compiled("out f(1) fun f(n) { return n }");
        assert!(chunk.code.contains(&(Opcode::Call as u8)));
        assert!(chunk.code.contains(&(Opcode::Return as u8)));
    }

    #[test]
    fn undefined_label_errors() {
        let ast = parse("goto nope").unwrap();
        assert_eq!(compile(&ast), Err(CompileError::UndefinedLabel("nope".into())));
    }

    #[test]
    fn backward_goto_resolves() {
        let chunk = compiled("start: out 1 goto start");
        assert!(chunk.code.contains(&(Opcode::Jump as u8)));
    }

    #[test]
    fn duplicate_function_errors() {
        let ast = parse("fun f() { return 1 } fun f() { return 2 }").unwrap();
        assert_eq!(compile(&ast), Err(CompileError::DuplicateFunction("f".into())));
    }

    #[test]
    fn wrong_arity_call_errors() {
        let ast = parse("fun f(a b) { return a } f(1)").unwrap();
        assert_eq!(compile(&ast), Err(CompileError::ArityMismatch { name: "f".into(), expected: 2, found: 1 }));
    }
}
