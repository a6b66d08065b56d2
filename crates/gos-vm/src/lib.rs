//! VM phase (§4.6): executes a compiled `Chunk`.

mod error;
mod io;
mod vm;

pub use error::{VmError, VmResult};
pub use io::{parse_input_line, Io, RecordingIo, StdIo};
pub use vm::{run, Vm, VmConfig, VmOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use gos_compile::compile;
    use gos_lex::PrimValue;
    use gos_opt::optimize;
    use gos_par::parse;

    fn run_src(src: &str) -> (VmOutcome, Vec<PrimValue>) {
        let ast = optimize(parse(src).unwrap());
        let chunk = compile(&ast).unwrap();
        let io = RecordingIo::default();
        let mut vm = Vm::new(&chunk, io);
        let outcome = vm.run().unwrap();
        (outcome, vm.into_io().outputs)
    }

    #[test]
    fn arithmetic() {
        let (outcome, outputs) = run_src("out 1 + 2 * 3");
        assert_eq!(outcome, VmOutcome::Halted);
        assert_eq!(outputs, vec![PrimValue::Number(7.0)]);
    }

    #[test]
    fn while_loop_countdown() {
        let (_, outputs) = run_src("let n = 3 while n > 0 { out n n = n - 1 }");
        assert_eq!(outputs, vec![PrimValue::Number(3.0), PrimValue::Number(2.0), PrimValue::Number(1.0)]);
    }

    #[test]
    fn recursive_fibonacci_via_helper() {
        let (_, outputs) = run_src(
            "fun fib(n) { if n < 2 { return n } return fib(n - 1) + fib(n - 2) } out fib(10)",
        );
        assert_eq!(outputs, vec![PrimValue::Number(55.0)]);
    }

    #[test]
    fn tail_recursive_fib_40_does_not_blow_native_stack() {
        let (_, outputs) = run_src(
            "fun go(n a b) { if n == 0 { return a } return go(n - 1 b a + b) } out go(40 0 1)",
        );
        assert_eq!(outputs, vec![PrimValue::Number(102334155.0)]);
    }

    #[test]
    fn block_expression_value() {
        let (_, outputs) = run_src("out { let a = 1 let b = 2 a + b }");
        assert_eq!(outputs, vec![PrimValue::Number(3.0)]);
    }

    #[test]
    fn label_goto_countdown() {
        let (_, outputs) = run_src("let n = 3 start: out n n = n - 1 if n >= 0 { goto start }");
        assert_eq!(outputs, vec![PrimValue::Number(3.0), PrimValue::Number(2.0), PrimValue::Number(1.0), PrimValue::Number(0.0)]);
    }

    #[test]
    fn exit_halts_with_status() {
        let ast = optimize(parse("exit 7").unwrap());
        let chunk = compile(&ast).unwrap();
        let mut vm = Vm::new(&chunk, RecordingIo::default());
        assert_eq!(vm.run().unwrap(), VmOutcome::Exited(PrimValue::Number(7.0)));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let ast = optimize(parse("let z = 0 out 1 / z").unwrap());
        let chunk = compile(&ast).unwrap();
        let mut vm = Vm::new(&chunk, RecordingIo::default());
        assert!(vm.run().is_err());
    }

    #[test]
    fn stack_underflow_on_malformed_chunk() {
        let mut chunk = gos_bc::Chunk::new();
        chunk.push_u8(gos_bc::Opcode::Pop as u8);
        let mut vm = Vm::new(&chunk, RecordingIo::default());
        assert_eq!(vm.run(), Err(VmError::StackUnderflow));
    }

    #[test]
    fn stack_depth_cap_reports_overflow() {
        let ast = optimize(parse("out 1 + 2").unwrap());
        let chunk = compile(&ast).unwrap();
        let mut vm = Vm::with_config(&chunk, RecordingIo::default(), VmConfig { max_stack: 1 });
        assert_eq!(vm.run(), Err(VmError::StackOverflow));
    }

    #[test]
    fn in_reads_and_stores_input() {
        let ast = optimize(parse("let x = 0 in x out x").unwrap());
        let chunk = compile(&ast).unwrap();
        let io = RecordingIo::with_inputs(["42"]);
        let mut vm = Vm::new(&chunk, io);
        vm.run().unwrap();
        assert_eq!(vm.into_io().outputs, vec![PrimValue::Number(42.0)]);
    }
}
