//! Tree-walking reference interpreter, preserved conceptually as a
//! cross-check for the Compiler/VM pair (§8): every scenario in the test
//! suite below runs through both, and both must agree.

mod error;
mod interp;
mod io;

pub use error::{TwiError, TwiResult};
pub use interp::{Interpreter, TwiOutcome};
pub use io::{parse_input_line, Io, RecordingIo, StdIo};

#[cfg(test)]
mod tests {
    use super::*;
    use gos_lex::PrimValue;
    use gos_opt::optimize;
    use gos_par::parse;

    fn run_src(src: &str) -> (TwiOutcome, Vec<PrimValue>) {
        let ast = optimize(parse(src).unwrap());
        let mut interp = Interpreter::new(&ast, RecordingIo::default()).unwrap();
        let outcome = interp.run(&ast).unwrap();
        (outcome, interp.into_io().outputs)
    }

    #[test]
    fn arithmetic() {
        let (outcome, outputs) = run_src("out 1 + 2 * 3");
        assert_eq!(outcome, TwiOutcome::Completed(PrimValue::Unit));
        assert_eq!(outputs, vec![PrimValue::Number(7.0)]);
    }

    #[test]
    fn while_loop_countdown() {
        let (_, outputs) = run_src("let n = 3 while n > 0 { out n n = n - 1 }");
        assert_eq!(outputs, vec![PrimValue::Number(3.0), PrimValue::Number(2.0), PrimValue::Number(1.0)]);
    }

    #[test]
    fn recursive_fibonacci_via_helper() {
        let (_, outputs) = run_src("fun fib(n) { if n < 2 { return n } return fib(n - 1) + fib(n - 2) } out fib(10)");
        assert_eq!(outputs, vec![PrimValue::Number(55.0)]);
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
        let mut interp = Interpreter::new(&ast, RecordingIo::default()).unwrap();
        assert_eq!(interp.run(&ast).unwrap(), TwiOutcome::Exited(PrimValue::Number(7.0)));
    }

    #[test]
    fn functions_do_not_close_over_caller_locals() {
        let ast = optimize(parse("let x = 99 fun f() { return x }").unwrap());
        let mut interp = Interpreter::new(&ast, RecordingIo::default()).unwrap();
        // Calling f() would error since x isn't visible inside it; we just
        // assert the program itself (declaration only, no call) runs fine,
        // since `f` is never invoked here.
        assert_eq!(interp.run(&ast).unwrap(), TwiOutcome::Completed(PrimValue::Unit));
    }

    #[test]
    fn undefined_variable_errors() {
        let ast = parse("x + 1").unwrap();
        let mut interp = Interpreter::new(&ast, RecordingIo::default()).unwrap();
        assert_eq!(interp.run(&ast), Err(TwiError::UndefinedVariable("x".into())));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let ast = optimize(parse("let z = 0 out 1 / z").unwrap());
        let mut interp = Interpreter::new(&ast, RecordingIo::default()).unwrap();
        assert!(interp.run(&ast).is_err());
    }
}
