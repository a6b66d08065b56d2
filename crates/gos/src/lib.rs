//! Thin orchestration layer tying every phase crate together into the
//! pipelines `gos-cli` drives (§6): preprocess → lex → parse → optimize →
//! compile → run, plus the tree-walking alternative that backs `interpret`
//! and `repl`.
//!
//! Neither `gos-vm` nor `gos-twi` depends on the earlier phases (so each
//! stays testable alone); this crate is where the `eval` opcode/node is
//! wired back up to the full pipeline, since `eval`'s string argument is
//! itself Gos source (§9: "the eval opcode executes a string in the host
//! environment").

mod error;

use std::path::Path;

pub use error::{GosError, GosResult};

pub use gos_ast::Node;
pub use gos_bc::Chunk;
pub use gos_compile::CompileError;
pub use gos_lex::PrimValue;
pub use gos_opt::optimize;
pub use gos_par::ParseError;
pub use gos_pre::{PreprocessError, PreprocessorConfig};
pub use gos_twi::{Interpreter, TwiError, TwiOutcome};
pub use gos_vm::{Vm, VmConfig, VmError, VmOutcome};

/// Re-exported so callers building either executor's `Io` impl (e.g.
/// `gos-cli`'s stdio adapters) only need to depend on this crate.
pub use gos_vm::{Io as VmIo, RecordingIo as VmRecordingIo, StdIo as VmStdIo};
pub use gos_twi::{Io as TwiIo, RecordingIo as TwiRecordingIo, StdIo as TwiStdIo};

/// Preprocesses the file at `entry_path` (§4.1), following `$import`s.
pub fn preprocess_file(entry_path: &Path, config: &PreprocessorConfig) -> GosResult<String> {
    Ok(gos_pre::preprocess(entry_path, config)?)
}

/// Parses `source` into a raw (unoptimized) AST. Used by the `ast` dump and
/// by `eval`, which has no file of its own to preprocess.
pub fn parse_ast(source: &str) -> GosResult<Node> {
    Ok(gos_par::parse(source)?)
}

/// Parses and constant-folds `source` into the AST the Compiler and
/// tree-walker both consume.
pub fn parse_optimized(source: &str) -> GosResult<Node> {
    Ok(optimize(gos_par::parse(source)?))
}

/// Runs the full preprocess → lex → parse → optimize → compile pipeline
/// over the file at `entry_path`, producing a `Chunk`.
pub fn compile_file(entry_path: &Path, config: &PreprocessorConfig) -> GosResult<Chunk> {
    let source = preprocess_file(entry_path, config)?;
    compile_source(&source)
}

/// Lex → parse → optimize → compile a source string directly (no
/// preprocessing), for sources that don't come from a file on disk.
pub fn compile_source(source: &str) -> GosResult<Chunk> {
    let ast = parse_optimized(source)?;
    Ok(gos_compile::compile(&ast)?)
}

/// Runs `chunk` on the bytecode VM, with `EVAL` wired to recurse back
/// through this pipeline (lex → parse → optimize → interpret; see
/// `eval_str`'s doc comment for why the tree-walker runs it rather than a
/// nested VM).
pub fn run_chunk(chunk: &Chunk, io: impl VmIo, config: VmConfig) -> GosResult<(VmOutcome, impl VmIo)> {
    let mut vm = Vm::with_config(chunk, io, config).with_eval_hook(|src| eval_str(src).map_err(|_| VmError::EvalUnsupported));
    let outcome = vm.run()?;
    Ok((outcome, vm.into_io()))
}

/// Preprocesses and compiles the file at `entry_path`, then runs it on the
/// VM.
pub fn run_file(entry_path: &Path, config: &PreprocessorConfig, io: impl VmIo, vm_config: VmConfig) -> GosResult<(VmOutcome, impl VmIo)> {
    let chunk = compile_file(entry_path, config)?;
    run_chunk(&chunk, io, vm_config)
}

/// Runs `source` through the tree-walking reference interpreter (§4.8),
/// with `eval` wired the same way as `run_chunk`.
pub fn interpret_source(source: &str, io: impl TwiIo) -> GosResult<(TwiOutcome, impl TwiIo)> {
    let ast = parse_optimized(source)?;
    let mut interp = Interpreter::new(&ast, io)?.with_eval_hook(|src| eval_str(src).map_err(|_| TwiError::EvalUnsupported));
    let outcome = interp.run(&ast)?;
    Ok((outcome, interp.into_io()))
}

/// Preprocesses and interprets the file at `entry_path`.
pub fn interpret_file(entry_path: &Path, config: &PreprocessorConfig, io: impl TwiIo) -> GosResult<(TwiOutcome, impl TwiIo)> {
    let source = preprocess_file(entry_path, config)?;
    interpret_source(&source, io)
}

/// Backs the `EVAL` opcode/node (§4.6, §9): parses and runs `source` as a
/// nested program, always through the tree-walker regardless of which
/// executor is running the *outer* program, since only the tree-walker's
/// `TwiOutcome::Completed` carries the nested program's last-expression
/// value back out. `eval`'d code gets its own `out`/`in` stream rather than
/// sharing the caller's, since the hook signature (`FnMut(&str) -> Result`)
/// has no io handle to share; an `exit` reached inside the evaluated string
/// surfaces as that value too (§9: eval is unsandboxed best-effort, not a
/// fully isolated sub-process).
pub fn eval_str(source: &str) -> GosResult<PrimValue> {
    let ast = parse_optimized(source)?;
    let mut interp = Interpreter::new(&ast, TwiRecordingIo::default())?;
    match interp.run(&ast)? {
        TwiOutcome::Completed(v) | TwiOutcome::Exited(v) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm_outputs(src: &str) -> Vec<PrimValue> {
        let chunk = compile_source(src).unwrap();
        let (_, io) = run_chunk(&chunk, VmRecordingIo::default(), VmConfig::default()).unwrap();
        io.outputs
    }

    fn twi_outputs(src: &str) -> Vec<PrimValue> {
        let (_, io) = interpret_source(src, TwiRecordingIo::default()).unwrap();
        io.outputs
    }

    // The six §8 concrete scenarios, run through both executors to confirm
    // parity between the VM and the tree-walking reference.
    const SCENARIOS: &[(&str, &[f64])] = &[
        ("let x = (1 + 2) * 3 out x", &[9.0]),
        ("let n = 10 while (n > 0) { out n n-- }", &[10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]),
        (
            "fun f(x) { if (x <= 1) return x else { let a = 0 let b = 1 while (x > 1) { let tmp = a + b a = b b = tmp x-- } return b } } out f(10)",
            &[55.0],
        ),
        ("fun fib(n a b) { if n == 0 return a return fib(n - 1 b a + b) } out fib(40 0 1)", &[102334155.0]),
        ("let x = { let a = 1 let b = 2 a + b } out x", &[3.0]),
        ("let n = 3 label: out n n-- if n != 0 goto label", &[3.0, 2.0, 1.0]),
    ];

    #[test]
    fn scenarios_agree_between_vm_and_tree_walker() {
        for (src, expected) in SCENARIOS {
            let expected: Vec<PrimValue> = expected.iter().map(|n| PrimValue::Number(*n)).collect();
            assert_eq!(vm_outputs(src), expected, "vm mismatch for {src:?}");
            assert_eq!(twi_outputs(src), expected, "tree-walker mismatch for {src:?}");
        }
    }

    #[test]
    fn eval_runs_nested_source_and_returns_its_value() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), PrimValue::Number(7.0));
    }

    #[test]
    fn vm_eval_opcode_delegates_to_tree_walker() {
        let outputs = vm_outputs(r#"out eval "1 + 1""#);
        assert_eq!(outputs, vec![PrimValue::Number(2.0)]);
    }

    #[test]
    fn undefined_variable_is_a_compile_error() {
        assert!(matches!(compile_source("out missing"), Err(GosError::Compile(CompileError::UndefinedVariable(_)))));
    }

    #[test]
    fn unclosed_paren_is_a_parse_error() {
        assert!(matches!(compile_source("out (1 + 2"), Err(GosError::Parse(_))));
    }
}
