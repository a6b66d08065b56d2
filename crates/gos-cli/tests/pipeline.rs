use std::fs;

use gos::{PreprocessorConfig, TwiOutcome, TwiRecordingIo, VmConfig, VmOutcome, VmRecordingIo};

fn write_source(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn compile_run_and_disassemble_round_trip_through_a_gbc_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "main.gos", "let x = (1 + 2) * 3 out x");

    let chunk = gos::compile_file(&src, &PreprocessorConfig::default()).unwrap();
    let mut bytes = Vec::new();
    gos_bc::write_chunk(&mut bytes, &chunk).unwrap();
    let gbc_path = src.with_extension("gbc");
    fs::write(&gbc_path, &bytes).unwrap();

    let reloaded = gos_bc::read_chunk(&fs::read(&gbc_path).unwrap()[..]).unwrap();
    assert_eq!(reloaded, chunk);

    let (outcome, io) = gos::run_chunk(&reloaded, VmRecordingIo::default(), VmConfig::default()).unwrap();
    assert_eq!(outcome, VmOutcome::Halted);
    assert_eq!(io.outputs, vec![gos::PrimValue::Number(9.0)]);
}

#[test]
fn run_file_preprocesses_imports_before_compiling() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "helper.gos", "fun double(n) { return n + n }\n");
    let src = write_source(&dir, "main.gos", "$import \"helper.gos\"\nout double(21)\n");

    let (outcome, io) = gos::run_file(&src, &PreprocessorConfig::default(), VmRecordingIo::default(), VmConfig::default()).unwrap();
    assert_eq!(outcome, VmOutcome::Halted);
    assert_eq!(io.outputs, vec![gos::PrimValue::Number(42.0)]);
}

#[test]
fn interpret_file_matches_run_file_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "main.gos", "fun fib(n a b) { if n == 0 return a return fib(n - 1 b a + b) } out fib(40 0 1)");

    let (vm_outcome, vm_io) = gos::run_file(&src, &PreprocessorConfig::default(), VmRecordingIo::default(), VmConfig::default()).unwrap();
    let (twi_outcome, twi_io) = gos::interpret_file(&src, &PreprocessorConfig::default(), TwiRecordingIo::default()).unwrap();

    assert_eq!(vm_outcome, VmOutcome::Halted);
    assert_eq!(twi_outcome, TwiOutcome::Completed(gos::PrimValue::Unit));
    assert_eq!(vm_io.outputs, twi_io.outputs);
}

#[test]
fn ast_dump_reflects_source_without_preprocessing_a_missing_import() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "broken.gos", "$import \"missing.gos\"\n");
    let err = gos::preprocess_file(&src, &PreprocessorConfig::default()).unwrap_err();
    assert!(matches!(err, gos::GosError::Preprocess(_)));
}
