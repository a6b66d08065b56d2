mod disasm;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::{env, fs};

use gos::{
    compile_file, interpret_file, interpret_source, parse_ast, preprocess_file, GosError, PrimValue, PreprocessorConfig, TwiOutcome,
    TwiRecordingIo, TwiStdIo, VmConfig, VmOutcome, VmStdIo,
};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("usage: gos <compile|run|ast|preprocess|dis|interpret|repl> [file]");
        return ExitCode::FAILURE;
    };

    match command.as_str() {
        "compile" => with_file(&args, cmd_compile),
        "run" => with_file(&args, cmd_run),
        "ast" => with_file(&args, cmd_ast),
        "preprocess" => with_file(&args, cmd_preprocess),
        "dis" => with_file(&args, cmd_dis),
        "interpret" => with_file(&args, cmd_interpret),
        "repl" => cmd_repl(),
        other => {
            eprintln!("unknown command: {other}");
            ExitCode::FAILURE
        }
    }
}

fn with_file(args: &[String], f: impl FnOnce(&Path) -> ExitCode) -> ExitCode {
    let Some(path) = args.get(2) else {
        eprintln!("usage: gos {} <file>", args[1]);
        return ExitCode::FAILURE;
    };
    f(Path::new(path))
}

fn report(err: GosError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::FAILURE
}

fn cmd_compile(path: &Path) -> ExitCode {
    let chunk = match compile_file(path, &PreprocessorConfig::default()) {
        Ok(c) => c,
        Err(e) => return report(e),
    };
    let out_path = path.with_extension("gbc");
    let mut bytes = Vec::new();
    if let Err(e) = gos_bc::write_chunk(&mut bytes, &chunk) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = fs::write(&out_path, bytes) {
        eprintln!("error writing {}: {e}", out_path.display());
        return ExitCode::FAILURE;
    }
    eprintln!("wrote {}", out_path.display());
    ExitCode::SUCCESS
}

fn cmd_run(path: &Path) -> ExitCode {
    let chunk = if path.extension().is_some_and(|ext| ext == "gbc") {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("error reading {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        };
        match gos_bc::read_chunk(&bytes[..]) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        match compile_file(path, &PreprocessorConfig::default()) {
            Ok(c) => c,
            Err(e) => return report(e),
        }
    };

    match gos::run_chunk(&chunk, VmStdIo, VmConfig::default()) {
        Ok((VmOutcome::Halted, _)) => ExitCode::SUCCESS,
        Ok((VmOutcome::Exited(status), _)) => ExitCode::from(exit_status_byte(&status)),
        Err(e) => report(e),
    }
}

fn cmd_ast(path: &Path) -> ExitCode {
    let source = match preprocess_file(path, &PreprocessorConfig::default()) {
        Ok(s) => s,
        Err(e) => return report(e),
    };
    match parse_ast(&source) {
        Ok(ast) => {
            println!("{ast:#?}");
            ExitCode::SUCCESS
        }
        Err(e) => report(e),
    }
}

fn cmd_preprocess(path: &Path) -> ExitCode {
    match preprocess_file(path, &PreprocessorConfig::default()) {
        Ok(source) => {
            print!("{source}");
            ExitCode::SUCCESS
        }
        Err(e) => report(e),
    }
}

fn cmd_dis(path: &Path) -> ExitCode {
    let chunk = if path.extension().is_some_and(|ext| ext == "gbc") {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("error reading {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        };
        match gos_bc::read_chunk(&bytes[..]) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        match compile_file(path, &PreprocessorConfig::default()) {
            Ok(c) => c,
            Err(e) => return report(e),
        }
    };
    print!("{}", disasm::disassemble(&chunk));
    ExitCode::SUCCESS
}

fn cmd_interpret(path: &Path) -> ExitCode {
    match interpret_file(path, &PreprocessorConfig::default(), TwiStdIo) {
        Ok((TwiOutcome::Completed(_), _)) => ExitCode::SUCCESS,
        Ok((TwiOutcome::Exited(status), _)) => ExitCode::from(exit_status_byte(&status)),
        Err(e) => report(e),
    }
}

fn exit_status_byte(value: &PrimValue) -> u8 {
    match value {
        PrimValue::Number(n) => *n as i64 as u8,
        _ => 0,
    }
}

fn cmd_repl() -> ExitCode {
    println!("gos repl (tree-walking interpreter); Ctrl+D to exit");
    let mut source = String::new();
    loop {
        print!("{}", if source.is_empty() { "gos> " } else { "...  " });
        if io::stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }
        let Some(line) = read_line() else {
            println!();
            return ExitCode::SUCCESS;
        };
        if source.is_empty() && line.trim().is_empty() {
            continue;
        }
        if !source.is_empty() {
            source.push('\n');
        }
        source.push_str(&line);

        if !braces_balanced(&source) {
            continue;
        }

        match interpret_source(&source, TwiRecordingIo::default()) {
            Ok((outcome, io)) => {
                for value in &io.outputs {
                    println!("{value}");
                }
                if let TwiOutcome::Exited(status) = outcome {
                    println!("(exited: {status})");
                }
            }
            Err(e) => eprintln!("error: {e}"),
        }
        source.clear();
    }
}

fn braces_balanced(source: &str) -> bool {
    let mut depth = 0i32;
    for ch in source.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    depth <= 0
}

fn read_line() -> Option<String> {
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
