use gos_lex::PrimValue;

/// Mirrors `gos_vm::Io`: how the interpreter talks to the outside world for
/// `out`/`in`. Kept as its own small trait rather than a dependency on
/// `gos-vm` so the reference interpreter has no reason to depend on the
/// bytecode pipeline at all.
pub trait Io {
    fn write_out(&mut self, value: &PrimValue);
    fn read_in(&mut self) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct StdIo;

impl Io for StdIo {
    fn write_out(&mut self, value: &PrimValue) {
        println!("{value}");
    }

    fn read_in(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_owned()),
            Err(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingIo {
    pub outputs: Vec<PrimValue>,
    pub inputs: std::collections::VecDeque<String>,
}

impl RecordingIo {
    pub fn with_inputs(inputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        RecordingIo { outputs: Vec::new(), inputs: inputs.into_iter().map(Into::into).collect() }
    }
}

impl Io for RecordingIo {
    fn write_out(&mut self, value: &PrimValue) {
        self.outputs.push(value.clone());
    }

    fn read_in(&mut self) -> Option<String> {
        self.inputs.pop_front()
    }
}

pub fn parse_input_line(line: &str) -> PrimValue {
    let trimmed = line.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        return PrimValue::Number(n);
    }
    match trimmed {
        "true" => PrimValue::Bool(true),
        "false" => PrimValue::Bool(false),
        "null" => PrimValue::Unit,
        _ => PrimValue::Str(trimmed.to_owned()),
    }
}
