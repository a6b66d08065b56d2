use gos_lex::PrimValue;

/// How the VM talks to the outside world for `out`/`in` (§4.6). Kept as a
/// trait so tests can swap in a recording implementation instead of the
/// real standard streams.
pub trait Io {
    fn write_out(&mut self, value: &PrimValue);
    /// Returns `None` on EOF.
    fn read_in(&mut self) -> Option<String>;
}

/// Reads/writes the process's real standard streams. Used by `gos-cli`.
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

/// Captures `out` values and serves canned lines to `in`. Used by tests and
/// by the tree-walker's cross-checks against VM output.
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

/// Parses a line read by `in` the same way a `Literal` token is read (§4.1):
/// a bare number parses as `Number`, `true`/`false` as `Bool`, `null` as
/// `Unit`, anything else is taken verbatim as a `Str`.
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
