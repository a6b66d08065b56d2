//! Preprocessor phase (§4.1): textual `$import`/`$define`/`$ifdef`/`$ifndef`/
//! `$endif` expansion over raw source text, producing a single macro-free,
//! import-flattened source string.

mod substitute;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};
use gos_util::{Diagnostic, Phase};

pub use substitute::substitute_macros;

/// Errors the Preprocessor can raise (§7): file-not-found, directive
/// syntax, unbalanced conditional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    FileNotFound(String),
    DirectiveSyntax(String),
    UnbalancedConditional(String),
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::FileNotFound(path) => write!(f, "file not found: {path}"),
            PreprocessError::DirectiveSyntax(msg) => write!(f, "directive syntax error: {msg}"),
            PreprocessError::UnbalancedConditional(msg) => write!(f, "unbalanced conditional: {msg}"),
        }
    }
}

impl std::error::Error for PreprocessError {}

impl From<PreprocessError> for Diagnostic {
    fn from(err: PreprocessError) -> Self {
        Diagnostic::new(Phase::Preprocessor, err.to_string())
    }
}

pub type PreprocessResult<T> = Result<T, PreprocessError>;

/// Where `$import` looks for files it can't find next to the including
/// file. Defaults to §6's well-known system directory.
#[derive(Debug, Clone)]
pub struct PreprocessorConfig {
    pub system_dir: PathBuf,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        PreprocessorConfig { system_dir: PathBuf::from("/usr/local/gos/") }
    }
}

/// Preprocesses the file at `entry_path`, following `$import`s, and returns
/// the single flattened source string.
pub fn preprocess(entry_path: &Path, config: &PreprocessorConfig) -> PreprocessResult<String> {
    let mut state = State { macros: AHashMap::default(), included: AHashSet::default(), config };
    state.process_file(entry_path)
}

/// Preprocesses `source` as if it were the contents of `virtual_path`,
/// without requiring the file to exist on disk. Used by callers (tests, the
/// `eval` escape hatch) that already have source text in hand.
pub fn preprocess_str(source: &str, virtual_dir: &Path, config: &PreprocessorConfig) -> PreprocessResult<String> {
    let mut state = State { macros: AHashMap::default(), included: AHashSet::default(), config };
    state.process_text(source, virtual_dir)
}

struct State<'cfg> {
    macros: AHashMap<String, String>,
    included: AHashSet<PathBuf>,
    config: &'cfg PreprocessorConfig,
}

impl<'cfg> State<'cfg> {
    fn process_file(&mut self, path: &Path) -> PreprocessResult<String> {
        let canon = path.canonicalize().map_err(|_| PreprocessError::FileNotFound(path.display().to_string()))?;
        if self.included.contains(&canon) {
            return Ok(String::new());
        }
        self.included.insert(canon);
        let text = fs::read_to_string(path).map_err(|_| PreprocessError::FileNotFound(path.display().to_string()))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        self.process_text(&text, &dir)
    }

    fn resolve_import(&self, rel: &str, including_dir: &Path) -> PreprocessResult<PathBuf> {
        let next_to_including = including_dir.join(rel);
        if next_to_including.is_file() {
            return Ok(next_to_including);
        }
        let system = self.config.system_dir.join(rel);
        if system.is_file() {
            return Ok(system);
        }
        Err(PreprocessError::FileNotFound(rel.to_owned()))
    }

    fn process_text(&mut self, text: &str, dir: &Path) -> PreprocessResult<String> {
        let mut out = String::new();
        let mut cond_stack: Vec<bool> = Vec::new();

        for line in text.lines() {
            let active = cond_stack.last().copied().unwrap_or(true);
            let trimmed = line.trim_start();

            let Some(rest) = trimmed.strip_prefix('$') else {
                if active {
                    out.push_str(&substitute_macros(line, &self.macros));
                    out.push('\n');
                }
                continue;
            };

            let mut parts = rest.splitn(2, char::is_whitespace);
            let directive = parts.next().unwrap_or("");
            let arg = parts.next().unwrap_or("").trim_start();

            match directive {
                "import" if active => {
                    let path = parse_quoted(arg).ok_or_else(|| PreprocessError::DirectiveSyntax(format!("malformed $import: {trimmed}")))?;
                    let resolved = self.resolve_import(&path, dir)?;
                    let spliced = self.process_file(&resolved)?;
                    out.push_str(&spliced);
                }
                "import" => {}
                "define" if active => {
                    let mut it = arg.splitn(2, char::is_whitespace);
                    let name = it.next().unwrap_or("");
                    if name.is_empty() {
                        return Err(PreprocessError::DirectiveSyntax(format!("malformed $define: {trimmed}")));
                    }
                    let replacement = it.next().unwrap_or("").trim_start().to_owned();
                    self.macros.insert(name.to_owned(), replacement);
                }
                "define" => {}
                "ifdef" | "ifndef" => {
                    let name = arg.split_whitespace().next().unwrap_or("");
                    if name.is_empty() {
                        return Err(PreprocessError::DirectiveSyntax(format!("malformed ${directive}: {trimmed}")));
                    }
                    let defined = self.macros.contains_key(name);
                    let cond = if directive == "ifdef" { defined } else { !defined };
                    cond_stack.push(active && cond);
                }
                "endif" => {
                    if cond_stack.pop().is_none() {
                        return Err(PreprocessError::UnbalancedConditional("unmatched $endif".into()));
                    }
                }
                other => return Err(PreprocessError::DirectiveSyntax(format!("unknown directive ${other}"))),
            }
        }

        if !cond_stack.is_empty() {
            return Err(PreprocessError::UnbalancedConditional("missing $endif".into()));
        }
        Ok(out)
    }
}

fn parse_quoted(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let bytes = arg.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        Some(arg[1..arg.len() - 1].to_owned())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn define_and_substitute() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_temp(dir.path(), "main.gos", "$define N 42\nout N\n");
        let out = preprocess(&entry, &PreprocessorConfig::default()).unwrap();
        assert_eq!(out, "out 42\n");
    }

    #[test]
    fn later_define_shadows_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_temp(dir.path(), "main.gos", "$define N 1\n$define N 2\nout N\n");
        let out = preprocess(&entry, &PreprocessorConfig::default()).unwrap();
        assert_eq!(out, "out 2\n");
    }

    #[test]
    fn import_splices_file_once() {
        let dir = tempfile::tempdir().unwrap();
        write_temp(dir.path(), "lib.gos", "let x = 1\n");
        let entry = write_temp(dir.path(), "main.gos", "$import \"lib.gos\"\n$import \"lib.gos\"\nout x\n");
        let out = preprocess(&entry, &PreprocessorConfig::default()).unwrap();
        assert_eq!(out, "let x = 1\nout x\n");
    }

    #[test]
    fn ifdef_excludes_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_temp(dir.path(), "main.gos", "$ifdef MISSING\nout 1\n$endif\nout 2\n");
        let out = preprocess(&entry, &PreprocessorConfig::default()).unwrap();
        assert_eq!(out, "out 2\n");
    }

    #[test]
    fn ifndef_includes_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_temp(dir.path(), "main.gos", "$ifndef MISSING\nout 1\n$endif\n");
        let out = preprocess(&entry, &PreprocessorConfig::default()).unwrap();
        assert_eq!(out, "out 1\n");
    }

    #[test]
    fn nested_conditionals() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_temp(
            dir.path(),
            "main.gos",
            "$define A 1\n$ifdef A\n$ifdef B\nout 1\n$endif\nout 2\n$endif\n",
        );
        let out = preprocess(&entry, &PreprocessorConfig::default()).unwrap();
        assert_eq!(out, "out 2\n");
    }

    #[test]
    fn unmatched_endif_errors() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_temp(dir.path(), "main.gos", "$endif\n");
        assert_eq!(
            preprocess(&entry, &PreprocessorConfig::default()),
            Err(PreprocessError::UnbalancedConditional("unmatched $endif".into()))
        );
    }

    #[test]
    fn missing_endif_errors() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_temp(dir.path(), "main.gos", "$ifdef A\nout 1\n");
        assert!(matches!(preprocess(&entry, &PreprocessorConfig::default()), Err(PreprocessError::UnbalancedConditional(_))));
    }

    #[test]
    fn missing_import_errors() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_temp(dir.path(), "main.gos", "$import \"nope.gos\"\n");
        assert!(matches!(preprocess(&entry, &PreprocessorConfig::default()), Err(PreprocessError::FileNotFound(_))));
    }
}
