use ahash::AHashMap;

/// Replaces whole-word occurrences of any macro name in `line` with its
/// replacement text. "Whole word" means the match isn't bordered by another
/// identifier character, so `$define N 1` doesn't touch `NAME`.
pub fn substitute_macros(line: &str, macros: &AHashMap<String, String>) -> String {
    if macros.is_empty() {
        return line.to_owned();
    }
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < bytes.len() {
        if is_word_start(bytes[i]) {
            let start = i;
            while i < bytes.len() && is_word_char(bytes[i]) {
                i += 1;
            }
            let word = &line[start..i];
            match macros.get(word) {
                Some(replacement) => out.push_str(replacement),
                None => out.push_str(word),
            }
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_word_only() {
        let mut macros = AHashMap::default();
        macros.insert("N".to_owned(), "42".to_owned());
        assert_eq!(substitute_macros("out N", &macros), "out 42");
        assert_eq!(substitute_macros("out NAME", &macros), "out NAME");
    }

    #[test]
    fn multiple_occurrences() {
        let mut macros = AHashMap::default();
        macros.insert("X".to_owned(), "1".to_owned());
        assert_eq!(substitute_macros("X + X", &macros), "1 + 1");
    }
}
