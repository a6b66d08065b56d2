/// A byte cursor over the (ASCII-oriented) expanded source text.
///
/// The language's identifier and number grammar never needs multi-byte
/// decoding (§4.2: ASCII letters, underscore, and backslash only), so the
/// cursor works directly on bytes rather than `char`s, unlike a
/// general-purpose Unicode-aware cursor.
pub struct Cursor<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Cursor { source: source.as_bytes(), pos: 0, line: 1 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    pub fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    pub fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn slice(&self, start: usize) -> &'a str {
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default()
    }
}
