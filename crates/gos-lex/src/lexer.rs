use gos_util::{Diagnostic, Phase, Span};

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};
use crate::value::PrimValue;

/// Errors the Lexer itself can raise (§7: unterminated string, bad number,
/// unknown character). Converts into a phase-tagged `Diagnostic` for
/// uniform reporting by whatever called the Lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnterminatedString { line: u32 },
    BadNumber { line: u32 },
    UnknownChar { ch: char, line: u32 },
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnterminatedString { line } => write!(f, "unterminated string starting on line {line}"),
            LexError::BadNumber { line } => write!(f, "malformed number on line {line}"),
            LexError::UnknownChar { ch, line } => write!(f, "unknown character {ch:?} on line {line}"),
        }
    }
}

impl std::error::Error for LexError {}

impl From<LexError> for Diagnostic {
    fn from(err: LexError) -> Self {
        let line = match err {
            LexError::UnterminatedString { line } | LexError::BadNumber { line } | LexError::UnknownChar { line, .. } => line,
        };
        Diagnostic::at(Phase::Lexer, err.to_string(), Span::new(0, 0, line))
    }
}

pub type LexResult<T> = Result<T, LexError>;

/// One-token-lookahead lexer: `current()` exposes the buffered token,
/// `advance()` replaces it with the next one (or `Eof`).
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    current: Token,
    /// Kind of the last *significant* (non-whitespace, non-comment) token
    /// produced, used for the `+`/`-` prefix-vs-infix disambiguation in
    /// §4.2. Starts as `Eof`, which is itself one of the prefix-triggering
    /// contexts — the start of a stream is a valid place for a unary sign.
    prev_kind: TokenKind,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> LexResult<Self> {
        let mut lexer = Lexer { cursor: Cursor::new(source), current: Token::new(TokenKind::Eof, Span::DUMMY), prev_kind: TokenKind::Eof };
        lexer.advance()?;
        Ok(lexer)
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn advance(&mut self) -> LexResult<Token> {
        let next = self.scan_token()?;
        let old = std::mem::replace(&mut self.current, next);
        self.prev_kind = old.kind;
        Ok(old)
    }

    fn is_prefix_context(&self) -> bool {
        matches!(self.prev_kind, TokenKind::Eof | TokenKind::LParen | TokenKind::Assign | TokenKind::Colon)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.cursor.bump();
                }
                Some(b'#') => {
                    while let Some(c) = self.cursor.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.cursor.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_token(&mut self) -> LexResult<Token> {
        self.skip_trivia();
        let line = self.cursor.line();
        let start = self.cursor.pos();
        let Some(c) = self.cursor.peek() else {
            return Ok(Token::new(TokenKind::Eof, Span::new(start as u32, start as u32, line)));
        };

        if is_ident_start(c) {
            return Ok(self.scan_ident(start, line));
        }
        if c.is_ascii_digit() {
            return self.scan_number(start, line);
        }
        if c == b'"' || c == b'\'' {
            return self.scan_string(c, start, line);
        }

        self.cursor.bump();
        let span_of = |end: usize| Span::new(start as u32, end as u32, line);

        let kind = match c {
            b'+' => {
                if self.cursor.eat(b'+') {
                    TokenKind::Inc
                } else if self.is_prefix_context() {
                    TokenKind::Pos
                } else {
                    TokenKind::Add
                }
            }
            b'-' => {
                if self.cursor.eat(b'-') {
                    TokenKind::Dec
                } else if self.is_prefix_context() {
                    TokenKind::Neg
                } else {
                    TokenKind::Sub
                }
            }
            b'*' => TokenKind::Mul,
            b'/' => TokenKind::Div,
            b'=' => {
                if self.cursor.eat(b'=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.cursor.eat(b'=') {
                    TokenKind::Ne
                } else {
                    TokenKind::Not
                }
            }
            b'>' => {
                if self.cursor.eat(b'=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            b'<' => {
                if self.cursor.eat(b'=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'&' => {
                if self.cursor.eat(b'&') {
                    TokenKind::And
                } else {
                    TokenKind::BitAnd
                }
            }
            b'|' => {
                if self.cursor.eat(b'|') {
                    TokenKind::Or
                } else {
                    TokenKind::BitOr
                }
            }
            b'^' => TokenKind::Xor,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b':' => TokenKind::Colon,
            other => return Err(LexError::UnknownChar { ch: other as char, line }),
        };
        Ok(Token::new(kind, span_of(self.cursor.pos())))
    }

    fn scan_ident(&mut self, start: usize, line: u32) -> Token {
        while let Some(c) = self.cursor.peek() {
            if is_ident_continue(c) {
                self.cursor.bump();
            } else {
                break;
            }
        }
        let text = self.cursor.slice(start);
        let span = Span::new(start as u32, self.cursor.pos() as u32, line);
        if let Some(kind) = Token::keyword_for(text) {
            return Token::new(kind, span);
        }
        Token::ident(text.to_owned(), span)
    }

    fn scan_number(&mut self, start: usize, line: u32) -> LexResult<Token> {
        while let Some(c) = self.cursor.peek() {
            if c.is_ascii_digit() {
                self.cursor.bump();
            } else {
                break;
            }
        }
        if self.cursor.peek() == Some(b'.') {
            self.cursor.bump();
            if !self.cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(LexError::BadNumber { line });
            }
            while let Some(c) = self.cursor.peek() {
                if c.is_ascii_digit() {
                    self.cursor.bump();
                } else {
                    break;
                }
            }
        }
        let text = self.cursor.slice(start);
        let n: f64 = text.parse().map_err(|_| LexError::BadNumber { line })?;
        let span = Span::new(start as u32, self.cursor.pos() as u32, line);
        Ok(Token::literal(PrimValue::Number(n), span))
    }

    fn scan_string(&mut self, quote: u8, start: usize, line: u32) -> LexResult<Token> {
        self.cursor.bump(); // opening quote
        let content_start = self.cursor.pos();
        loop {
            match self.cursor.peek() {
                None => return Err(LexError::UnterminatedString { line }),
                Some(c) if c == quote => break,
                Some(_) => {
                    self.cursor.bump();
                }
            }
        }
        let content = self.cursor.slice(content_start).to_owned();
        self.cursor.bump(); // closing quote
        let span = Span::new(start as u32, self.cursor.pos() as u32, line);
        Ok(Token::literal(PrimValue::Str(content), span))
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'\\'
}

fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src).unwrap();
        let mut out = Vec::new();
        loop {
            let tok = lexer.advance().unwrap();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn prefix_pos_neg_at_start() {
        assert_eq!(kinds("-1"), vec![TokenKind::Neg, TokenKind::Literal, TokenKind::Eof]);
        assert_eq!(kinds("+1"), vec![TokenKind::Pos, TokenKind::Literal, TokenKind::Eof]);
    }

    #[test]
    fn infix_add_sub_after_value() {
        assert_eq!(kinds("1 - 2"), vec![TokenKind::Literal, TokenKind::Sub, TokenKind::Literal, TokenKind::Eof]);
        assert_eq!(kinds("1 + 2"), vec![TokenKind::Literal, TokenKind::Add, TokenKind::Literal, TokenKind::Eof]);
    }

    #[test]
    fn doubled_inc_dec() {
        assert_eq!(kinds("x++"), vec![TokenKind::Ident, TokenKind::Inc, TokenKind::Eof]);
        assert_eq!(kinds("x--"), vec![TokenKind::Ident, TokenKind::Dec, TokenKind::Eof]);
    }

    #[test]
    fn comparisons_and_logical() {
        assert_eq!(
            kinds("a == b != c && d || e"),
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Ident,
                TokenKind::Ne,
                TokenKind::Ident,
                TokenKind::And,
                TokenKind::Ident,
                TokenKind::Or,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn bitwise_vs_logical() {
        assert_eq!(kinds("a & b"), vec![TokenKind::Ident, TokenKind::BitAnd, TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(kinds("a | b"), vec![TokenKind::Ident, TokenKind::BitOr, TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(kinds("a ^ b"), vec![TokenKind::Ident, TokenKind::Xor, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn number_requires_digit_after_dot() {
        let err = Lexer::new("1.").and_then(|mut l| l.advance());
        assert!(matches!(err, Err(LexError::BadNumber { .. })));
    }

    #[test]
    fn unterminated_string_errors() {
        let err = Lexer::new("\"abc").and_then(|mut l| l.advance());
        assert!(matches!(err, Err(LexError::UnterminatedString { .. })));
    }

    #[test]
    fn comment_to_end_of_line() {
        assert_eq!(kinds("1 # comment\n2"), vec![TokenKind::Literal, TokenKind::Literal, TokenKind::Eof]);
    }

    #[test]
    fn backslash_in_identifier() {
        assert_eq!(kinds("\\foo"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn keywords_recognized() {
        assert_eq!(
            kinds("let out in true false null if else while goto del exit fun return eval"),
            vec![
                TokenKind::Let,
                TokenKind::Out,
                TokenKind::In,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::Goto,
                TokenKind::Del,
                TokenKind::Exit,
                TokenKind::Fun,
                TokenKind::Return,
                TokenKind::Eval,
                TokenKind::Eof,
            ]
        );
    }
}
