//! Parser phase (§4.3): recursive-descent with Pratt-style precedence
//! climbing over the binary operator levels, emitting the AST from
//! `gos-ast`.

use std::fmt;

use gos_ast::Node;
use gos_lex::{LexError, Lexer, PrimValue, Token, TokenKind};
use gos_util::{Diagnostic, Phase, Span};

/// Errors the Parser can raise (§7): unexpected token, missing delimiter,
/// missing `=` in a declaration. A `LexError` bubbling up through the
/// one-token-lookahead stream is reported as a Parser-phase failure too,
/// since by the time the Parser sees it the Lexer has already aborted.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken { found: TokenKind, line: u32, context: &'static str },
    MissingDelimiter { expected: TokenKind, line: u32 },
    MissingAssign { line: u32 },
    Lex(LexError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { found, line, context } => {
                write!(f, "unexpected token {found:?} on line {line} while parsing {context}")
            }
            ParseError::MissingDelimiter { expected, line } => write!(f, "expected {expected:?} on line {line}"),
            ParseError::MissingAssign { line } => write!(f, "expected '=' after variable name on line {line}"),
            ParseError::Lex(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::Lex(err)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        let line = match &err {
            ParseError::UnexpectedToken { line, .. } | ParseError::MissingDelimiter { line, .. } | ParseError::MissingAssign { line } => *line,
            ParseError::Lex(_) => 0,
        };
        Diagnostic::at(Phase::Parser, err.to_string(), Span::new(0, 0, line))
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses `source` into a `Program` node.
pub fn parse(source: &str) -> ParseResult<Node> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> ParseResult<Self> {
        Ok(Parser { lexer: Lexer::new(source)? })
    }

    fn current(&self) -> &Token {
        self.lexer.current()
    }

    fn line(&self) -> u32 {
        self.current().span.line
    }

    fn bump(&mut self) -> ParseResult<Token> {
        Ok(self.lexer.advance()?)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> ParseResult<bool> {
        if self.check(kind) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            self.bump()
        } else {
            Err(ParseError::MissingDelimiter { expected: kind, line: self.line() })
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        if self.check(TokenKind::Ident) {
            let tok = self.bump()?;
            Ok(tok.name.unwrap_or_default())
        } else {
            Err(ParseError::UnexpectedToken { found: self.current().kind, line: self.line(), context: "identifier" })
        }
    }

    fn unexpected(&self, context: &'static str) -> ParseError {
        ParseError::UnexpectedToken { found: self.current().kind, line: self.line(), context }
    }

    fn parse_program(&mut self) -> ParseResult<Node> {
        let mut body = Vec::new();
        while !self.check(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        Ok(Node::Program { body })
    }

    fn parse_statement(&mut self) -> ParseResult<Node> {
        match self.current().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Fun => self.parse_fun_decl(),
            TokenKind::LBrace => self.parse_block(),
            _ => self.parse_expr(),
        }
    }

    fn parse_block(&mut self) -> ParseResult<Node> {
        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Node::Stmt { body })
    }

    fn parse_if(&mut self) -> ParseResult<Node> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_expr()?;
        let body = self.parse_statement()?;
        let else_branch = if self.eat(TokenKind::Else)? { Some(Box::new(self.parse_statement()?)) } else { None };
        Ok(Node::If { cond: Box::new(cond), body: Box::new(body), else_branch })
    }

    fn parse_while(&mut self) -> ParseResult<Node> {
        self.expect(TokenKind::While)?;
        let cond = self.parse_expr()?;
        let body = self.parse_statement()?;
        Ok(Node::While { cond: Box::new(cond), body: Box::new(body) })
    }

    fn parse_fun_decl(&mut self) -> ParseResult<Node> {
        self.expect(TokenKind::Fun)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.check(TokenKind::Eof) {
            params.push(self.expect_ident()?);
        }
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Node::FuncDecl { name, params, body: Box::new(body) })
    }

    /// The `expr` production: the keyword-led forms, or a block/if/while
    /// used as an expression, or the operator-precedence chain.
    fn parse_expr(&mut self) -> ParseResult<Node> {
        match self.current().kind {
            TokenKind::Exit => {
                self.bump()?;
                let status = self.parse_expr()?;
                Ok(Node::Exit { status: Box::new(status) })
            }
            TokenKind::Goto => {
                self.bump()?;
                let name = self.expect_ident()?;
                Ok(Node::Goto { name })
            }
            TokenKind::Let => {
                self.bump()?;
                let name = self.expect_ident()?;
                if !self.eat(TokenKind::Assign)? {
                    return Err(ParseError::MissingAssign { line: self.line() });
                }
                let value = self.parse_expr()?;
                Ok(Node::VarDecl { name, value: Box::new(value) })
            }
            TokenKind::Out => {
                self.bump()?;
                let value = self.parse_expr()?;
                Ok(Node::Out { value: Box::new(value) })
            }
            TokenKind::In => {
                self.bump()?;
                let name = self.expect_ident()?;
                Ok(Node::In { name })
            }
            TokenKind::Return => {
                self.bump()?;
                let value = self.parse_expr()?;
                Ok(Node::Return { value: Box::new(value) })
            }
            TokenKind::Eval => {
                self.bump()?;
                let code = self.parse_expr()?;
                Ok(Node::Eval { code: Box::new(code) })
            }
            TokenKind::Del => {
                self.bump()?;
                let name = self.expect_ident()?;
                Ok(Node::Del { name })
            }
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            _ => self.parse_logical(),
        }
    }

    /// logical: comparison ((`&`|`|`|`^`) comparison)*
    ///
    /// §4.3's grammar sketch also lists `!` at this level, but `!` is
    /// already the unary-not operator handled in `parse_factor` and has no
    /// defined binary meaning — treated as a grammar-sketch leftover rather
    /// than implemented as a nonsensical infix operator (see DESIGN.md).
    fn parse_logical(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current().kind {
                k @ (TokenKind::BitAnd | TokenKind::BitOr | TokenKind::Xor) => k,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_comparison()?;
            left = Node::BinOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    /// comparison: additive ((`==`|`!=`|`>`|`>=`|`<`|`<=`|`&&`|`||`) additive)*
    fn parse_comparison(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current().kind {
                k @ (TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::And
                | TokenKind::Or) => k,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_additive()?;
            left = Node::BinOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    /// additive: term ((`+`|`-`) term)*
    fn parse_additive(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                k @ (TokenKind::Add | TokenKind::Sub) => k,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_term()?;
            left = Node::BinOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    /// term: factor ((`*`|`/`) factor)*
    fn parse_term(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current().kind {
                k @ (TokenKind::Mul | TokenKind::Div) => k,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_factor()?;
            left = Node::BinOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    /// factor: literal | identifier(...) | unary(+,-,!) factor | `(` expr `)`
    fn parse_factor(&mut self) -> ParseResult<Node> {
        match self.current().kind {
            TokenKind::Literal => {
                let tok = self.bump()?;
                Ok(Node::Val { value: tok.value.unwrap_or(PrimValue::Unit) })
            }
            TokenKind::True => {
                self.bump()?;
                Ok(Node::Val { value: PrimValue::Bool(true) })
            }
            TokenKind::False => {
                self.bump()?;
                Ok(Node::Val { value: PrimValue::Bool(false) })
            }
            TokenKind::Null => {
                self.bump()?;
                Ok(Node::Val { value: PrimValue::Unit })
            }
            TokenKind::Pos | TokenKind::Neg | TokenKind::Not => {
                let op = self.bump()?.kind;
                let argument = self.parse_factor()?;
                Ok(Node::UnaryOp { op, argument: Box::new(argument) })
            }
            TokenKind::LParen => {
                self.bump()?;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident => self.parse_ident_factor(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_ident_factor(&mut self) -> ParseResult<Node> {
        let tok = self.bump()?;
        let name = tok.name.unwrap_or_default();
        match self.current().kind {
            TokenKind::Colon => {
                self.bump()?;
                Ok(Node::Label { name })
            }
            TokenKind::Inc | TokenKind::Dec => {
                let op = self.bump()?.kind;
                Ok(Node::UnaryOp { op, argument: Box::new(Node::Var { name }) })
            }
            TokenKind::LParen => {
                self.bump()?;
                let mut args = Vec::new();
                while !self.check(TokenKind::RParen) && !self.check(TokenKind::Eof) {
                    args.push(self.parse_expr()?);
                }
                self.expect(TokenKind::RParen)?;
                Ok(Node::FuncCall { name, args })
            }
            TokenKind::Assign => {
                self.bump()?;
                let value = self.parse_expr()?;
                Ok(Node::VarMod { name, value: Box::new(value) })
            }
            _ => Ok(Node::Var { name }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Node {
        parse(src).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn arithmetic_precedence() {
        let ast = parse_ok("(1 + 2) * 3");
        match ast {
            Node::Program { body } => assert_eq!(body.len(), 1),
            _ => panic!("expected program"),
        }
    }

    #[test]
    fn var_decl_requires_assign() {
        assert!(matches!(parse("let x 1"), Err(ParseError::MissingAssign { .. })));
    }

    #[test]
    fn function_call_args_are_whitespace_separated() {
        let ast = parse_ok("f(1 2 3)");
        let Node::Program { body } = ast else { panic!() };
        match &body[0] {
            Node::FuncCall { name, args } => {
                assert_eq!(name, "f");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn function_params_are_whitespace_separated() {
        let ast = parse_ok("fun fib(n a b) { return n }");
        let Node::Program { body } = ast else { panic!() };
        match &body[0] {
            Node::FuncDecl { name, params, .. } => {
                assert_eq!(name, "fib");
                assert_eq!(params, &vec!["n".to_owned(), "a".to_owned(), "b".to_owned()]);
            }
            other => panic!("expected func decl, got {other:?}"),
        }
    }

    #[test]
    fn label_and_goto() {
        let ast = parse_ok("label: goto label");
        let Node::Program { body } = ast else { panic!() };
        assert!(matches!(body[0], Node::Label { .. }));
        assert!(matches!(body[1], Node::Goto { .. }));
    }

    #[test]
    fn block_as_expression_value() {
        let ast = parse_ok("let x = { let a = 1 let b = 2 a + b }");
        let Node::Program { body } = ast else { panic!() };
        match &body[0] {
            Node::VarDecl { value, .. } => assert!(matches!(**value, Node::Stmt { .. })),
            other => panic!("expected var decl, got {other:?}"),
        }
    }

    #[test]
    fn if_else_and_while() {
        let ast = parse_ok("if x { out 1 } else { out 2 }  while x { out 3 }");
        let Node::Program { body } = ast else { panic!() };
        assert!(matches!(body[0], Node::If { .. }));
        assert!(matches!(body[1], Node::While { .. }));
    }

    #[test]
    fn unexpected_token_is_parser_error() {
        assert!(matches!(parse("* 1"), Err(ParseError::UnexpectedToken { .. })));
    }

    #[test]
    fn missing_closing_paren_errors() {
        assert!(matches!(parse("(1 + 2"), Err(ParseError::MissingDelimiter { .. })));
    }

    #[test]
    fn del_statement() {
        let ast = parse_ok("let x = 1 del x");
        let Node::Program { body } = ast else { panic!() };
        assert!(matches!(body[1], Node::Del { .. }));
    }

    #[test]
    fn postfix_inc_dec() {
        let ast = parse_ok("n++ n--");
        let Node::Program { body } = ast else { panic!() };
        assert!(matches!(body[0], Node::UnaryOp { op: TokenKind::Inc, .. }));
        assert!(matches!(body[1], Node::UnaryOp { op: TokenKind::Dec, .. }));
    }
}
