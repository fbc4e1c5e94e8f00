use crate::ast::*;
use crate::lexer::{Keyword, LexError, Lexer, Token};
use std::fmt;

mod expressions;
mod statements;

#[derive(Clone, Debug)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}:{} {}", self.line, self.column, self.message)
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            line: e.location.line,
            column: e.location.column,
        }
    }
}

/// Parse a whole program, collecting every positioned error rather than
/// stopping at the first one.
pub fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = match Parser::new(source) {
        Ok(p) => p,
        Err(e) => return Err(vec![e]),
    };
    parser.parse_program()
}

pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    current_line: u32,
    current_column: u32,
    current_start: usize,
    current_end: usize,
    prev_token_end: usize,
    prev_line_terminator: bool,
    in_function: u32,
    in_iteration: u32,
    in_switch: u32,
    // (name, labels an iteration statement)
    labels: Vec<(String, bool)>,
    no_in: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let mut had_lt = false;
        let current = loop {
            let tok = lexer.next_token()?;
            if tok == Token::LineTerminator {
                had_lt = true;
                continue;
            }
            break tok;
        };
        let current_start = lexer.token_start();
        let current_line = lexer.token_line();
        let current_column = lexer.token_column();
        let current_end = lexer.offset();
        Ok(Self {
            source,
            lexer,
            current,
            current_line,
            current_column,
            current_start,
            current_end,
            prev_token_end: 0,
            prev_line_terminator: had_lt,
            in_function: 0,
            in_iteration: 0,
            in_switch: 0,
            labels: Vec::new(),
            no_in: false,
        })
    }

    pub fn parse_program(&mut self) -> Result<Program, Vec<ParseError>> {
        let mut body = Vec::new();
        let mut errors = Vec::new();
        while self.current != Token::Eof {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(e) => {
                    errors.push(e);
                    if !self.synchronize() {
                        break;
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(Program { body })
        } else {
            Err(errors)
        }
    }

    /// Skip to a likely statement boundary after an error so parsing can
    /// continue and further errors be reported. Returns false at EOF.
    fn synchronize(&mut self) -> bool {
        loop {
            match self.current {
                Token::Eof => return false,
                Token::Semicolon | Token::RightBrace => {
                    return self.advance().is_ok();
                }
                _ => {
                    if self.advance().is_err() {
                        return false;
                    }
                    if self.prev_line_terminator {
                        return true;
                    }
                }
            }
        }
    }

    pub(crate) fn advance(&mut self) -> Result<Token, ParseError> {
        self.prev_token_end = self.current_end;
        self.prev_line_terminator = false;
        let next = loop {
            let tok = self.lexer.next_token()?;
            if tok == Token::LineTerminator {
                self.prev_line_terminator = true;
                continue;
            }
            break tok;
        };
        self.current_start = self.lexer.token_start();
        self.current_line = self.lexer.token_line();
        self.current_column = self.lexer.token_column();
        let old = std::mem::replace(&mut self.current, next);
        self.current_end = self.lexer.offset();
        Ok(old)
    }

    pub(crate) fn eat(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(format!("Unexpected token {:?}", self.current)))
        }
    }

    // Automatic semicolon insertion, §7.9
    pub(crate) fn eat_semicolon(&mut self) -> Result<(), ParseError> {
        if self.current == Token::Semicolon {
            self.advance()?;
            return Ok(());
        }
        if self.prev_line_terminator
            || self.current == Token::RightBrace
            || self.current == Token::Eof
        {
            return Ok(());
        }
        Err(self.error(format!("Unexpected token {:?}", self.current)))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current.clone() {
            Token::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            other => Err(self.error(format!("Expected identifier, got {other:?}"))),
        }
    }

    /// IdentifierName: also admits reserved words (for member access and
    /// object literal keys, e.g. `a.default`).
    pub(crate) fn expect_identifier_name(&mut self) -> Result<String, ParseError> {
        match self.current.clone() {
            Token::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            Token::Keyword(kw) => {
                self.advance()?;
                Ok(kw.to_string())
            }
            other => Err(self.error(format!("Expected identifier, got {other:?}"))),
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: self.current_line,
            column: self.current_column,
        }
    }

    pub(crate) fn source_since(&self, start: usize) -> String {
        self.source[start..self.prev_token_end].to_string()
    }

    pub(crate) fn mark(&self) -> (u32, u32) {
        (self.current_line, self.current_column)
    }

    pub(crate) fn statement_at(&self, kind: StatementKind, pos: (u32, u32)) -> Statement {
        Statement {
            kind,
            line: pos.0,
            column: pos.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(src: &str) -> Vec<Statement> {
        parse(src).expect("parse error").body
    }

    #[test]
    fn parses_variable_statement() {
        let b = body("var abc = 1, def;");
        assert_eq!(b.len(), 1);
        match &b[0].kind {
            StatementKind::Variable(decls) => {
                assert_eq!(decls.len(), 2);
                assert_eq!(decls[0].name, "abc");
                assert!(decls[0].init.is_some());
                assert!(decls[1].init.is_none());
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn parses_function_declaration_with_source() {
        let b = body("function add(a, b) { return a + b; }");
        match &b[0].kind {
            StatementKind::FunctionDeclaration(f) => {
                assert_eq!(f.name.as_deref(), Some("add"));
                assert_eq!(f.params, vec!["a".to_string(), "b".to_string()]);
                assert!(f.source.starts_with("function add"));
                assert!(f.source.ends_with('}'));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn statement_positions_are_recorded() {
        let b = body("var a = 1;\n  a = 2;");
        assert_eq!((b[0].line, b[0].column), (1, 1));
        assert_eq!((b[1].line, b[1].column), (2, 3));
    }

    #[test]
    fn asi_inserts_semicolons() {
        let b = body("var a = 1\nvar b = 2\nreturn_like()");
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn restricted_return_argument() {
        // newline after return terminates the statement
        let b = body("function f() { return\n1 }");
        match &b[0].kind {
            StatementKind::FunctionDeclaration(f) => match &f.body[0].kind {
                StatementKind::Return(arg) => assert!(arg.is_none()),
                other => panic!("unexpected statement {other:?}"),
            },
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn for_in_forms() {
        let b = body("for (var k in o) {}\nfor (k in o) {}");
        assert!(matches!(&b[0].kind, StatementKind::ForIn(_)));
        assert!(matches!(&b[1].kind, StatementKind::ForIn(_)));
    }

    #[test]
    fn labelled_continue_targets_iteration() {
        assert!(parse("outer: while (true) { continue outer; }").is_ok());
        assert!(parse("outer: { continue outer; }").is_err());
        assert!(parse("continue;").is_err());
        assert!(parse("break;").is_err());
    }

    #[test]
    fn reserved_words_as_property_names() {
        assert!(parse("var a = { default: 1, in: 2 }; a.default;").is_ok());
    }

    #[test]
    fn regexp_literal_in_expression_position() {
        let b = body("var re = /ab+c/gi;");
        match &b[0].kind {
            StatementKind::Variable(decls) => match &decls[0].init {
                Some(Expression::Literal(Literal::RegExp(p, f))) => {
                    assert_eq!(p, "ab+c");
                    assert_eq!(f, "gi");
                }
                other => panic!("unexpected init {other:?}"),
            },
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn collects_multiple_errors() {
        let errs = parse("var = ;\nvar ok = 1;\nvar = 2;").unwrap_err();
        assert!(errs.len() >= 2);
        assert_eq!(errs[0].line, 1);
    }

    #[test]
    fn new_with_brackets_and_arguments() {
        let b = body("new a['default'](1)");
        match &b[0].kind {
            StatementKind::Expression(Expression::New(callee, args)) => {
                assert!(matches!(**callee, Expression::Member(_, _)));
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn sequence_and_conditional() {
        let b = body("a = (1, 2, 3) ? b : c;");
        assert!(matches!(&b[0].kind, StatementKind::Expression(_)));
    }
}
