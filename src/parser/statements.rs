use super::*;
use std::rc::Rc;

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let pos = self.mark();
        match &self.current {
            Token::Semicolon => {
                self.advance()?;
                Ok(self.statement_at(StatementKind::Empty, pos))
            }
            Token::LeftBrace => {
                let stmts = self.parse_block()?;
                Ok(self.statement_at(StatementKind::Block(stmts), pos))
            }
            Token::Keyword(Keyword::Var) => {
                self.advance()?;
                let decls = self.parse_variable_declarations()?;
                self.eat_semicolon()?;
                Ok(self.statement_at(StatementKind::Variable(decls), pos))
            }
            Token::Keyword(Keyword::If) => self.parse_if(pos),
            Token::Keyword(Keyword::While) => self.parse_while(pos),
            Token::Keyword(Keyword::Do) => self.parse_do_while(pos),
            Token::Keyword(Keyword::For) => self.parse_for(pos),
            Token::Keyword(Keyword::Return) => {
                if self.in_function == 0 {
                    return Err(self.error("Illegal return statement"));
                }
                self.advance()?;
                let arg = if self.current == Token::Semicolon
                    || self.current == Token::RightBrace
                    || self.current == Token::Eof
                    || self.prev_line_terminator
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.eat_semicolon()?;
                Ok(self.statement_at(StatementKind::Return(arg), pos))
            }
            Token::Keyword(Keyword::Break) => {
                self.advance()?;
                let label = self.parse_jump_label()?;
                match &label {
                    Some(name) => {
                        if !self.labels.iter().any(|(l, _)| l == name) {
                            return Err(self.error(format!("Undefined label '{name}'")));
                        }
                    }
                    None => {
                        if self.in_iteration == 0 && self.in_switch == 0 {
                            return Err(self.error("Illegal break statement"));
                        }
                    }
                }
                self.eat_semicolon()?;
                Ok(self.statement_at(StatementKind::Break(label), pos))
            }
            Token::Keyword(Keyword::Continue) => {
                self.advance()?;
                let label = self.parse_jump_label()?;
                match &label {
                    Some(name) => {
                        if !self.labels.iter().any(|(l, iter)| l == name && *iter) {
                            return Err(self.error(format!("Undefined label '{name}'")));
                        }
                    }
                    None => {
                        if self.in_iteration == 0 {
                            return Err(self.error("Illegal continue statement"));
                        }
                    }
                }
                self.eat_semicolon()?;
                Ok(self.statement_at(StatementKind::Continue(label), pos))
            }
            Token::Keyword(Keyword::Throw) => {
                self.advance()?;
                if self.prev_line_terminator {
                    return Err(self.error("Illegal newline after throw"));
                }
                let expr = self.parse_expression()?;
                self.eat_semicolon()?;
                Ok(self.statement_at(StatementKind::Throw(expr), pos))
            }
            Token::Keyword(Keyword::Try) => self.parse_try(pos),
            Token::Keyword(Keyword::Switch) => self.parse_switch(pos),
            Token::Keyword(Keyword::With) => {
                self.advance()?;
                self.eat(&Token::LeftParen)?;
                let object = self.parse_expression()?;
                self.eat(&Token::RightParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(self.statement_at(StatementKind::With(object, body), pos))
            }
            Token::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.eat_semicolon()?;
                Ok(self.statement_at(StatementKind::Debugger, pos))
            }
            Token::Keyword(Keyword::Function) => {
                let function = self.parse_function(true)?;
                Ok(self.statement_at(StatementKind::FunctionDeclaration(function), pos))
            }
            Token::Identifier(_) => {
                if let Token::Identifier(name) = self.current.clone()
                    && self.peek_is_colon()
                {
                    return self.parse_labelled(name, pos);
                }
                self.parse_expression_statement(pos)
            }
            _ => self.parse_expression_statement(pos),
        }
    }

    // The lexer has already consumed `current`, so a clone's next token is
    // the one following it.
    fn peek_is_colon(&self) -> bool {
        let mut lexer = self.lexer.clone();
        loop {
            match lexer.next_token() {
                Ok(Token::LineTerminator) => continue,
                Ok(tok) => return tok == Token::Colon,
                Err(_) => return false,
            }
        }
    }

    fn parse_expression_statement(&mut self, pos: (u32, u32)) -> Result<Statement, ParseError> {
        let expr = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(self.statement_at(StatementKind::Expression(expr), pos))
    }

    fn parse_jump_label(&mut self) -> Result<Option<String>, ParseError> {
        if self.prev_line_terminator {
            return Ok(None);
        }
        if let Token::Identifier(name) = self.current.clone() {
            self.advance()?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_labelled(&mut self, first: String, pos: (u32, u32)) -> Result<Statement, ParseError> {
        let mut names = vec![first];
        self.advance()?; // first label identifier
        self.eat(&Token::Colon)?;
        // Collect any further `name :` pairs so the whole set shares a target
        loop {
            if let Token::Identifier(name) = self.current.clone()
                && self.peek_is_colon()
            {
                self.advance()?;
                self.eat(&Token::Colon)?;
                names.push(name);
                continue;
            }
            break;
        }
        for name in &names {
            if self.labels.iter().any(|(l, _)| l == name) {
                return Err(self.error(format!("Label '{name}' has already been declared")));
            }
        }
        let is_iteration = matches!(
            self.current,
            Token::Keyword(Keyword::While) | Token::Keyword(Keyword::Do) | Token::Keyword(Keyword::For)
        );
        for name in &names {
            self.labels.push((name.clone(), is_iteration));
        }
        let result = self.parse_statement();
        self.labels.truncate(self.labels.len() - names.len());
        let mut stmt = result?;
        for name in names.into_iter().rev() {
            stmt = self.statement_at(StatementKind::Labeled(name, Box::new(stmt)), pos);
        }
        Ok(stmt)
    }

    pub(crate) fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut stmts = Vec::new();
        while self.current != Token::RightBrace {
            if self.current == Token::Eof {
                return Err(self.error("Unexpected end of input"));
            }
            stmts.push(self.parse_statement()?);
        }
        self.advance()?; // }
        Ok(stmts)
    }

    fn parse_variable_declarations(&mut self) -> Result<Vec<VariableDeclarator>, ParseError> {
        let mut decls = Vec::new();
        loop {
            decls.push(self.parse_variable_declarator()?);
            if self.current == Token::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        Ok(decls)
    }

    fn parse_variable_declarator(&mut self) -> Result<VariableDeclarator, ParseError> {
        let name = self.expect_identifier()?;
        let init = if self.current == Token::Assign {
            self.advance()?;
            Some(self.parse_assignment()?)
        } else {
            None
        };
        Ok(VariableDeclarator { name, init })
    }

    fn parse_if(&mut self, pos: (u32, u32)) -> Result<Statement, ParseError> {
        self.advance()?; // if
        self.eat(&Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.current == Token::Keyword(Keyword::Else) {
            self.advance()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(self.statement_at(
            StatementKind::If(IfStatement {
                test,
                consequent,
                alternate,
            }),
            pos,
        ))
    }

    fn parse_while(&mut self, pos: (u32, u32)) -> Result<Statement, ParseError> {
        self.advance()?; // while
        self.eat(&Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        self.in_iteration += 1;
        let body = self.parse_statement();
        self.in_iteration -= 1;
        Ok(self.statement_at(
            StatementKind::While(WhileStatement {
                test,
                body: Box::new(body?),
            }),
            pos,
        ))
    }

    fn parse_do_while(&mut self, pos: (u32, u32)) -> Result<Statement, ParseError> {
        self.advance()?; // do
        self.in_iteration += 1;
        let body = self.parse_statement();
        self.in_iteration -= 1;
        let body = Box::new(body?);
        self.eat(&Token::Keyword(Keyword::While))?;
        self.eat(&Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        // the trailing semicolon is optional even without a line break
        if self.current == Token::Semicolon {
            self.advance()?;
        }
        Ok(self.statement_at(StatementKind::DoWhile(DoWhileStatement { test, body }), pos))
    }

    fn parse_for(&mut self, pos: (u32, u32)) -> Result<Statement, ParseError> {
        self.advance()?; // for
        self.eat(&Token::LeftParen)?;

        if self.current == Token::Keyword(Keyword::Var) {
            self.advance()?;
            self.no_in = true;
            let first = self.parse_variable_declarator();
            self.no_in = false;
            let first = first?;
            if self.current == Token::Keyword(Keyword::In) {
                self.advance()?;
                let right = self.parse_expression()?;
                self.eat(&Token::RightParen)?;
                let body = self.parse_iteration_body()?;
                return Ok(self.statement_at(
                    StatementKind::ForIn(ForInStatement {
                        left: ForInLeft::Variable(first.name, first.init),
                        right,
                        body,
                    }),
                    pos,
                ));
            }
            let mut decls = vec![first];
            while self.current == Token::Comma {
                self.advance()?;
                self.no_in = true;
                let d = self.parse_variable_declarator();
                self.no_in = false;
                decls.push(d?);
            }
            return self.parse_for_tail(Some(ForInit::Variable(decls)), pos);
        }

        if self.current == Token::Semicolon {
            return self.parse_for_tail(None, pos);
        }

        self.no_in = true;
        let init = self.parse_expression();
        self.no_in = false;
        let init = init?;
        if self.current == Token::Keyword(Keyword::In) {
            if !matches!(init, Expression::Identifier(_) | Expression::Member(_, _)) {
                return Err(self.error("Invalid left-hand side in for-in"));
            }
            self.advance()?;
            let right = self.parse_expression()?;
            self.eat(&Token::RightParen)?;
            let body = self.parse_iteration_body()?;
            return Ok(self.statement_at(
                StatementKind::ForIn(ForInStatement {
                    left: ForInLeft::Expression(Box::new(init)),
                    right,
                    body,
                }),
                pos,
            ));
        }
        self.parse_for_tail(Some(ForInit::Expression(init)), pos)
    }

    fn parse_for_tail(
        &mut self,
        init: Option<ForInit>,
        pos: (u32, u32),
    ) -> Result<Statement, ParseError> {
        self.eat(&Token::Semicolon)?;
        let test = if self.current == Token::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(&Token::Semicolon)?;
        let update = if self.current == Token::RightParen {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(&Token::RightParen)?;
        let body = self.parse_iteration_body()?;
        Ok(self.statement_at(
            StatementKind::For(ForStatement {
                init,
                test,
                update,
                body,
            }),
            pos,
        ))
    }

    fn parse_iteration_body(&mut self) -> Result<Box<Statement>, ParseError> {
        self.in_iteration += 1;
        let body = self.parse_statement();
        self.in_iteration -= 1;
        Ok(Box::new(body?))
    }

    fn parse_try(&mut self, pos: (u32, u32)) -> Result<Statement, ParseError> {
        self.advance()?; // try
        let block = self.parse_block()?;
        let handler = if self.current == Token::Keyword(Keyword::Catch) {
            self.advance()?;
            self.eat(&Token::LeftParen)?;
            let param = self.expect_identifier()?;
            self.eat(&Token::RightParen)?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.current == Token::Keyword(Keyword::Finally) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(self.statement_at(
            StatementKind::Try(TryStatement {
                block,
                handler,
                finalizer,
            }),
            pos,
        ))
    }

    fn parse_switch(&mut self, pos: (u32, u32)) -> Result<Statement, ParseError> {
        self.advance()?; // switch
        self.eat(&Token::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        self.eat(&Token::LeftBrace)?;
        let mut cases = Vec::new();
        let mut seen_default = false;
        self.in_switch += 1;
        let result = (|| -> Result<(), ParseError> {
            while self.current != Token::RightBrace {
                let test = match &self.current {
                    Token::Keyword(Keyword::Case) => {
                        self.advance()?;
                        let test = self.parse_expression()?;
                        self.eat(&Token::Colon)?;
                        Some(test)
                    }
                    Token::Keyword(Keyword::Default) => {
                        if seen_default {
                            return Err(self.error("More than one default clause in switch"));
                        }
                        seen_default = true;
                        self.advance()?;
                        self.eat(&Token::Colon)?;
                        None
                    }
                    _ => return Err(self.error("Expected case or default in switch body")),
                };
                let mut consequent = Vec::new();
                while !matches!(
                    self.current,
                    Token::RightBrace
                        | Token::Keyword(Keyword::Case)
                        | Token::Keyword(Keyword::Default)
                ) {
                    consequent.push(self.parse_statement()?);
                }
                cases.push(SwitchCase { test, consequent });
            }
            Ok(())
        })();
        self.in_switch -= 1;
        result?;
        self.advance()?; // }
        Ok(self.statement_at(
            StatementKind::Switch(SwitchStatement {
                discriminant,
                cases,
            }),
            pos,
        ))
    }

    /// Parse a function declaration or expression starting at the
    /// `function` keyword. A declaration requires a name.
    pub(crate) fn parse_function(&mut self, declaration: bool) -> Result<Rc<FunctionLiteral>, ParseError> {
        let start = self.current_start;
        self.eat(&Token::Keyword(Keyword::Function))?;
        let name = if let Token::Identifier(n) = self.current.clone() {
            self.advance()?;
            Some(n)
        } else if declaration {
            return Err(self.error("Function declaration requires a name"));
        } else {
            None
        };
        self.eat(&Token::LeftParen)?;
        let mut params = Vec::new();
        while self.current != Token::RightParen {
            params.push(self.expect_identifier()?);
            if self.current == Token::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        self.eat(&Token::RightParen)?;

        // function bodies get fresh iteration/switch/label scopes
        let saved_iteration = std::mem::replace(&mut self.in_iteration, 0);
        let saved_switch = std::mem::replace(&mut self.in_switch, 0);
        let saved_labels = std::mem::take(&mut self.labels);
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        self.in_function += 1;
        let body = self.parse_block();
        self.in_function -= 1;
        self.in_iteration = saved_iteration;
        self.in_switch = saved_switch;
        self.labels = saved_labels;
        self.no_in = saved_no_in;
        let body = body?;

        let source = self.source_since(start);
        Ok(Rc::new(FunctionLiteral {
            name,
            params,
            body,
            source,
        }))
    }
}
