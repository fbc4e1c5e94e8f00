use super::*;

impl<'a> Parser<'a> {
    // Expression: AssignmentExpression (`,` AssignmentExpression)*
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_assignment()?;
        if self.current != Token::Comma {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.current == Token::Comma {
            self.advance()?;
            exprs.push(self.parse_assignment()?);
        }
        Ok(Expression::Sequence(exprs))
    }

    pub(crate) fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_conditional()?;
        let op = match self.current {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::AddAssign,
            Token::MinusAssign => AssignOp::SubAssign,
            Token::StarAssign => AssignOp::MulAssign,
            Token::SlashAssign => AssignOp::DivAssign,
            Token::PercentAssign => AssignOp::ModAssign,
            Token::LeftShiftAssign => AssignOp::LShiftAssign,
            Token::RightShiftAssign => AssignOp::RShiftAssign,
            Token::UnsignedRightShiftAssign => AssignOp::URShiftAssign,
            Token::AmpersandAssign => AssignOp::BitAndAssign,
            Token::PipeAssign => AssignOp::BitOrAssign,
            Token::CaretAssign => AssignOp::BitXorAssign,
            _ => return Ok(left),
        };
        if !matches!(left, Expression::Identifier(_) | Expression::Member(_, _)) {
            return Err(self.error("Invalid left-hand side in assignment"));
        }
        self.advance()?;
        let right = self.parse_assignment()?;
        Ok(Expression::Assign(op, Box::new(left), Box::new(right)))
    }

    fn parse_conditional(&mut self) -> Result<Expression, ParseError> {
        let test = self.parse_logical_or()?;
        if self.current != Token::Question {
            return Ok(test);
        }
        self.advance()?;
        // `in` is always allowed between ? and :
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment();
        self.no_in = saved_no_in;
        let consequent = consequent?;
        self.eat(&Token::Colon)?;
        let alternate = self.parse_assignment()?;
        Ok(Expression::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.current == Token::LogicalOr {
            self.advance()?;
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_or()?;
        while self.current == Token::LogicalAnd {
            self.advance()?;
            let right = self.parse_bitwise_or()?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        while self.current == Token::Pipe {
            self.advance()?;
            let right = self.parse_bitwise_xor()?;
            left = Expression::Binary(BinaryOp::BitOr, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        while self.current == Token::Caret {
            self.advance()?;
            let right = self.parse_bitwise_and()?;
            left = Expression::Binary(BinaryOp::BitXor, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        while self.current == Token::Ampersand {
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expression::Binary(BinaryOp::BitAnd, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current {
                Token::Equal => BinaryOp::Eq,
                Token::NotEqual => BinaryOp::NotEq,
                Token::StrictEqual => BinaryOp::StrictEq,
                Token::StrictNotEqual => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.current {
                Token::LessThan => BinaryOp::Lt,
                Token::GreaterThan => BinaryOp::Gt,
                Token::LessThanEqual => BinaryOp::LtEq,
                Token::GreaterThanEqual => BinaryOp::GtEq,
                Token::Keyword(Keyword::Instanceof) => BinaryOp::Instanceof,
                Token::Keyword(Keyword::In) if !self.no_in => BinaryOp::In,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_shift()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current {
                Token::LeftShift => BinaryOp::LShift,
                Token::RightShift => BinaryOp::RShift,
                Token::UnsignedRightShift => BinaryOp::URShift,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        match self.current {
            Token::Keyword(Keyword::Delete) => {
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Expression::Delete(Box::new(operand)))
            }
            Token::Keyword(Keyword::Void) => {
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Expression::Void(Box::new(operand)))
            }
            Token::Keyword(Keyword::Typeof) => {
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Expression::Typeof(Box::new(operand)))
            }
            Token::Increment | Token::Decrement => {
                let op = if self.current == Token::Increment {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance()?;
                let operand = self.parse_unary()?;
                if !matches!(operand, Expression::Identifier(_) | Expression::Member(_, _)) {
                    return Err(self.error("Invalid left-hand side in prefix operation"));
                }
                Ok(Expression::Update(op, true, Box::new(operand)))
            }
            Token::Plus => {
                self.advance()?;
                Ok(Expression::Unary(UnaryOp::Plus, Box::new(self.parse_unary()?)))
            }
            Token::Minus => {
                self.advance()?;
                Ok(Expression::Unary(UnaryOp::Minus, Box::new(self.parse_unary()?)))
            }
            Token::Bang => {
                self.advance()?;
                Ok(Expression::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)))
            }
            Token::Tilde => {
                self.advance()?;
                Ok(Expression::Unary(UnaryOp::BitNot, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_left_hand_side()?;
        // §7.9.1 — no line terminator before postfix ++/--
        if !self.prev_line_terminator
            && matches!(self.current, Token::Increment | Token::Decrement)
        {
            if !matches!(expr, Expression::Identifier(_) | Expression::Member(_, _)) {
                return Err(self.error("Invalid left-hand side in postfix operation"));
            }
            let op = if self.current == Token::Increment {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance()?;
            return Ok(Expression::Update(op, false, Box::new(expr)));
        }
        Ok(expr)
    }

    fn parse_left_hand_side(&mut self) -> Result<Expression, ParseError> {
        let mut expr = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };
        loop {
            match self.current {
                Token::Dot => {
                    self.advance()?;
                    let name = self.expect_identifier_name()?;
                    expr = Expression::Member(Box::new(expr), MemberProperty::Dot(name));
                }
                Token::LeftBracket => {
                    self.advance()?;
                    let saved_no_in = std::mem::replace(&mut self.no_in, false);
                    let index = self.parse_expression();
                    self.no_in = saved_no_in;
                    let index = index?;
                    self.eat(&Token::RightBracket)?;
                    expr = Expression::Member(
                        Box::new(expr),
                        MemberProperty::Computed(Box::new(index)),
                    );
                }
                Token::LeftParen => {
                    let args = self.parse_arguments()?;
                    expr = Expression::Call(Box::new(expr), args);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    // NewExpression: member accesses bind tighter than the argument list,
    // so `new a.b(c)` constructs `a.b` and `new f()(x)` calls the instance.
    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // new
        let mut callee = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };
        loop {
            match self.current {
                Token::Dot => {
                    self.advance()?;
                    let name = self.expect_identifier_name()?;
                    callee = Expression::Member(Box::new(callee), MemberProperty::Dot(name));
                }
                Token::LeftBracket => {
                    self.advance()?;
                    let saved_no_in = std::mem::replace(&mut self.no_in, false);
                    let index = self.parse_expression();
                    self.no_in = saved_no_in;
                    let index = index?;
                    self.eat(&Token::RightBracket)?;
                    callee = Expression::Member(
                        Box::new(callee),
                        MemberProperty::Computed(Box::new(index)),
                    );
                }
                _ => break,
            }
        }
        let args = if self.current == Token::LeftParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New(Box::new(callee), args))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let mut args = Vec::new();
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let result = (|| -> Result<(), ParseError> {
            while self.current != Token::RightParen {
                args.push(self.parse_assignment()?);
                if self.current == Token::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
            Ok(())
        })();
        self.no_in = saved_no_in;
        result?;
        self.eat(&Token::RightParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.current.clone() {
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(Expression::This)
            }
            Token::Keyword(Keyword::Null) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Null))
            }
            Token::Keyword(Keyword::True) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            Token::Keyword(Keyword::False) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            Token::Keyword(Keyword::Function) => {
                let function = self.parse_function(false)?;
                Ok(Expression::Function(function))
            }
            Token::Identifier(name) => {
                self.advance()?;
                Ok(Expression::Identifier(name))
            }
            Token::NumericLiteral(n) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Number(n)))
            }
            Token::StringLiteral(s) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::String(s)))
            }
            Token::Slash | Token::SlashAssign => {
                self.current = self.lexer.rescan_regexp()?;
                self.current_end = self.lexer.offset();
                if let Token::RegExpLiteral { pattern, flags } = self.advance()? {
                    Ok(Expression::Literal(Literal::RegExp(pattern, flags)))
                } else {
                    Err(self.error("Invalid regular expression"))
                }
            }
            Token::LeftBracket => self.parse_array_literal(),
            Token::LeftBrace => self.parse_object_literal(),
            Token::LeftParen => {
                self.advance()?;
                let saved_no_in = std::mem::replace(&mut self.no_in, false);
                let expr = self.parse_expression();
                self.no_in = saved_no_in;
                let expr = expr?;
                self.eat(&Token::RightParen)?;
                Ok(expr)
            }
            other => Err(self.error(format!("Unexpected token {other:?}"))),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // [
        let mut elements = Vec::new();
        loop {
            match self.current {
                Token::RightBracket => break,
                Token::Comma => {
                    // elision
                    self.advance()?;
                    elements.push(None);
                }
                _ => {
                    elements.push(Some(self.parse_assignment()?));
                    if self.current == Token::Comma {
                        self.advance()?;
                        if self.current == Token::RightBracket {
                            // trailing comma adds no element
                            break;
                        }
                    } else {
                        break;
                    }
                }
            }
        }
        self.eat(&Token::RightBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // {
        let mut properties = Vec::new();
        while self.current != Token::RightBrace {
            properties.push(self.parse_property()?);
            if self.current == Token::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        self.eat(&Token::RightBrace)?;
        Ok(Expression::Object(properties))
    }

    fn parse_property(&mut self) -> Result<Property, ParseError> {
        // get/set accessors: `get name() { ... }` — but `get: 1` is a plain
        // property, so look one token past the contextual keyword.
        if let Token::Identifier(word) = self.current.clone()
            && (word == "get" || word == "set")
            && !self.peek_is_property_separator()
        {
            self.advance()?;
            let key = self.parse_property_key()?;
            let start = self.current_start;
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
            let saved_iteration = std::mem::replace(&mut self.in_iteration, 0);
            let saved_switch = std::mem::replace(&mut self.in_switch, 0);
            let saved_labels = std::mem::take(&mut self.labels);
            self.in_function += 1;
            let body = self.parse_block();
            self.in_function -= 1;
            self.in_iteration = saved_iteration;
            self.in_switch = saved_switch;
            self.labels = saved_labels;
            let body = body?;
            let kind = if word == "get" {
                PropertyKind::Get
            } else {
                PropertyKind::Set
            };
            let source = format!("function {}", self.source_since(start));
            return Ok(Property {
                key,
                kind,
                value: Expression::Function(std::rc::Rc::new(FunctionLiteral {
                    name: None,
                    params,
                    body,
                    source,
                })),
            });
        }

        let key = self.parse_property_key()?;
        self.eat(&Token::Colon)?;
        let value = self.parse_assignment()?;
        Ok(Property {
            key,
            kind: PropertyKind::Init,
            value,
        })
    }

    fn peek_is_property_separator(&self) -> bool {
        let mut lexer = self.lexer.clone();
        loop {
            match lexer.next_token() {
                Ok(Token::LineTerminator) => continue,
                Ok(tok) => {
                    return matches!(tok, Token::Colon | Token::Comma | Token::RightBrace);
                }
                Err(_) => return false,
            }
        }
    }

    fn parse_property_key(&mut self) -> Result<PropertyKey, ParseError> {
        match self.current.clone() {
            Token::Identifier(name) => {
                self.advance()?;
                Ok(PropertyKey::Identifier(name))
            }
            Token::Keyword(kw) => {
                self.advance()?;
                Ok(PropertyKey::Identifier(kw.to_string()))
            }
            Token::StringLiteral(s) => {
                self.advance()?;
                Ok(PropertyKey::String(s.to_rust_string()))
            }
            Token::NumericLiteral(n) => {
                self.advance()?;
                Ok(PropertyKey::Number(n))
            }
            other => Err(self.error(format!("Invalid property key {other:?}"))),
        }
    }
}
