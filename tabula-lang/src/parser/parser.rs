//! Parser implementation

use super::ast::*;
use crate::lexer::{Token, TokenKind};

// ============================================================================
// PARSER
// ============================================================================

/// Recursive-descent parser for the analysis dialect.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from a vector of tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the tokens into a Program.
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        if let Some(token) = self
            .tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
        {
            let message = match &token.kind {
                TokenKind::Error(msg) => format!("Lexer error: {}", msg),
                _ => "Lexer error".to_string(),
            };
            return Err(ParseError {
                message,
                line: token.span.line,
                column: token.span.column,
            });
        }

        let mut statements = Vec::new();
        while !self.check(&TokenKind::Eof) {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Program { statements })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match &self.current().kind {
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::If => self.parse_if(),
            TokenKind::Def => self.parse_def(),
            TokenKind::Class => self.parse_class(),
            TokenKind::Indent => Err(self.error("Unexpected indent")),
            _ => {
                let stmt = self.parse_simple_statement()?;
                self.end_simple_statement()?;
                Ok(stmt)
            }
        }
    }

    /// Parse a one-line statement, leaving its terminator in place.
    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().span.line;
        let column = self.current().span.column;

        let kind = match &self.current().kind {
            TokenKind::Import => {
                self.advance();
                let mut items = Vec::new();
                loop {
                    let module = self.parse_dotted_name()?;
                    let alias = if self.check(&TokenKind::As) {
                        self.advance();
                        Some(self.expect_identifier()?)
                    } else {
                        None
                    };
                    items.push(ImportItem { module, alias });
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                StmtKind::Import { items }
            }

            TokenKind::From => {
                self.advance();
                let module = self.parse_dotted_name()?;
                self.expect(TokenKind::Import)?;
                let mut names = Vec::new();
                if self.check(&TokenKind::Star) {
                    self.advance();
                    names.push(("*".to_string(), None));
                } else {
                    loop {
                        let name = self.expect_identifier()?;
                        let alias = if self.check(&TokenKind::As) {
                            self.advance();
                            Some(self.expect_identifier()?)
                        } else {
                            None
                        };
                        names.push((name, alias));
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                StmtKind::FromImport { module, names }
            }

            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                StmtKind::Return { value }
            }

            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }

            TokenKind::Del => {
                self.advance();
                let target = self.parse_expression()?;
                StmtKind::Del { target }
            }

            TokenKind::Global => {
                self.advance();
                let mut names = vec![self.expect_identifier()?];
                while self.check(&TokenKind::Comma) {
                    self.advance();
                    names.push(self.expect_identifier()?);
                }
                StmtKind::Global { names }
            }

            _ => {
                let target = self.parse_expression()?;
                match &self.current().kind {
                    TokenKind::Assign => {
                        self.advance();
                        let value = self.parse_expression()?;
                        StmtKind::Assign { target, value }
                    }
                    TokenKind::PlusAssign => {
                        self.advance();
                        let value = self.parse_expression()?;
                        StmtKind::AugAssign {
                            target,
                            op: BinOp::Add,
                            value,
                        }
                    }
                    TokenKind::MinusAssign => {
                        self.advance();
                        let value = self.parse_expression()?;
                        StmtKind::AugAssign {
                            target,
                            op: BinOp::Sub,
                            value,
                        }
                    }
                    TokenKind::StarAssign => {
                        self.advance();
                        let value = self.parse_expression()?;
                        StmtKind::AugAssign {
                            target,
                            op: BinOp::Mul,
                            value,
                        }
                    }
                    TokenKind::SlashAssign => {
                        self.advance();
                        let value = self.parse_expression()?;
                        StmtKind::AugAssign {
                            target,
                            op: BinOp::Div,
                            value,
                        }
                    }
                    _ => StmtKind::Expr(target),
                }
            }
        };

        Ok(Stmt { kind, line, column })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().span.line;
        let column = self.current().span.column;
        self.expect(TokenKind::For)?;

        let mut targets = vec![self.expect_identifier()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            targets.push(self.expect_identifier()?);
        }

        self.expect(TokenKind::In)?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;

        Ok(Stmt {
            kind: StmtKind::For {
                targets,
                iterable,
                body,
            },
            line,
            column,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().span.line;
        let column = self.current().span.column;
        self.expect(TokenKind::While)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;

        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            line,
            column,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().span.line;
        let column = self.current().span.column;
        self.expect(TokenKind::If)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;

        let mut elifs = Vec::new();
        while self.check(&TokenKind::Elif) {
            self.advance();
            let cond = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            let suite = self.parse_suite()?;
            elifs.push((cond, suite));
        }

        let orelse = if self.check(&TokenKind::Else) {
            self.advance();
            self.expect(TokenKind::Colon)?;
            self.parse_suite()?
        } else {
            Vec::new()
        };

        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                body,
                elifs,
                orelse,
            },
            line,
            column,
        })
    }

    fn parse_def(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().span.line;
        let column = self.current().span.column;
        self.expect(TokenKind::Def)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;

        Ok(Stmt {
            kind: StmtKind::FuncDef { name, params, body },
            line,
            column,
        })
    }

    fn parse_class(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().span.line;
        let column = self.current().span.column;
        self.expect(TokenKind::Class)?;
        let name = self.expect_identifier()?;

        if self.check(&TokenKind::LParen) {
            self.advance();
            while !self.check(&TokenKind::RParen) {
                self.expect_identifier()?;
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }

        self.expect(TokenKind::Colon)?;
        let body = self.parse_suite()?;

        Ok(Stmt {
            kind: StmtKind::ClassDef { name, body },
            line,
            column,
        })
    }

    /// Parse a suite: an indented block, or inline statements after `:`.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.check(&TokenKind::Newline) {
            self.advance();
            self.expect(TokenKind::Indent)?;

            let mut stmts = Vec::new();
            while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
                if self.check(&TokenKind::Newline) {
                    self.advance();
                    continue;
                }
                stmts.push(self.parse_statement()?);
            }
            self.expect(TokenKind::Dedent)?;
            Ok(stmts)
        } else {
            let mut stmts = vec![self.parse_simple_statement()?];
            while self.check(&TokenKind::Semicolon) {
                self.advance();
                if self.check(&TokenKind::Newline) || self.check(&TokenKind::Eof) {
                    break;
                }
                stmts.push(self.parse_simple_statement()?);
            }
            if self.check(&TokenKind::Newline) {
                self.advance();
            }
            Ok(stmts)
        }
    }

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_identifier()?;
        while self.check(&TokenKind::Dot) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof | TokenKind::Dedent
        )
    }

    fn end_simple_statement(&mut self) -> Result<(), ParseError> {
        match self.current().kind {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::Dedent => Ok(()),
            _ => Err(self.error("Expected end of statement")),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Self::wrap(
                ExprKind::BoolOp {
                    op: BoolOpKind::Or,
                    left: Box::new(left.clone()),
                    right: Box::new(right),
                },
                &left,
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Self::wrap(
                ExprKind::BoolOp {
                    op: BoolOpKind::And,
                    left: Box::new(left.clone()),
                    right: Box::new(right),
                },
                &left,
            );
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Not) {
            let line = self.current().span.line;
            let column = self.current().span.column;
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                line,
                column,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_arith()?;

        let op = match &self.current().kind {
            TokenKind::Eq => Some(CmpOp::Eq),
            TokenKind::Ne => Some(CmpOp::Ne),
            TokenKind::Lt => Some(CmpOp::Lt),
            TokenKind::Le => Some(CmpOp::Le),
            TokenKind::Gt => Some(CmpOp::Gt),
            TokenKind::Ge => Some(CmpOp::Ge),
            TokenKind::In => Some(CmpOp::In),
            TokenKind::Not if self.peek_next() == Some(&TokenKind::In) => Some(CmpOp::NotIn),
            _ => None,
        };

        match op {
            Some(op) => {
                if op == CmpOp::NotIn {
                    self.advance(); // not
                }
                self.advance();
                let right = self.parse_arith()?;
                Ok(Self::wrap(
                    ExprKind::Compare {
                        left: Box::new(left.clone()),
                        op,
                        right: Box::new(right),
                    },
                    &left,
                ))
            }
            None => Ok(left),
        }
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Self::wrap(
                ExprKind::Binary {
                    left: Box::new(left.clone()),
                    op,
                    right: Box::new(right),
                },
                &left,
            );
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Self::wrap(
                ExprKind::Binary {
                    left: Box::new(left.clone()),
                    op,
                    right: Box::new(right),
                },
                &left,
            );
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        match self.current().kind {
            TokenKind::Minus => {
                let line = self.current().span.line;
                let column = self.current().span.column;
                self.advance();
                let operand = self.parse_factor()?;
                Ok(Expr {
                    kind: ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    line,
                    column,
                })
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_factor()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.check(&TokenKind::DoubleStar) {
            self.advance();
            // Right-associative, and `-` binds tighter on the exponent.
            let exponent = self.parse_factor()?;
            return Ok(Self::wrap(
                ExprKind::Binary {
                    left: Box::new(base.clone()),
                    op: BinOp::Pow,
                    right: Box::new(exponent),
                },
                &base,
            ));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            match self.current().kind {
                TokenKind::LParen => {
                    self.advance();
                    let (args, kwargs) = self.parse_call_args()?;
                    expr = Self::wrap(
                        ExprKind::Call {
                            func: Box::new(expr.clone()),
                            args,
                            kwargs,
                        },
                        &expr,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_identifier()?;
                    expr = Self::wrap(
                        ExprKind::Attribute {
                            value: Box::new(expr.clone()),
                            attr,
                        },
                        &expr,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_index()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Self::wrap(
                        ExprKind::Subscript {
                            value: Box::new(expr.clone()),
                            index: Box::new(index),
                        },
                        &expr,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), ParseError> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();

        while !self.check(&TokenKind::RParen) {
            let is_kwarg = matches!(self.current().kind, TokenKind::Identifier(_))
                && self.peek_next() == Some(&TokenKind::Assign);
            if is_kwarg {
                let name = self.expect_identifier()?;
                self.expect(TokenKind::Assign)?;
                let value = self.parse_expression()?;
                kwargs.push((name, value));
            } else {
                args.push(self.parse_expression()?);
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        Ok((args, kwargs))
    }

    fn parse_index(&mut self) -> Result<Index, ParseError> {
        let start = if self.check(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if !self.check(&TokenKind::Colon) {
            return match start {
                Some(expr) => Ok(Index::Single(expr)),
                None => Err(self.error("Expected subscript expression")),
            };
        }

        self.advance(); // first colon
        let stop = if self.check(&TokenKind::RBracket) || self.check(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        let step = if self.check(&TokenKind::Colon) {
            self.advance();
            if self.check(&TokenKind::RBracket) {
                None
            } else {
                Some(self.parse_expression()?)
            }
        } else {
            None
        };

        Ok(Index::Slice { start, stop, step })
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let line = self.current().span.line;
        let column = self.current().span.column;

        let kind = match self.current().kind.clone() {
            TokenKind::Int(v) => {
                self.advance();
                ExprKind::Int(v)
            }
            TokenKind::Float(v) => {
                self.advance();
                ExprKind::Float(v)
            }
            TokenKind::Str(s) => {
                self.advance();
                ExprKind::Str(s)
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::NoneLit => {
                self.advance();
                ExprKind::NoneLit
            }
            TokenKind::Identifier(name) => {
                self.advance();
                ExprKind::Name(name)
            }
            TokenKind::LParen => {
                self.advance();
                if self.check(&TokenKind::RParen) {
                    self.advance();
                    ExprKind::Tuple(Vec::new())
                } else {
                    let first = self.parse_expression()?;
                    if self.check(&TokenKind::Comma) {
                        let mut items = vec![first];
                        while self.check(&TokenKind::Comma) {
                            self.advance();
                            if self.check(&TokenKind::RParen) {
                                break;
                            }
                            items.push(self.parse_expression()?);
                        }
                        self.expect(TokenKind::RParen)?;
                        ExprKind::Tuple(items)
                    } else {
                        self.expect(TokenKind::RParen)?;
                        first.kind
                    }
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    items.push(self.parse_expression()?);
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                ExprKind::List(items)
            }
            TokenKind::Lambda => {
                return Err(self.error("lambda expressions are not supported"));
            }
            other => {
                return Err(self.error(format!("Expected expression, found {}", other)));
            }
        };

        Ok(Expr { kind, line, column })
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn wrap(kind: ExprKind, anchor: &Expr) -> Expr {
        Expr {
            kind,
            line: anchor.line,
            column: anchor.column,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("Expected {}, found {}", kind, self.current().kind)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("Expected identifier, found {}", other))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: self.current().span.line,
            column: self.current().span.column,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Program, ParseError> {
        Parser::new(Lexer::new(source).tokenize()).parse()
    }

    #[test]
    fn test_parse_assignment_to_answer() {
        let program = parse("answer = df[\"age\"].mean()\n").unwrap();
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].kind {
            StmtKind::Assign { target, value } => {
                assert!(target.is_name("answer"));
                assert!(matches!(value.kind, ExprKind::Call { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_import_with_alias() {
        let program = parse("import pandas as pd\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Import { items } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].module, "pandas");
                assert_eq!(items[0].alias.as_deref(), Some("pd"));
            }
            other => panic!("expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_semicolon_separated_statements() {
        let program = parse("import os; os.system(\"rm -rf /\")\n").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0].kind, StmtKind::Import { .. }));
        assert!(matches!(program.statements[1].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn test_parse_for_loop_with_block() {
        let program = parse("answer = 0\nfor x in [1, 2, 3]:\n    answer += x\n").unwrap();
        assert_eq!(program.statements.len(), 2);
        match &program.statements[1].kind {
            StmtKind::For {
                targets,
                iterable,
                body,
            } => {
                assert_eq!(targets, &vec!["x".to_string()]);
                assert!(matches!(iterable.kind, ExprKind::List(_)));
                assert_eq!(body.len(), 1);
                assert!(matches!(body[0].kind, StmtKind::AugAssign { .. }));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inline_suite() {
        let program = parse("if True: answer = 1\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::If { body, .. } => assert_eq!(body.len(), 1),
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_elif_else() {
        let source = "if x > 1:\n    answer = 1\nelif x > 0:\n    answer = 2\nelse:\n    answer = 3\n";
        let program = parse(source).unwrap();
        match &program.statements[0].kind {
            StmtKind::If { elifs, orelse, .. } => {
                assert_eq!(elifs.len(), 1);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_while_statement() {
        let program = parse("while True:\n    pass\n").unwrap();
        assert!(matches!(program.statements[0].kind, StmtKind::While { .. }));
    }

    #[test]
    fn test_parse_def_statement() {
        let program = parse("def f(a, b):\n    return a\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::FuncDef { name, params, body } => {
                assert_eq!(name, "f");
                assert_eq!(params.len(), 2);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected def, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_kwargs() {
        let program = parse("answer = df.sort_values(\"age\", ascending=False)\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::Call { args, kwargs, .. } => {
                    assert_eq!(args.len(), 1);
                    assert_eq!(kwargs.len(), 1);
                    assert_eq!(kwargs[0].0, "ascending");
                    assert!(matches!(kwargs[0].1.kind, ExprKind::Bool(false)));
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_slice_subscript() {
        let program = parse("answer = df[0:10]\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::Subscript { index, .. } => {
                    assert!(matches!(**index, Index::Slice { .. }));
                }
                other => panic!("expected subscript, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_comparison_and_boolop() {
        let program = parse("answer = df[(df[\"a\"] > 1) & (df[\"b\"] < 2)]\n");
        // `&` is not part of the dialect; boolean masks combine with and/or.
        assert!(program.is_err());

        let program = parse("answer = x > 1 and y < 2\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExprKind::BoolOp { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_in_and_not_in() {
        let program = parse("answer = \"x\" in xs\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::Compare { op, .. } => assert_eq!(*op, CmpOp::In),
                other => panic!("expected compare, got {:?}", other),
            },
            _ => unreachable!(),
        }

        let program = parse("answer = \"x\" not in xs\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::Compare { op, .. } => assert_eq!(*op, CmpOp::NotIn),
                other => panic!("expected compare, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_operator_precedence() {
        let program = parse("answer = 1 + 2 * 3\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::Binary { op, right, .. } => {
                    assert_eq!(*op, BinOp::Add);
                    assert!(matches!(
                        right.kind,
                        ExprKind::Binary { op: BinOp::Mul, .. }
                    ));
                }
                other => panic!("expected binary, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_unary_minus() {
        let program = parse("answer = -x ** 2\n").unwrap();
        // Unary minus applies to the whole power, as in Python.
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(
                    value.kind,
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        ..
                    }
                ));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_error_on_garbage() {
        let err = parse("answer = = 1\n").unwrap_err();
        assert!(err.message.contains("Expected expression"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_lexer_error_surfaces_as_parse_error() {
        let err = parse("answer = \"unterminated\n").unwrap_err();
        assert!(err.message.contains("Lexer error"));
    }

    #[test]
    fn test_parse_from_import() {
        let program = parse("from os import path as p\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::FromImport { module, names } => {
                assert_eq!(module, "os");
                assert_eq!(names[0].0, "path");
                assert_eq!(names[0].1.as_deref(), Some("p"));
            }
            other => panic!("expected from-import, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_tuple_and_grouping() {
        let program = parse("answer = (1, 2)\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => assert!(matches!(value.kind, ExprKind::Tuple(_))),
            _ => unreachable!(),
        }

        let program = parse("answer = (1 + 2) * 3\n").unwrap();
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(
                    value.kind,
                    ExprKind::Binary { op: BinOp::Mul, .. }
                ));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_del_and_global() {
        let program = parse("del x\nglobal a, b\n").unwrap();
        assert!(matches!(program.statements[0].kind, StmtKind::Del { .. }));
        match &program.statements[1].kind {
            StmtKind::Global { names } => assert_eq!(names.len(), 2),
            other => panic!("expected global, got {:?}", other),
        }
    }
}
