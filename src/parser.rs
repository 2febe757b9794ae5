// ABOUTME: Recursive-descent parser producing the Duso AST

use crate::ast::{
    BinaryOp, Expr, ExprKind, Parameter, Program, Stmt, StmtKind, TemplatePart, UnaryOp,
};
use crate::error::DusoError;
use crate::lexer::Lexer;
use crate::token::{Position, Token, TokenKind};

/// Lex and parse a complete source text.
pub fn parse(source: &str, file: &str) -> Result<Program, DusoError> {
    let tokens = Lexer::new(source, file).tokenize()?;
    Parser::new(tokens, file).parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: &str) -> Self {
        Parser {
            tokens,
            pos: 0,
            file: file.to_string(),
        }
    }

    pub fn parse_program(mut self) -> Result<Program, DusoError> {
        let mut statements = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_next_kind(&self) -> &TokenKind {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, DusoError> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(self.error(
                format!("expected {}, found '{}'", what, describe(token)),
                token.pos,
            ))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Position), DusoError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, token.pos))
            }
            _ => Err(self.error(
                format!("expected {}, found '{}'", what, describe(&token)),
                token.pos,
            )),
        }
    }

    fn error(&self, message: impl Into<String>, pos: Position) -> DusoError {
        DusoError::new(message, &self.file, pos)
    }

    fn at_block_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::End
                | TokenKind::Else
                | TokenKind::Elseif
                | TokenKind::Catch
                | TokenKind::Eof
        )
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Reads statements until a block terminator (`end`, `else`, `elseif`,
    /// `catch`) or end of input.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, DusoError> {
        let mut statements = Vec::new();
        while !self.at_block_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, DusoError> {
        let pos = self.peek().pos;
        match self.peek_kind() {
            TokenKind::If => self.parse_if(pos),
            TokenKind::While => self.parse_while(pos),
            TokenKind::For => self.parse_for(pos),
            TokenKind::Try => self.parse_try(pos),
            TokenKind::Function if matches!(self.peek_next_kind(), TokenKind::Ident(_)) => {
                self.parse_funcdef(pos)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.starts_expression() {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                Ok(Stmt {
                    kind: StmtKind::Return(value),
                    pos,
                })
            }
            TokenKind::Break => {
                self.advance();
                Ok(Stmt {
                    kind: StmtKind::Break,
                    pos,
                })
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    pos,
                })
            }
            TokenKind::Var => {
                self.advance();
                let (name, name_pos) = self.expect_ident("a variable name after 'var'")?;
                self.expect(&TokenKind::Eq, "'=' in variable declaration")?;
                let value = self.parse_expr()?;
                Ok(Stmt {
                    kind: StmtKind::Assign {
                        target: Expr {
                            kind: ExprKind::Identifier(name),
                            pos: name_pos,
                        },
                        value,
                        local: true,
                    },
                    pos,
                })
            }
            _ => self.parse_assign_or_expr(pos),
        }
    }

    fn parse_if(&mut self, pos: Position) -> Result<Stmt, DusoError> {
        self.advance();
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::Then, "'then' after if condition")?;
        let then_block = self.parse_block()?;

        let mut elseif_branches = Vec::new();
        while self.eat(&TokenKind::Elseif) {
            let cond = self.parse_expr()?;
            self.expect(&TokenKind::Then, "'then' after elseif condition")?;
            elseif_branches.push((cond, self.parse_block()?));
        }

        let else_block = if self.eat(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        self.expect(&TokenKind::End, "'end' to close if")?;
        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                then_block,
                elseif_branches,
                else_block,
            },
            pos,
        })
    }

    fn parse_while(&mut self, pos: Position) -> Result<Stmt, DusoError> {
        self.advance();
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::Do, "'do' after while condition")?;
        let body = self.parse_block()?;
        self.expect(&TokenKind::End, "'end' to close while")?;
        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            pos,
        })
    }

    fn parse_for(&mut self, pos: Position) -> Result<Stmt, DusoError> {
        self.advance();
        let (var, _) = self.expect_ident("a loop variable after 'for'")?;
        match self.peek_kind() {
            TokenKind::Eq => {
                self.advance();
                let start = self.parse_expr()?;
                self.expect(&TokenKind::Comma, "',' between for bounds")?;
                let end = self.parse_expr()?;
                let step = if self.eat(&TokenKind::Comma) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(&TokenKind::Do, "'do' after for bounds")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "'end' to close for")?;
                Ok(Stmt {
                    kind: StmtKind::ForNumeric {
                        var,
                        start,
                        end,
                        step,
                        body,
                    },
                    pos,
                })
            }
            TokenKind::In => {
                self.advance();
                let iterable = self.parse_expr()?;
                self.expect(&TokenKind::Do, "'do' after for iterable")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "'end' to close for")?;
                Ok(Stmt {
                    kind: StmtKind::ForIter {
                        var,
                        iterable,
                        body,
                    },
                    pos,
                })
            }
            _ => {
                let token = self.peek();
                Err(self.error(
                    format!(
                        "expected '=' or 'in' after for variable, found '{}'",
                        describe(token)
                    ),
                    token.pos,
                ))
            }
        }
    }

    fn parse_funcdef(&mut self, pos: Position) -> Result<Stmt, DusoError> {
        self.advance();
        let (name, _) = self.expect_ident("a function name")?;
        self.expect(&TokenKind::LParen, "'(' after function name")?;
        let params = self.parse_params()?;
        self.expect(&TokenKind::RParen, "')' after parameters")?;
        let body = self.parse_block()?;
        self.expect(&TokenKind::End, "'end' to close function")?;
        Ok(Stmt {
            kind: StmtKind::FunctionDef { name, params, body },
            pos,
        })
    }

    fn parse_try(&mut self, pos: Position) -> Result<Stmt, DusoError> {
        self.advance();
        let body = self.parse_block()?;
        self.expect(&TokenKind::Catch, "'catch' after try block")?;
        self.expect(&TokenKind::LParen, "'(' after catch")?;
        let (catch_name, _) = self.expect_ident("a catch variable name")?;
        self.expect(&TokenKind::RParen, "')' after catch variable")?;
        let catch_body = self.parse_block()?;
        self.expect(&TokenKind::End, "'end' to close try")?;
        Ok(Stmt {
            kind: StmtKind::Try {
                body,
                catch_name,
                catch_body,
            },
            pos,
        })
    }

    fn parse_assign_or_expr(&mut self, pos: Position) -> Result<Stmt, DusoError> {
        let expr = self.parse_expr()?;
        let kind = match self.peek_kind() {
            TokenKind::Eq => {
                self.require_lvalue(&expr)?;
                self.advance();
                let value = self.parse_expr()?;
                StmtKind::Assign {
                    target: expr,
                    value,
                    local: false,
                }
            }
            TokenKind::PlusEq
            | TokenKind::MinusEq
            | TokenKind::StarEq
            | TokenKind::SlashEq
            | TokenKind::PercentEq => {
                self.require_lvalue(&expr)?;
                let op = match self.advance().kind {
                    TokenKind::PlusEq => BinaryOp::Add,
                    TokenKind::MinusEq => BinaryOp::Sub,
                    TokenKind::StarEq => BinaryOp::Mul,
                    TokenKind::SlashEq => BinaryOp::Div,
                    _ => BinaryOp::Mod,
                };
                let value = self.parse_expr()?;
                StmtKind::CompoundAssign {
                    target: expr,
                    op,
                    value,
                }
            }
            TokenKind::PlusPlus => {
                self.require_lvalue(&expr)?;
                self.advance();
                StmtKind::PostIncrement {
                    target: expr,
                    decrement: false,
                }
            }
            TokenKind::MinusMinus => {
                self.require_lvalue(&expr)?;
                self.advance();
                StmtKind::PostIncrement {
                    target: expr,
                    decrement: true,
                }
            }
            _ => StmtKind::Expression(expr),
        };
        Ok(Stmt { kind, pos })
    }

    fn require_lvalue(&self, expr: &Expr) -> Result<(), DusoError> {
        if expr.is_lvalue() {
            Ok(())
        } else {
            Err(self.error("invalid assignment target", expr.pos))
        }
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Number(_)
                | TokenKind::Str(_)
                | TokenKind::TripleStr(_)
                | TokenKind::RawStr(_)
                | TokenKind::Ident(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Function
                | TokenKind::Minus
                | TokenKind::Not
        )
    }

    // ========================================================================
    // Expressions (precedence climbing, lowest first)
    // ========================================================================

    fn parse_expr(&mut self) -> Result<Expr, DusoError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, DusoError> {
        let condition = self.parse_or()?;
        if self.peek_kind() == &TokenKind::Question {
            let pos = self.advance().pos;
            // Right-associative: both branches take a full expression
            let then_branch = self.parse_expr()?;
            self.expect(&TokenKind::Colon, "':' in ternary expression")?;
            let else_branch = self.parse_expr()?;
            return Ok(Expr {
                kind: ExprKind::Ternary {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
                pos,
            });
        }
        Ok(condition)
    }

    fn parse_or(&mut self) -> Result<Expr, DusoError> {
        let mut left = self.parse_and()?;
        while self.peek_kind() == &TokenKind::Or {
            let pos = self.advance().pos;
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right, pos);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, DusoError> {
        let mut left = self.parse_equality()?;
        while self.peek_kind() == &TokenKind::And {
            let pos = self.advance().pos;
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right, pos);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, DusoError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            let pos = self.advance().pos;
            let right = self.parse_comparison()?;
            left = binary(op, left, right, pos);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, DusoError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            let pos = self.advance().pos;
            let right = self.parse_term()?;
            left = binary(op, left, right, pos);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, DusoError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let pos = self.advance().pos;
            let right = self.parse_factor()?;
            left = binary(op, left, right, pos);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, DusoError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let pos = self.advance().pos;
            let right = self.parse_unary()?;
            left = binary(op, left, right, pos);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, DusoError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let pos = self.advance().pos;
            let operand = self.parse_unary()?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                pos,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, DusoError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let (args, named_args) = self.parse_call_args()?;
                    let pos = expr.pos;
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            named_args,
                        },
                        pos,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket, "']' after index")?;
                    let pos = expr.pos;
                    expr = Expr {
                        kind: ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        pos,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let (name, _) = self.expect_ident("a property name after '.'")?;
                    let pos = expr.pos;
                    expr = Expr {
                        kind: ExprKind::Property {
                            object: Box::new(expr),
                            name,
                        },
                        pos,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), DusoError> {
        let mut args = Vec::new();
        let mut named_args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok((args, named_args));
        }
        loop {
            // `name = expr` is a named argument; `name == expr` is positional
            if matches!(self.peek_kind(), TokenKind::Ident(_))
                && self.peek_next_kind() == &TokenKind::Eq
            {
                let (name, _) = self.expect_ident("an argument name")?;
                self.advance(); // '='
                named_args.push((name, self.parse_expr()?));
            } else {
                args.push(self.parse_expr()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')' after arguments")?;
        Ok((args, named_args))
    }

    fn parse_primary(&mut self) -> Result<Expr, DusoError> {
        let token = self.peek().clone();
        let pos = token.pos;
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Number(n),
                    pos,
                })
            }
            TokenKind::Str(raw) | TokenKind::TripleStr(raw) => {
                self.advance();
                self.string_literal(&raw, pos)
            }
            TokenKind::RawStr(content) => {
                self.advance();
                // Raw strings are never templated and carry no escapes
                Ok(Expr {
                    kind: ExprKind::Str(content),
                    pos,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(true),
                    pos,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(false),
                    pos,
                })
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Nil,
                    pos,
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Identifier(name),
                    pos,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')' after expression")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(pos),
            TokenKind::LBrace => self.parse_object_literal(pos),
            TokenKind::Function => {
                self.advance();
                self.expect(&TokenKind::LParen, "'(' after function")?;
                let params = self.parse_params()?;
                self.expect(&TokenKind::RParen, "')' after parameters")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "'end' to close function")?;
                Ok(Expr {
                    kind: ExprKind::FunctionExpr { params, body },
                    pos,
                })
            }
            _ => Err(self.error(
                format!("unexpected token '{}'", describe(&token)),
                pos,
            )),
        }
    }

    fn parse_array_literal(&mut self, pos: Position) -> Result<Expr, DusoError> {
        self.advance();
        let mut items = Vec::new();
        if !self.eat(&TokenKind::RBracket) {
            loop {
                items.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBracket, "']' after array elements")?;
        }
        Ok(Expr {
            kind: ExprKind::Array(items),
            pos,
        })
    }

    fn parse_object_literal(&mut self, pos: Position) -> Result<Expr, DusoError> {
        self.advance();
        let mut entries = Vec::new();
        if !self.eat(&TokenKind::RBrace) {
            loop {
                let key_token = self.peek().clone();
                let key = match key_token.kind {
                    TokenKind::Ident(name) => {
                        self.advance();
                        name
                    }
                    TokenKind::Str(raw) => {
                        self.advance();
                        process_escapes(&raw, &self.file, key_token.pos)?
                    }
                    _ => {
                        return Err(self.error(
                            format!("expected object key, found '{}'", describe(&key_token)),
                            key_token.pos,
                        ));
                    }
                };
                // `key = value` and `key: value` are interchangeable
                if !self.eat(&TokenKind::Eq) && !self.eat(&TokenKind::Colon) {
                    let token = self.peek();
                    return Err(self.error(
                        format!("expected '=' or ':' after object key, found '{}'", describe(token)),
                        token.pos,
                    ));
                }
                entries.push((key, self.parse_expr()?));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace, "'}' after object entries")?;
        }
        Ok(Expr {
            kind: ExprKind::Object(entries),
            pos,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Parameter>, DusoError> {
        let mut params = Vec::new();
        if matches!(self.peek_kind(), TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let (name, _) = self.expect_ident("a parameter name")?;
            let default = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Parameter { name, default });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    // ========================================================================
    // String literals and templates
    // ========================================================================

    /// Turn a raw string token into a literal or, when it contains
    /// `{{ expr }}` markers, a template whose expressions are re-lexed and
    /// parsed with the full parser.
    fn string_literal(&self, raw: &str, pos: Position) -> Result<Expr, DusoError> {
        let segments = scan_template(raw, &self.file, pos)?;
        let has_exprs = segments
            .iter()
            .any(|s| matches!(s, Segment::Expr(_)));
        if !has_exprs {
            let text = match segments.into_iter().next() {
                Some(Segment::Text(t)) => t,
                _ => String::new(),
            };
            return Ok(Expr {
                kind: ExprKind::Str(process_escapes(&text, &self.file, pos)?),
                pos,
            });
        }

        let mut parts = Vec::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => {
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(process_escapes(&text, &self.file, pos)?));
                    }
                }
                Segment::Expr(src) => {
                    parts.push(TemplatePart::Expr(self.parse_embedded(&src, pos)?));
                }
            }
        }
        Ok(Expr {
            kind: ExprKind::Template(parts),
            pos,
        })
    }

    /// Re-enter the full pipeline for one embedded template expression.
    fn parse_embedded(&self, src: &str, pos: Position) -> Result<Expr, DusoError> {
        let program = parse(src, &self.file).map_err(|e| {
            self.error(format!("in template expression: {}", e.message), pos)
        })?;
        let mut statements = program.statements;
        if statements.len() != 1 {
            return Err(self.error("expected a single expression in template", pos));
        }
        match statements.remove(0).kind {
            StmtKind::Expression(expr) => Ok(expr),
            _ => Err(self.error("expected an expression in template", pos)),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr, pos: Position) -> Expr {
    Expr {
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        pos,
    }
}

fn describe(token: &Token) -> String {
    match &token.kind {
        TokenKind::Eof => "end of input".to_string(),
        _ => token.lexeme.clone(),
    }
}

enum Segment {
    Text(String),
    Expr(String),
}

/// Split raw string content on `{{ expr }}` markers. Runs before escape
/// processing so `\{` can suppress a marker; skips over nested braces and
/// quoted strings inside the expression.
fn scan_template(raw: &str, file: &str, pos: Position) -> Result<Vec<Segment>, DusoError> {
    let chars: Vec<char> = raw.chars().collect();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            text.push('\\');
            text.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if chars[i] == '{' && i + 1 < chars.len() && chars[i + 1] == '{' {
            segments.push(Segment::Text(std::mem::take(&mut text)));
            i += 2;
            let mut expr_src = String::new();
            let mut depth = 0usize;
            let mut quote: Option<char> = None;
            loop {
                if i >= chars.len() {
                    return Err(DusoError::new("unterminated template expression", file, pos));
                }
                let c = chars[i];
                if let Some(q) = quote {
                    expr_src.push(c);
                    if c == '\\' && i + 1 < chars.len() {
                        expr_src.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    if c == q {
                        quote = None;
                    }
                    i += 1;
                    continue;
                }
                match c {
                    '"' | '\'' => {
                        quote = Some(c);
                        expr_src.push(c);
                        i += 1;
                    }
                    '{' => {
                        depth += 1;
                        expr_src.push(c);
                        i += 1;
                    }
                    '}' if depth > 0 => {
                        depth -= 1;
                        expr_src.push(c);
                        i += 1;
                    }
                    '}' if i + 1 < chars.len() && chars[i + 1] == '}' => {
                        i += 2;
                        break;
                    }
                    _ => {
                        expr_src.push(c);
                        i += 1;
                    }
                }
            }
            segments.push(Segment::Expr(expr_src));
            continue;
        }
        text.push(chars[i]);
        i += 1;
    }
    segments.push(Segment::Text(text));
    Ok(segments)
}

/// Process escape sequences when a string literal becomes an AST node:
/// `\n \t \r \\ \" \' \{ \}`, octal `\ddd`, hex `\xHH`. Unknown escapes
/// are kept verbatim.
fn process_escapes(raw: &str, file: &str, pos: Position) -> Result<String, DusoError> {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let escape = chars[i + 1];
        i += 2;
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '{' => out.push('{'),
            '}' => out.push('}'),
            'x' => {
                let mut hex = String::new();
                for _ in 0..2 {
                    match chars.get(i) {
                        Some(c) if c.is_ascii_hexdigit() => {
                            hex.push(*c);
                            i += 1;
                        }
                        _ => {
                            return Err(DusoError::new(
                                "invalid hex escape: expected two hex digits after \\x",
                                file,
                                pos,
                            ));
                        }
                    }
                }
                let code = u32::from_str_radix(&hex, 16).unwrap_or(0);
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            '0'..='7' => {
                let mut octal = String::new();
                octal.push(escape);
                while octal.len() < 3 {
                    match chars.get(i) {
                        Some(c) if ('0'..='7').contains(c) => {
                            octal.push(*c);
                            i += 1;
                        }
                        _ => break,
                    }
                }
                let code = u32::from_str_radix(&octal, 8).unwrap_or(0);
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            other => {
                // Not a recognised escape; keep both characters
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}
