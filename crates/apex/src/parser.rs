//! Recursive-descent parser: token stream → AST.
//!
//! Grounded in `original_source/apexParse.c`'s grammar and disambiguation
//! rules (spec.md §4.1). Precedence, low to high: statement < assignment <
//! logical < equality < comparison < bitwise < term (+,-) < factor (*,/,%)
//! < unary < primary.

use crate::ast::{ArrayElement, AssignOp, BinOp, Expr, FnName, IncDecOp, LValue, LogicalOp, Program, Stmt, UnOp};
use crate::error::{SrcLoc, SyntaxError};
use crate::intern::{Interner, StringId};
use crate::lexer::{Lexer, Token, TokenType};

/// Result of a full parse: the statements produced so far, any strict-mode
/// diagnostics, and whether the input ended mid-construct.
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<SyntaxError>,
    /// True when the input ended while a construct was still open. In
    /// REPL-incomplete mode this means "prompt for another line"; in strict
    /// mode it is folded into `errors` instead (spec.md §4.1).
    pub incomplete: bool,
}

pub struct Parser<'a, 'i> {
    lexer: Lexer<'a>,
    interner: &'i mut Interner,
    current: Token,
    allow_incomplete: bool,
    errors: Vec<SyntaxError>,
    incomplete: bool,
}

/// Sentinel used internally by `expect`/productions to unwind to the
/// statement-recovery point without allocating an error for REPL-incomplete
/// input, matching `original_source/apexParse.c`'s `consume()` contract.
enum Bail {
    /// A diagnostic was already recorded (strict mode).
    Reported,
    /// Input ended mid-construct; no diagnostic (REPL-incomplete mode).
    Incomplete,
}

type PResult<T> = Result<T, Bail>;

impl<'a, 'i> Parser<'a, 'i> {
    pub fn new(source: &'a str, filename: impl Into<String>, interner: &'i mut Interner, allow_incomplete: bool) -> Self {
        let mut lexer = Lexer::new(source, filename);
        let mut errors = Vec::new();
        let current = match lexer.next_token(interner) {
            Ok(t) => t,
            Err((loc, msg)) => {
                errors.push(SyntaxError { srcloc: loc.clone(), message: msg });
                Token {
                    kind: TokenType::Eof,
                    text: interner.intern("EOF"),
                    srcloc: loc,
                }
            }
        };
        Self {
            lexer,
            interner,
            current,
            allow_incomplete,
            errors,
            incomplete: false,
        }
    }

    fn srcloc(&self) -> SrcLoc {
        self.current.srcloc.clone()
    }

    fn bump(&mut self) {
        match self.lexer.next_token(self.interner) {
            Ok(t) => self.current = t,
            Err((loc, msg)) => {
                self.errors.push(SyntaxError { srcloc: loc, message: msg });
            }
        }
    }

    fn check(&self, kind: TokenType) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenType) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes `kind`, reporting (strict) or silently bailing
    /// (REPL-incomplete) on mismatch — mirrors `consume()` in
    /// `original_source/apexParse.c`.
    fn expect(&mut self, kind: TokenType, what: &str) -> PResult<()> {
        if self.check(kind) {
            self.bump();
            Ok(())
        } else if self.check(TokenType::Eof) {
            self.incomplete = true;
            Err(Bail::Incomplete)
        } else if self.allow_incomplete {
            Err(Bail::Incomplete)
        } else {
            let got = self.interner.resolve(self.current.text).to_owned();
            self.errors.push(SyntaxError {
                srcloc: self.srcloc(),
                message: format!("expected {what} but found '{got}'"),
            });
            Err(Bail::Reported)
        }
    }

    fn fail(&mut self, message: impl Into<String>) -> Bail {
        if self.allow_incomplete && self.check(TokenType::Eof) {
            self.incomplete = true;
            return Bail::Incomplete;
        }
        self.errors.push(SyntaxError {
            srcloc: self.srcloc(),
            message: message.into(),
        });
        Bail::Reported
    }

    pub fn parse(mut self) -> ParseResult {
        let mut program = Vec::new();
        while !self.check(TokenType::Eof) {
            match self.parse_statement() {
                Ok(stmt) => program.push(stmt),
                Err(Bail::Incomplete) => {
                    self.incomplete = true;
                    break;
                }
                Err(Bail::Reported) => self.synchronize(),
            }
        }
        ParseResult {
            program,
            errors: self.errors,
            incomplete: self.incomplete,
        }
    }

    /// Skips tokens until a plausible statement boundary, so one malformed
    /// statement doesn't abort the whole program (spec.md §4.1: "parsing
    /// continues from the next statement").
    fn synchronize(&mut self) {
        while !self.check(TokenType::Eof) {
            if self.matches(TokenType::Semicolon) {
                return;
            }
            if self.check(TokenType::RBrace) {
                return;
            }
            self.bump();
        }
    }

    // ---- statements ----------------------------------------------------

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenType::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            match self.parse_statement() {
                Ok(s) => stmts.push(s),
                Err(Bail::Incomplete) => return Err(Bail::Incomplete),
                Err(Bail::Reported) => self.synchronize(),
            }
        }
        self.expect(TokenType::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        match self.current.kind {
            TokenType::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenType::If => self.parse_if(),
            TokenType::While => self.parse_while(),
            TokenType::For => self.parse_for(),
            TokenType::Foreach => self.parse_foreach(),
            TokenType::Switch => self.parse_switch(),
            TokenType::Fn => self.parse_fn_decl(),
            TokenType::Return => self.parse_return(),
            TokenType::Break => {
                let loc = self.srcloc();
                self.bump();
                self.expect(TokenType::Semicolon, "';'")?;
                Ok(Stmt::Break(loc))
            }
            TokenType::Continue => {
                let loc = self.srcloc();
                self.bump();
                self.expect(TokenType::Semicolon, "';'")?;
                Ok(Stmt::Continue(loc))
            }
            TokenType::Include => self.parse_include(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenType::Semicolon, "';'")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let loc = self.srcloc();
        self.bump();
        let mut branches = Vec::new();
        self.expect(TokenType::LParen, "'('")?;
        let cond = self.parse_expression()?;
        self.expect(TokenType::RParen, "')'")?;
        let body = self.parse_block()?;
        branches.push((cond, body));
        let mut else_branch = None;
        loop {
            if self.matches(TokenType::Elif) {
                self.expect(TokenType::LParen, "'('")?;
                let cond = self.parse_expression()?;
                self.expect(TokenType::RParen, "')'")?;
                let body = self.parse_block()?;
                branches.push((cond, body));
            } else if self.matches(TokenType::Else) {
                else_branch = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }
        Ok(Stmt::If { branches, else_branch, loc })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let loc = self.srcloc();
        self.bump();
        self.expect(TokenType::LParen, "'('")?;
        let cond = self.parse_expression()?;
        self.expect(TokenType::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, loc })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let loc = self.srcloc();
        self.bump();
        self.expect(TokenType::LParen, "'('")?;
        let init = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expression()?)))
        };
        self.expect(TokenType::Semicolon, "';'")?;
        let cond = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenType::Semicolon, "';'")?;
        let update = if self.check(TokenType::RParen) {
            None
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expression()?)))
        };
        self.expect(TokenType::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::For { init, cond, update, body, loc })
    }

    fn parse_foreach(&mut self) -> PResult<Stmt> {
        let loc = self.srcloc();
        self.bump();
        self.expect(TokenType::LParen, "'('")?;
        let first = self.parse_identifier("loop variable name")?;
        let (key, value) = if self.matches(TokenType::Comma) {
            let second = self.parse_identifier("loop variable name")?;
            (Some(first), second)
        } else {
            (None, first)
        };
        self.expect(TokenType::In, "'in'")?;
        let iterable = self.parse_expression()?;
        self.expect(TokenType::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::Foreach { key, value, iterable, body, loc })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        let loc = self.srcloc();
        self.bump();
        self.expect(TokenType::LParen, "'('")?;
        let discriminant = self.parse_expression()?;
        self.expect(TokenType::RParen, "')'")?;
        self.expect(TokenType::LBrace, "'{'")?;
        let mut cases = Vec::new();
        let mut default = None;
        while self.check(TokenType::Case) || self.check(TokenType::Default) {
            if self.matches(TokenType::Case) {
                let value = self.parse_expression()?;
                self.expect(TokenType::Colon, "':'")?;
                let body = self.parse_case_body()?;
                cases.push((value, body));
            } else {
                self.bump();
                self.expect(TokenType::Colon, "':'")?;
                default = Some(self.parse_case_body()?);
            }
        }
        self.expect(TokenType::RBrace, "'}'")?;
        Ok(Stmt::Switch { discriminant, cases, default, loc })
    }

    fn parse_case_body(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(TokenType::Case) && !self.check(TokenType::Default) && !self.check(TokenType::RBrace) {
            if self.check(TokenType::Eof) {
                self.incomplete = true;
                return Err(Bail::Incomplete);
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_fn_decl(&mut self) -> PResult<Stmt> {
        let loc = self.srcloc();
        self.bump();
        let first = self.parse_identifier("function name")?;
        let name = if self.matches(TokenType::Dot) {
            let method_name = self.parse_identifier("method name")?;
            FnName::Member { type_name: first, method_name }
        } else {
            FnName::Plain(first)
        };
        self.expect(TokenType::LParen, "'('")?;
        let (params, variadic) = self.parse_param_list()?;
        self.expect(TokenType::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::FnDecl { name, params, variadic, body, loc })
    }

    /// Parses a parameter list. `*name` marks the variadic parameter
    /// (spec.md §4.1); a variadic followed by further parameters is a syntax
    /// error (spec.md §9 "Open question — parameter order for variadic").
    fn parse_param_list(&mut self) -> PResult<(Vec<StringId>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        let mut seen_variadic = false;
        while !self.check(TokenType::RParen) {
            if seen_variadic {
                return Err(self.fail("variadic parameter must be the last parameter"));
            }
            if self.matches(TokenType::Star) {
                variadic = true;
                seen_variadic = true;
            }
            let name = self.parse_identifier("parameter name")?;
            params.push(name);
            if !self.matches(TokenType::Comma) {
                break;
            }
        }
        Ok((params, variadic))
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        let loc = self.srcloc();
        self.bump();
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenType::Semicolon, "';'")?;
        Ok(Stmt::Return(value, loc))
    }

    fn parse_include(&mut self) -> PResult<Stmt> {
        let loc = self.srcloc();
        self.bump();
        if !self.check(TokenType::Str) {
            return Err(self.fail("expected string literal after 'include'"));
        }
        let path = self.interner.resolve(self.current.text).to_owned();
        self.bump();
        self.expect(TokenType::Semicolon, "';'")?;
        Ok(Stmt::Include { path, loc })
    }

    fn parse_identifier(&mut self, what: &str) -> PResult<StringId> {
        if !self.check(TokenType::Ident) {
            return Err(self.fail(format!("expected {what}")));
        }
        let id = self.current.text;
        self.bump();
        Ok(id)
    }

    // ---- expressions -----------------------------------------------------

    fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let expr = self.parse_logical()?;
        let op = match self.current.kind {
            TokenType::Equal => Some(AssignOp::Assign),
            TokenType::PlusEqual => Some(AssignOp::AddAssign),
            TokenType::MinusEqual => Some(AssignOp::SubAssign),
            TokenType::StarEqual => Some(AssignOp::MulAssign),
            TokenType::SlashEqual => Some(AssignOp::DivAssign),
            TokenType::ModEqual => Some(AssignOp::ModAssign),
            _ => None,
        };
        let Some(op) = op else { return Ok(expr) };
        let loc = self.srcloc();
        self.bump();
        let Some(target) = Self::to_lvalue(expr) else {
            return Err(self.fail("invalid assignment target"));
        };
        let value = Box::new(self.parse_assignment()?);
        Ok(Expr::Assign { op, target: Box::new(target), value, loc })
    }

    fn to_lvalue(expr: Expr) -> Option<LValue> {
        match expr {
            Expr::Var(name, _) => Some(LValue::Var(name)),
            Expr::Index { container, index, .. } => Some(LValue::Index { container, index }),
            Expr::Member { object, name, .. } => Some(LValue::Member { object, name }),
            _ => None,
        }
    }

    fn parse_logical(&mut self) -> PResult<Expr> {
        let mut left = self.parse_equality()?;
        loop {
            let op = match self.current.kind {
                TokenType::And => LogicalOp::And,
                TokenType::Or => LogicalOp::Or,
                _ => break,
            };
            let loc = self.srcloc();
            self.bump();
            let right = self.parse_equality()?;
            left = Expr::Logical { op, left: Box::new(left), right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current.kind {
                TokenType::EqualEqual => BinOp::Eq,
                TokenType::NotEqual => BinOp::Ne,
                _ => break,
            };
            let loc = self.srcloc();
            self.bump();
            let right = self.parse_comparison()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_bitwise()?;
        loop {
            let op = match self.current.kind {
                TokenType::Less => BinOp::Lt,
                TokenType::LessEqual => BinOp::Le,
                TokenType::Greater => BinOp::Gt,
                TokenType::GreaterEqual => BinOp::Ge,
                _ => break,
            };
            let loc = self.srcloc();
            self.bump();
            let right = self.parse_bitwise()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_bitwise(&mut self) -> PResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current.kind {
                TokenType::Amp => BinOp::BitAnd,
                TokenType::Pipe => BinOp::BitOr,
                _ => break,
            };
            let loc = self.srcloc();
            self.bump();
            let right = self.parse_term()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current.kind {
                TokenType::Plus => BinOp::Add,
                TokenType::Minus => BinOp::Sub,
                _ => break,
            };
            let loc = self.srcloc();
            self.bump();
            let right = self.parse_factor()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenType::Star => BinOp::Mul,
                TokenType::Slash => BinOp::Div,
                TokenType::Percent => BinOp::Mod,
                _ => break,
            };
            let loc = self.srcloc();
            self.bump();
            let right = self.parse_unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let loc = self.srcloc();
        match self.current.kind {
            TokenType::Minus => {
                self.bump();
                Ok(Expr::Unary { op: UnOp::Neg, operand: Box::new(self.parse_unary()?), loc })
            }
            TokenType::Plus => {
                self.bump();
                Ok(Expr::Unary { op: UnOp::Pos, operand: Box::new(self.parse_unary()?), loc })
            }
            TokenType::Not => {
                self.bump();
                Ok(Expr::Unary { op: UnOp::Not, operand: Box::new(self.parse_unary()?), loc })
            }
            TokenType::PlusPlus | TokenType::MinusMinus => {
                let op = if self.current.kind == TokenType::PlusPlus {
                    IncDecOp::PreInc
                } else {
                    IncDecOp::PreDec
                };
                self.bump();
                let operand = self.parse_unary()?;
                let Some(target) = Self::to_lvalue(operand) else {
                    return Err(self.fail("invalid increment/decrement target"));
                };
                Ok(Expr::IncDec { op, target: Box::new(target), loc })
            }
            _ => self.parse_postfix(),
        }
    }

    /// Parses a primary expression followed by any chain of `.member`,
    /// `[index]`, `(args)`, and a single trailing `++`/`--` (spec.md §4.1:
    /// "a postfix `++`/`--` attaches to the preceding primary, including
    /// indexed/member chains").
    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current.kind {
                TokenType::Dot => {
                    self.bump();
                    let name = self.parse_identifier("member name")?;
                    if self.interner.resolve(name) == "new" && self.check(TokenType::LParen) {
                        let loc = self.srcloc();
                        let Expr::Var(type_name, _) = expr else {
                            return Err(self.fail("'.new(...)' receiver must be a type name"));
                        };
                        self.bump();
                        let args = self.parse_arg_list()?;
                        self.expect(TokenType::RParen, "')'")?;
                        expr = Expr::New { type_name, args, loc };
                    } else if self.check(TokenType::LParen) {
                        let loc = self.srcloc();
                        self.bump();
                        let args = self.parse_arg_list()?;
                        self.expect(TokenType::RParen, "')'")?;
                        expr = Expr::MemberCall { object: Box::new(expr), name, args, loc };
                    } else {
                        let loc = self.srcloc();
                        expr = Expr::Member { object: Box::new(expr), name, loc };
                    }
                }
                TokenType::LBracket => {
                    let loc = self.srcloc();
                    self.bump();
                    let index = self.parse_expression()?;
                    self.expect(TokenType::RBracket, "']'")?;
                    expr = Expr::Index { container: Box::new(expr), index: Box::new(index), loc };
                }
                TokenType::LParen => {
                    let loc = self.srcloc();
                    self.bump();
                    let args = self.parse_arg_list()?;
                    self.expect(TokenType::RParen, "')'")?;
                    expr = Expr::Call { callee: Box::new(expr), args, loc };
                }
                TokenType::PlusPlus | TokenType::MinusMinus => {
                    let loc = self.srcloc();
                    let op = if self.current.kind == TokenType::PlusPlus {
                        IncDecOp::PostInc
                    } else {
                        IncDecOp::PostDec
                    };
                    self.bump();
                    let Some(target) = Self::to_lvalue(expr) else {
                        return Err(self.fail("invalid increment/decrement target"));
                    };
                    expr = Expr::IncDec { op, target: Box::new(target), loc };
                    break;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_arg_list(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check(TokenType::RParen) {
            args.push(self.parse_expression()?);
            if !self.matches(TokenType::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let loc = self.srcloc();
        match self.current.kind {
            TokenType::Int => {
                let text = self.interner.resolve(self.current.text).to_owned();
                self.bump();
                let value = text.parse::<i64>().unwrap_or(0);
                Ok(Expr::Int(value, loc))
            }
            TokenType::Flt => {
                let text = self.interner.resolve(self.current.text).to_owned();
                self.bump();
                let value = text.parse::<f64>().unwrap_or(0.0);
                Ok(Expr::Dbl(value, loc))
            }
            TokenType::Str => {
                let id = self.current.text;
                self.bump();
                Ok(Expr::Str(id, loc))
            }
            TokenType::True => {
                self.bump();
                Ok(Expr::Bool(true, loc))
            }
            TokenType::False => {
                self.bump();
                Ok(Expr::Bool(false, loc))
            }
            TokenType::Null => {
                self.bump();
                Ok(Expr::Null(loc))
            }
            TokenType::LParen => {
                self.bump();
                let expr = self.parse_expression()?;
                self.expect(TokenType::RParen, "')'")?;
                Ok(expr)
            }
            TokenType::LBracket => self.parse_array_literal(),
            TokenType::Ident => self.parse_ident_primary(),
            _ => {
                let got = self.interner.resolve(self.current.text).to_owned();
                Err(self.fail(format!("unexpected token '{got}'")))
            }
        }
    }

    /// Disambiguates: `name(` is a call, `name:ident(` is a library call,
    /// `Name { ... }` is an object literal / type declaration, anything else
    /// is a bare variable reference (spec.md §4.1).
    fn parse_ident_primary(&mut self) -> PResult<Expr> {
        let loc = self.srcloc();
        let name = self.current.text;
        self.bump();
        if self.check(TokenType::Colon) {
            self.bump();
            let fn_name = self.parse_identifier("library function name")?;
            self.expect(TokenType::LParen, "'('")?;
            let args = self.parse_arg_list()?;
            self.expect(TokenType::RParen, "')'")?;
            return Ok(Expr::LibCall { lib: name, name: fn_name, args, loc });
        }
        if self.check(TokenType::LBrace) {
            return self.parse_object_literal(name, loc);
        }
        Ok(Expr::Var(name, loc))
    }

    fn parse_object_literal(&mut self, type_name: StringId, loc: SrcLoc) -> PResult<Expr> {
        self.expect(TokenType::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.check(TokenType::RBrace) {
            let key = self.parse_identifier("field name")?;
            self.expect(TokenType::Equal, "'='")?;
            let value = self.parse_expression()?;
            fields.push((key, value));
            if !self.matches(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RBrace, "'}'")?;
        Ok(Expr::ObjectLit { type_name, fields, loc })
    }

    /// Parses `[e1, e2, key => value, ...]`, processing exactly one child per
    /// iteration — the fix spec.md §9 calls for over the original's
    /// two-links-per-iteration walk, which risked mis-parsing mixed bare and
    /// keyed elements.
    fn parse_array_literal(&mut self) -> PResult<Expr> {
        let loc = self.srcloc();
        self.bump();
        let mut elements = Vec::new();
        while !self.check(TokenType::RBracket) {
            let first = self.parse_expression()?;
            if self.matches(TokenType::Arrow) {
                let value = self.parse_expression()?;
                elements.push(ArrayElement::KeyValue(first, value));
            } else {
                elements.push(ArrayElement::Bare(first));
            }
            if !self.matches(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RBracket, "']'")?;
        Ok(Expr::ArrayLit { elements, loc })
    }
}

#[cfg(test)]
mod tests {
    use super::Parser;
    use crate::ast::{ArrayElement, Expr, Stmt};
    use crate::intern::Interner;

    fn parse_ok(src: &str) -> (crate::ast::Program, Interner) {
        let mut interner = Interner::new();
        let result = Parser::new(src, "<test>", &mut interner, false).parse();
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        (result.program, interner)
    }

    #[test]
    fn arithmetic_precedence() {
        let (program, _) = parse_ok("print(1 + 2 * 3);");
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn array_literal_mixes_bare_and_keyed() {
        let (program, _) = parse_ok(r#"a = [10, 20, "x" => 30];"#);
        let Stmt::Expr(Expr::Assign { value, .. }) = &program[0] else {
            panic!("expected assignment statement");
        };
        let Expr::ArrayLit { elements, .. } = value.as_ref() else {
            panic!("expected array literal");
        };
        assert_eq!(elements.len(), 3);
        assert!(matches!(elements[0], ArrayElement::Bare(_)));
        assert!(matches!(elements[2], ArrayElement::KeyValue(_, _)));
    }

    #[test]
    fn incomplete_input_is_flagged_without_diagnostics() {
        let mut interner = Interner::new();
        let result = Parser::new("if (x", "<test>", &mut interner, true).parse();
        assert!(result.incomplete);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn strict_mode_reports_and_recovers() {
        let mut interner = Interner::new();
        let result = Parser::new("x = ; y = 1;", "<test>", &mut interner, false).parse();
        assert!(!result.errors.is_empty());
        assert_eq!(program_stmt_count(&result.program), 1, "recovers and parses the following statement");
    }

    fn program_stmt_count(program: &[Stmt]) -> usize {
        program.len()
    }
}
