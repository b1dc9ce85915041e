//! Pratt-style operator-precedence parser producing the AST.
//!
//! Parse errors are collected rather than aborting on the first failure; the
//! parser synchronizes at statement boundaries and keeps going so a script
//! with several mistakes reports them all.

use crate::{
    ast::{
        AssignTarget, BinOp, Block, CmpOp, ExceptHandler, Expr, ExprKind, FStringPart, FunctionDef, Param, PrefixOp,
        Program, Stmt, StmtKind,
    },
    exception::{ExcType, Exception},
    lex::{FStringPiece, LexError, Lexer, Token, TokenKind},
};

/// A single parse failure with its source line.
#[derive(Debug, Clone)]
pub(crate) struct ParseError {
    pub message: String,
    pub line: u32,
    pub kind: ExcType,
}

impl ParseError {
    fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
            kind: ExcType::ParseError,
        }
    }

    pub(crate) fn into_exception(self) -> Exception {
        Exception::new(self.kind, self.message).with_line(self.line)
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            kind: if err.indent { ExcType::IndentError } else { ExcType::ParseError },
            message: err.message,
            line: err.line,
        }
    }
}

/// Operator binding strength, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Or,
    And,
    NotPrec,
    Compare,
    Sum,
    Product,
    Power,
    Prefix,
    Call,
}

type ParseResult<T> = Result<T, ParseError>;

/// Parses a complete script, returning every collected error on failure.
pub(crate) fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(source);
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(parser.errors)
    }
}

struct Parser {
    lexer: Lexer,
    cur: Token,
    peek: Token,
    errors: Vec<ParseError>,
    /// Set when the lexer itself fails; the token stream ends early.
    lexer_failed: bool,
}

impl Parser {
    fn new(source: &str) -> Self {
        let mut parser = Self {
            lexer: Lexer::new(source),
            cur: Token { kind: TokenKind::Eof, line: 1 },
            peek: Token { kind: TokenKind::Eof, line: 1 },
            errors: Vec::new(),
            lexer_failed: false,
        };
        parser.advance();
        parser.advance();
        parser
    }

    fn advance(&mut self) {
        let next = if self.lexer_failed {
            Token {
                kind: TokenKind::Eof,
                line: self.peek.line,
            }
        } else {
            match self.lexer.next_token() {
                Ok(token) => token,
                Err(err) => {
                    let line = err.line;
                    self.errors.push(err.into());
                    self.lexer_failed = true;
                    Token { kind: TokenKind::Eof, line }
                }
            }
        };
        self.cur = std::mem::replace(&mut self.peek, next);
    }

    fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        self.skip_newlines();
        while self.cur.kind != TokenKind::Eof {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
            self.skip_newlines();
        }
        Program { statements }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.cur.kind, TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Skips ahead to the next statement boundary after an error.
    fn synchronize(&mut self) {
        loop {
            match self.cur.kind {
                TokenKind::Eof => return,
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Dedent => {
                    self.advance();
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.cur.line)
    }

    fn unexpected(&self, wanted: &str) -> ParseError {
        self.error_here(format!("expected {wanted}, got {}", self.cur.kind.describe()))
    }

    fn expect(&mut self, kind: &TokenKind, wanted: &str) -> ParseResult<()> {
        if &self.cur.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(wanted))
        }
    }

    fn expect_ident(&mut self, wanted: &str) -> ParseResult<String> {
        if let TokenKind::Ident(name) = &self.cur.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected(wanted))
        }
    }

    // === Statements ===

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let stmt = match self.cur.kind {
            TokenKind::If => return self.parse_if(),
            TokenKind::While => return self.parse_while(),
            TokenKind::For => return self.parse_for(),
            TokenKind::Def => return self.parse_def(),
            TokenKind::Class => return self.parse_class(),
            TokenKind::Try => return self.parse_try(),
            _ => self.parse_simple_statement()?,
        };
        self.end_of_statement()?;
        Ok(stmt)
    }

    /// Statements that fit on one line; used directly by inline suites.
    fn parse_simple_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.cur.line;
        let kind = match self.cur.kind {
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression_list()?)
                };
                StmtKind::Return(value)
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Raise => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression(Precedence::Lowest)?)
                };
                StmtKind::Raise(value)
            }
            TokenKind::Import => {
                self.advance();
                let path = self.parse_dotted_name()?;
                let alias = if self.cur.kind == TokenKind::As {
                    self.advance();
                    Some(self.expect_ident("alias name after 'as'")?)
                } else {
                    None
                };
                StmtKind::Import { path, alias }
            }
            TokenKind::Global => {
                self.advance();
                StmtKind::Global(self.parse_name_list()?)
            }
            TokenKind::Nonlocal => {
                self.advance();
                StmtKind::Nonlocal(self.parse_name_list()?)
            }
            TokenKind::Assert => {
                self.advance();
                let cond = self.parse_expression(Precedence::Lowest)?;
                let message = if self.cur.kind == TokenKind::Comma {
                    self.advance();
                    Some(self.parse_expression(Precedence::Lowest)?)
                } else {
                    None
                };
                StmtKind::Assert { cond, message }
            }
            _ => return self.parse_expression_statement(),
        };
        Ok(Stmt { kind, line })
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.cur.kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Dedent | TokenKind::Eof
        )
    }

    fn end_of_statement(&mut self) -> ParseResult<()> {
        match self.cur.kind {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::Dedent | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn parse_dotted_name(&mut self) -> ParseResult<String> {
        let mut path = self.expect_ident("library name after 'import'")?;
        while self.cur.kind == TokenKind::Dot {
            self.advance();
            path.push('.');
            path.push_str(&self.expect_ident("name after '.'")?);
        }
        Ok(path)
    }

    fn parse_name_list(&mut self) -> ParseResult<Vec<String>> {
        let mut names = vec![self.expect_ident("variable name")?];
        while self.cur.kind == TokenKind::Comma {
            self.advance();
            names.push(self.expect_ident("variable name")?);
        }
        Ok(names)
    }

    /// Expression statement, assignment, multiple assignment, or augmented
    /// assignment.
    fn parse_expression_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.cur.line;
        let first = self.parse_expression(Precedence::Lowest)?;

        let mut lhs = vec![first];
        while self.cur.kind == TokenKind::Comma {
            self.advance();
            if self.at_statement_end() || self.cur.kind == TokenKind::Assign {
                break;
            }
            lhs.push(self.parse_expression(Precedence::Lowest)?);
        }

        if self.cur.kind == TokenKind::Assign {
            self.advance();
            let value = self.parse_expression_list()?;
            if lhs.len() == 1 {
                let target = self.expr_to_target(lhs.pop().unwrap_or_else(|| Expr {
                    kind: ExprKind::NoneLit,
                    line,
                }))?;
                return Ok(Stmt {
                    kind: StmtKind::Assign { target, value },
                    line,
                });
            }
            let mut targets = Vec::with_capacity(lhs.len());
            for expr in lhs {
                targets.push(self.expr_to_target(expr)?);
            }
            return Ok(Stmt {
                kind: StmtKind::MultiAssign { targets, value },
                line,
            });
        }

        if lhs.len() == 1 {
            let aug_op = match self.cur.kind {
                TokenKind::PlusAssign => Some(BinOp::Add),
                TokenKind::MinusAssign => Some(BinOp::Sub),
                TokenKind::StarAssign => Some(BinOp::Mul),
                TokenKind::SlashAssign => Some(BinOp::Div),
                TokenKind::PercentAssign => Some(BinOp::Mod),
                _ => None,
            };
            if let Some(op) = aug_op {
                self.advance();
                let value = self.parse_expression(Precedence::Lowest)?;
                let target = self.expr_to_target(lhs.pop().unwrap_or_else(|| Expr {
                    kind: ExprKind::NoneLit,
                    line,
                }))?;
                return Ok(Stmt {
                    kind: StmtKind::AugAssign { target, op, value },
                    line,
                });
            }
        }

        let expr = if lhs.len() == 1 {
            lhs.pop().unwrap_or_else(|| Expr {
                kind: ExprKind::NoneLit,
                line,
            })
        } else {
            Expr {
                kind: ExprKind::Tuple(lhs),
                line,
            }
        };
        Ok(Stmt {
            kind: StmtKind::Expr(expr),
            line,
        })
    }

    /// `a` or `a, b, c` — a bare comma list packs into a tuple.
    fn parse_expression_list(&mut self) -> ParseResult<Expr> {
        let line = self.cur.line;
        let first = self.parse_expression(Precedence::Lowest)?;
        if self.cur.kind != TokenKind::Comma {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.cur.kind == TokenKind::Comma {
            self.advance();
            if self.at_statement_end() {
                break;
            }
            items.push(self.parse_expression(Precedence::Lowest)?);
        }
        Ok(Expr {
            kind: ExprKind::Tuple(items),
            line,
        })
    }

    fn expr_to_target(&self, expr: Expr) -> ParseResult<AssignTarget> {
        match expr.kind {
            ExprKind::Ident(name) => Ok(AssignTarget::Name(name)),
            ExprKind::Index { obj, index } => Ok(AssignTarget::Index {
                obj: *obj,
                index: *index,
            }),
            ExprKind::Attr { obj, name } => Ok(AssignTarget::Attr { obj: *obj, name }),
            _ => Err(ParseError::new("cannot assign to this expression", expr.line)),
        }
    }

    // === Compound statements ===

    /// `:` followed by either an indented block or inline simple statements.
    fn parse_suite(&mut self) -> ParseResult<Block> {
        self.expect(&TokenKind::Colon, "':'")?;
        if self.cur.kind == TokenKind::Newline {
            self.advance();
            self.expect(&TokenKind::Indent, "an indented block")?;
            let mut statements = Vec::new();
            while !matches!(self.cur.kind, TokenKind::Dedent | TokenKind::Eof) {
                statements.push(self.parse_statement()?);
                self.skip_newlines();
            }
            if self.cur.kind == TokenKind::Dedent {
                self.advance();
            }
            if statements.is_empty() {
                return Err(self.error_here("expected at least one statement in block"));
            }
            return Ok(statements);
        }

        // Inline suite: one or more simple statements on the same line.
        let mut statements = Vec::new();
        loop {
            let stmt = self.parse_simple_statement()?;
            statements.push(stmt);
            match self.cur.kind {
                TokenKind::Semicolon => {
                    self.advance();
                    if matches!(self.cur.kind, TokenKind::Newline | TokenKind::Eof) {
                        self.advance();
                        break;
                    }
                }
                TokenKind::Newline => {
                    self.advance();
                    break;
                }
                TokenKind::Eof | TokenKind::Dedent => break,
                _ => return Err(self.unexpected("end of statement")),
            }
        }
        Ok(statements)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let line = self.cur.line;
        self.advance();
        let cond = self.parse_expression(Precedence::Lowest)?;
        let block = self.parse_suite()?;
        let mut branches = vec![(cond, block)];
        let mut else_block = None;
        loop {
            match self.cur.kind {
                TokenKind::Elif => {
                    self.advance();
                    let cond = self.parse_expression(Precedence::Lowest)?;
                    let block = self.parse_suite()?;
                    branches.push((cond, block));
                }
                TokenKind::Else => {
                    self.advance();
                    else_block = Some(self.parse_suite()?);
                    break;
                }
                _ => break,
            }
        }
        Ok(Stmt {
            kind: StmtKind::If { branches, else_block },
            line,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let line = self.cur.line;
        self.advance();
        let cond = self.parse_expression(Precedence::Lowest)?;
        let body = self.parse_suite()?;
        Ok(Stmt {
            kind: StmtKind::While { cond, body },
            line,
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let line = self.cur.line;
        self.advance();
        let targets = self.parse_name_list()?;
        self.expect(&TokenKind::In, "'in'")?;
        let iterable = self.parse_expression(Precedence::Lowest)?;
        let body = self.parse_suite()?;
        Ok(Stmt {
            kind: StmtKind::For { targets, iterable, body },
            line,
        })
    }

    fn parse_def(&mut self) -> ParseResult<Stmt> {
        let line = self.cur.line;
        self.advance();
        let name = self.expect_ident("function name after 'def'")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let params = self.parse_params(&TokenKind::RParen)?;
        self.expect(&TokenKind::RParen, "')'")?;
        let body = self.parse_suite()?;
        let doc = block_docstring(&body);
        Ok(Stmt {
            kind: StmtKind::Def(FunctionDef { name, params, body, doc }),
            line,
        })
    }

    fn parse_params(&mut self, terminator: &TokenKind) -> ParseResult<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        let mut seen_default = false;
        let mut seen_variadic = false;
        while &self.cur.kind != terminator {
            if seen_variadic {
                return Err(self.error_here("no parameters allowed after '*args'"));
            }
            if self.cur.kind == TokenKind::Star {
                self.advance();
                let name = self.expect_ident("parameter name after '*'")?;
                params.push(Param {
                    name,
                    default: None,
                    variadic: true,
                });
                seen_variadic = true;
            } else {
                let name = self.expect_ident("parameter name")?;
                if params.iter().any(|p| p.name == name) {
                    return Err(self.error_here(format!("duplicate parameter '{name}'")));
                }
                let default = if self.cur.kind == TokenKind::Assign {
                    self.advance();
                    seen_default = true;
                    Some(self.parse_expression(Precedence::Lowest)?)
                } else {
                    if seen_default {
                        return Err(self.error_here("non-default parameter follows default parameter"));
                    }
                    None
                };
                params.push(Param {
                    name,
                    default,
                    variadic: false,
                });
            }
            if self.cur.kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn parse_class(&mut self) -> ParseResult<Stmt> {
        let line = self.cur.line;
        self.advance();
        let name = self.expect_ident("class name after 'class'")?;
        let base = if self.cur.kind == TokenKind::LParen {
            self.advance();
            if self.cur.kind == TokenKind::RParen {
                self.advance();
                None
            } else {
                let base = self.parse_expression(Precedence::Lowest)?;
                self.expect(&TokenKind::RParen, "')'")?;
                Some(base)
            }
        } else {
            None
        };
        let body = self.parse_suite()?;
        Ok(Stmt {
            kind: StmtKind::Class { name, base, body },
            line,
        })
    }

    fn parse_try(&mut self) -> ParseResult<Stmt> {
        let line = self.cur.line;
        self.advance();
        let body = self.parse_suite()?;
        let mut handlers = Vec::new();
        while self.cur.kind == TokenKind::Except {
            self.advance();
            let kind = if let TokenKind::Ident(name) = &self.cur.kind {
                let name = name.clone();
                self.advance();
                Some(name)
            } else {
                None
            };
            let alias = if self.cur.kind == TokenKind::As {
                if kind.is_none() {
                    return Err(self.error_here("'as' requires an exception name to match"));
                }
                self.advance();
                Some(self.expect_ident("variable name after 'as'")?)
            } else {
                None
            };
            let handler_body = self.parse_suite()?;
            handlers.push(ExceptHandler {
                kind,
                alias,
                body: handler_body,
            });
        }
        let finally = if self.cur.kind == TokenKind::Finally {
            self.advance();
            Some(self.parse_suite()?)
        } else {
            None
        };
        if handlers.is_empty() && finally.is_none() {
            return Err(self.error_here("'try' requires at least one 'except' or 'finally'"));
        }
        Ok(Stmt {
            kind: StmtKind::Try { body, handlers, finally },
            line,
        })
    }

    // === Expressions ===

    fn parse_expression(&mut self, prec: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;
        loop {
            let next = self.cur_precedence();
            if prec >= next {
                return Ok(left);
            }
            left = self.parse_infix(left)?;
        }
    }

    fn cur_precedence(&self) -> Precedence {
        match self.cur.kind {
            TokenKind::Or => Precedence::Or,
            TokenKind::And => Precedence::And,
            TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::In => Precedence::Compare,
            // `not in` in infix position.
            TokenKind::Not if self.peek.kind == TokenKind::In => Precedence::Compare,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
            TokenKind::StarStar => Precedence::Power,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let line = self.cur.line;
        let kind = match &self.cur.kind {
            TokenKind::Int(n) => {
                let n = *n;
                self.advance();
                ExprKind::Int(n)
            }
            TokenKind::Float(f) => {
                let f = *f;
                self.advance();
                ExprKind::Float(f)
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                ExprKind::Str(s)
            }
            TokenKind::FString(pieces) => {
                let pieces = pieces.clone();
                self.advance();
                self.build_fstring(&pieces, line)?
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::None => {
                self.advance();
                ExprKind::NoneLit
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                ExprKind::Ident(name)
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_expression(Precedence::Prefix)?;
                ExprKind::Prefix {
                    op: PrefixOp::Neg,
                    operand: Box::new(operand),
                }
            }
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_expression(Precedence::NotPrec)?;
                ExprKind::Prefix {
                    op: PrefixOp::Not,
                    operand: Box::new(operand),
                }
            }
            TokenKind::Lambda => {
                self.advance();
                let params = self.parse_params(&TokenKind::Colon)?;
                self.expect(&TokenKind::Colon, "':'")?;
                let body = self.parse_expression(Precedence::Lowest)?;
                ExprKind::Lambda {
                    params,
                    body: Box::new(body),
                }
            }
            TokenKind::LParen => self.parse_paren_expr()?,
            TokenKind::LBracket => self.parse_list_expr()?,
            TokenKind::LBrace => self.parse_dict_expr()?,
            _ => return Err(self.unexpected("an expression")),
        };
        Ok(Expr { kind, line })
    }

    fn parse_paren_expr(&mut self) -> ParseResult<ExprKind> {
        self.advance();
        if self.cur.kind == TokenKind::RParen {
            self.advance();
            return Ok(ExprKind::Tuple(vec![]));
        }
        let first = self.parse_expression(Precedence::Lowest)?;
        if self.cur.kind == TokenKind::Comma {
            let mut items = vec![first];
            while self.cur.kind == TokenKind::Comma {
                self.advance();
                if self.cur.kind == TokenKind::RParen {
                    break;
                }
                items.push(self.parse_expression(Precedence::Lowest)?);
            }
            self.expect(&TokenKind::RParen, "')'")?;
            return Ok(ExprKind::Tuple(items));
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(first.kind)
    }

    fn parse_list_expr(&mut self) -> ParseResult<ExprKind> {
        self.advance();
        if self.cur.kind == TokenKind::RBracket {
            self.advance();
            return Ok(ExprKind::List(vec![]));
        }
        let first = self.parse_expression(Precedence::Lowest)?;
        if self.cur.kind == TokenKind::For {
            let (targets, iterable, cond) = self.parse_comp_clause()?;
            self.expect(&TokenKind::RBracket, "']'")?;
            return Ok(ExprKind::ListComp {
                value: Box::new(first),
                targets,
                iterable: Box::new(iterable),
                cond: cond.map(Box::new),
            });
        }
        let mut items = vec![first];
        while self.cur.kind == TokenKind::Comma {
            self.advance();
            if self.cur.kind == TokenKind::RBracket {
                break;
            }
            items.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(ExprKind::List(items))
    }

    fn parse_dict_expr(&mut self) -> ParseResult<ExprKind> {
        self.advance();
        if self.cur.kind == TokenKind::RBrace {
            self.advance();
            return Ok(ExprKind::Dict(vec![]));
        }
        let key = self.parse_expression(Precedence::Lowest)?;
        self.expect(&TokenKind::Colon, "':'")?;
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.cur.kind == TokenKind::For {
            let (targets, iterable, cond) = self.parse_comp_clause()?;
            self.expect(&TokenKind::RBrace, "'}'")?;
            return Ok(ExprKind::DictComp {
                key: Box::new(key),
                value: Box::new(value),
                targets,
                iterable: Box::new(iterable),
                cond: cond.map(Box::new),
            });
        }
        let mut entries = vec![(key, value)];
        while self.cur.kind == TokenKind::Comma {
            self.advance();
            if self.cur.kind == TokenKind::RBrace {
                break;
            }
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect(&TokenKind::Colon, "':'")?;
            let value = self.parse_expression(Precedence::Lowest)?;
            entries.push((key, value));
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(ExprKind::Dict(entries))
    }

    /// `for targets in iterable [if cond]` inside a comprehension.
    fn parse_comp_clause(&mut self) -> ParseResult<(Vec<String>, Expr, Option<Expr>)> {
        self.expect(&TokenKind::For, "'for'")?;
        let targets = self.parse_name_list()?;
        self.expect(&TokenKind::In, "'in'")?;
        let iterable = self.parse_expression(Precedence::Lowest)?;
        let cond = if self.cur.kind == TokenKind::If {
            self.advance();
            Some(self.parse_expression(Precedence::Lowest)?)
        } else {
            None
        };
        Ok((targets, iterable, cond))
    }

    fn build_fstring(&mut self, pieces: &[FStringPiece], line: u32) -> ParseResult<ExprKind> {
        let mut parts = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                FStringPiece::Literal(text) => parts.push(FStringPart::Literal(text.clone())),
                FStringPiece::Expr { source, spec } => {
                    let expr = parse_embedded_expression(source, line)?;
                    parts.push(FStringPart::Expr {
                        expr: Box::new(expr),
                        spec: spec.clone(),
                    });
                }
            }
        }
        Ok(ExprKind::FString(parts))
    }

    fn parse_infix(&mut self, left: Expr) -> ParseResult<Expr> {
        let line = self.cur.line;
        match self.cur.kind {
            TokenKind::Or | TokenKind::And => {
                let and = self.cur.kind == TokenKind::And;
                let prec = self.cur_precedence();
                self.advance();
                let right = self.parse_expression(prec)?;
                Ok(Expr {
                    kind: ExprKind::BoolOp {
                        and,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    line,
                })
            }
            TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::In
            | TokenKind::Not => self.parse_comparison(left),
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash | TokenKind::Percent => {
                let op = match self.cur.kind {
                    TokenKind::Plus => BinOp::Add,
                    TokenKind::Minus => BinOp::Sub,
                    TokenKind::Star => BinOp::Mul,
                    TokenKind::Slash => BinOp::Div,
                    _ => BinOp::Mod,
                };
                let prec = self.cur_precedence();
                self.advance();
                let right = self.parse_expression(prec)?;
                Ok(Expr {
                    kind: ExprKind::Infix {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    line,
                })
            }
            TokenKind::StarStar => {
                self.advance();
                // Right-associative: parse the right side one level below Power.
                let right = self.parse_expression(Precedence::Product)?;
                Ok(Expr {
                    kind: ExprKind::Infix {
                        op: BinOp::Pow,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    line,
                })
            }
            TokenKind::LParen => self.parse_call(left),
            TokenKind::LBracket => self.parse_index(left),
            TokenKind::Dot => {
                self.advance();
                let name = self.expect_ident("attribute name after '.'")?;
                Ok(Expr {
                    kind: ExprKind::Attr {
                        obj: Box::new(left),
                        name,
                    },
                    line,
                })
            }
            _ => Err(self.unexpected("an operator")),
        }
    }

    /// Builds a comparison chain: `a < b < c` evaluates each middle term once.
    fn parse_comparison(&mut self, left: Expr) -> ParseResult<Expr> {
        let line = left.line;
        let mut rest = Vec::new();
        loop {
            let op = match self.cur.kind {
                TokenKind::Eq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::NotEq,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::LtEq => CmpOp::LtEq,
                TokenKind::GtEq => CmpOp::GtEq,
                TokenKind::In => CmpOp::In,
                TokenKind::Not if self.peek.kind == TokenKind::In => {
                    self.advance();
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.advance();
            let right = self.parse_expression(Precedence::Compare)?;
            rest.push((op, right));
        }
        if rest.is_empty() {
            return Err(self.unexpected("a comparison operator"));
        }
        Ok(Expr {
            kind: ExprKind::Compare {
                first: Box::new(left),
                rest,
            },
            line,
        })
    }

    fn parse_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let line = self.cur.line;
        self.advance();
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        if self.cur.kind == TokenKind::RParen {
            self.advance();
            return Ok(Expr {
                kind: ExprKind::Call {
                    callee: Box::new(callee),
                    args,
                    kwargs,
                },
                line,
            });
        }
        loop {
            if let TokenKind::Ident(name) = &self.cur.kind {
                if self.peek.kind == TokenKind::Assign {
                    let name = name.clone();
                    self.advance();
                    self.advance();
                    let value = self.parse_expression(Precedence::Lowest)?;
                    if kwargs.iter().any(|(k, _)| k == &name) {
                        return Err(ParseError::new(format!("duplicate keyword argument '{name}'"), line));
                    }
                    kwargs.push((name, value));
                    if !self.call_args_continue()? {
                        break;
                    }
                    continue;
                }
            }
            let expr = self.parse_expression(Precedence::Lowest)?;
            // A generator expression in call position evaluates eagerly as a list.
            if self.cur.kind == TokenKind::For && args.is_empty() && kwargs.is_empty() {
                let (targets, iterable, cond) = self.parse_comp_clause()?;
                self.expect(&TokenKind::RParen, "')'")?;
                let comp = Expr {
                    kind: ExprKind::ListComp {
                        value: Box::new(expr),
                        targets,
                        iterable: Box::new(iterable),
                        cond: cond.map(Box::new),
                    },
                    line,
                };
                return Ok(Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(callee),
                        args: vec![comp],
                        kwargs,
                    },
                    line,
                });
            }
            if !kwargs.is_empty() {
                return Err(ParseError::new("positional argument follows keyword argument", line));
            }
            args.push(expr);
            if !self.call_args_continue()? {
                break;
            }
        }
        Ok(Expr {
            kind: ExprKind::Call {
                callee: Box::new(callee),
                args,
                kwargs,
            },
            line,
        })
    }

    /// Consumes the separator after a call argument. Returns false once the
    /// closing parenthesis has been consumed.
    fn call_args_continue(&mut self) -> ParseResult<bool> {
        match self.cur.kind {
            TokenKind::Comma => {
                self.advance();
                if self.cur.kind == TokenKind::RParen {
                    self.advance();
                    return Ok(false);
                }
                Ok(true)
            }
            TokenKind::RParen => {
                self.advance();
                Ok(false)
            }
            _ => Err(self.unexpected("',' or ')'")),
        }
    }

    fn parse_index(&mut self, obj: Expr) -> ParseResult<Expr> {
        let line = self.cur.line;
        self.advance();
        let start = if matches!(self.cur.kind, TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        if self.cur.kind == TokenKind::Colon {
            self.advance();
            let end = if matches!(self.cur.kind, TokenKind::Colon | TokenKind::RBracket) {
                None
            } else {
                Some(self.parse_expression(Precedence::Lowest)?)
            };
            let step = if self.cur.kind == TokenKind::Colon {
                self.advance();
                if self.cur.kind == TokenKind::RBracket {
                    None
                } else {
                    Some(self.parse_expression(Precedence::Lowest)?)
                }
            } else {
                None
            };
            self.expect(&TokenKind::RBracket, "']'")?;
            return Ok(Expr {
                kind: ExprKind::Slice {
                    obj: Box::new(obj),
                    start: start.map(Box::new),
                    end: end.map(Box::new),
                    step: step.map(Box::new),
                },
                line,
            });
        }
        let index = start.ok_or_else(|| self.unexpected("an index expression"))?;
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(Expr {
            kind: ExprKind::Index {
                obj: Box::new(obj),
                index: Box::new(index),
            },
            line,
        })
    }
}

/// Extracts a leading string-literal docstring from a block.
fn block_docstring(body: &[Stmt]) -> Option<String> {
    if let Some(Stmt {
        kind: StmtKind::Expr(Expr {
            kind: ExprKind::Str(text),
            ..
        }),
        ..
    }) = body.first()
    {
        Some(text.clone())
    } else {
        None
    }
}

/// Parses an f-string embedded expression, attributing errors to the line of
/// the surrounding literal.
fn parse_embedded_expression(source: &str, line: u32) -> ParseResult<Expr> {
    let mut parser = Parser::new(source);
    let expr = parser
        .parse_expression(Precedence::Lowest)
        .map_err(|err| ParseError::new(format!("in f-string expression: {}", err.message), line))?;
    if !matches!(parser.cur.kind, TokenKind::Newline | TokenKind::Eof) {
        return Err(ParseError::new(
            format!("unexpected {} in f-string expression", parser.cur.kind.describe()),
            line,
        ));
    }
    if let Some(err) = parser.errors.into_iter().next() {
        return Err(ParseError::new(format!("in f-string expression: {}", err.message), line));
    }
    let mut expr = expr;
    expr.line = line;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        match parse(source) {
            Ok(program) => program,
            Err(errors) => panic!("parse failed: {:?}", errors),
        }
    }

    fn parse_err(source: &str) -> Vec<ParseError> {
        match parse(source) {
            Ok(_) => panic!("expected parse failure"),
            Err(errors) => errors,
        }
    }

    #[test]
    fn simple_assignment() {
        let program = parse_ok("x = 1 + 2 * 3\n");
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn chained_comparison_is_one_node() {
        let program = parse_ok("r = 1 < x < 10\n");
        let StmtKind::Assign { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Compare { rest, .. } = &value.kind else {
            panic!("expected comparison, got {:?}", value.kind);
        };
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn power_is_right_associative() {
        let program = parse_ok("r = 2 ** 3 ** 2\n");
        let StmtKind::Assign { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Infix { op: BinOp::Pow, right, .. } = &value.kind else {
            panic!("expected power");
        };
        assert!(matches!(right.kind, ExprKind::Infix { op: BinOp::Pow, .. }));
    }

    #[test]
    fn multiple_assignment_packs_rhs() {
        let program = parse_ok("a, b = b, a\n");
        let StmtKind::MultiAssign { targets, value } = &program.statements[0].kind else {
            panic!("expected multiple assignment");
        };
        assert_eq!(targets.len(), 2);
        assert!(matches!(value.kind, ExprKind::Tuple(_)));
    }

    #[test]
    fn positional_after_keyword_rejected() {
        let errors = parse_err("f(a=1, 2)\n");
        assert!(errors[0].message.contains("positional argument follows"));
    }

    #[test]
    fn duplicate_keyword_rejected() {
        let errors = parse_err("f(a=1, a=2)\n");
        assert!(errors[0].message.contains("duplicate keyword"));
    }

    #[test]
    fn inline_suite() {
        let program = parse_ok("def f(n):\n    if n <= 1: return n\n    return 2\n");
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn parser_collects_multiple_errors() {
        let errors = parse_err("x = = 1\ny = ) 2\n");
        assert!(errors.len() >= 2, "got {errors:?}");
    }

    #[test]
    fn comprehension_with_guard() {
        let program = parse_ok("r = [x * 2 for x in xs if x > 1]\n");
        let StmtKind::Assign { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value.kind, ExprKind::ListComp { .. }));
    }

    #[test]
    fn slice_parts_optional() {
        parse_ok("r = xs[1:]\ns = xs[:2]\nt = xs[::2]\nu = xs[1:5:2]\n");
    }

    #[test]
    fn import_with_alias() {
        let program = parse_ok("import a.b.c as child\n");
        let StmtKind::Import { path, alias } = &program.statements[0].kind else {
            panic!("expected import");
        };
        assert_eq!(path, "a.b.c");
        assert_eq!(alias.as_deref(), Some("child"));
    }
}
