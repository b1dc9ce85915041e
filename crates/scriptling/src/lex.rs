//! Lexer: converts source text into a token stream.
//!
//! Layout-sensitive blocks are handled here: the lexer maintains an indent
//! stack and emits `Indent`/`Dedent`/`Newline` tokens, suppressed inside
//! `()`/`[]`/`{}`. Adjacent string and f-string literals are merged into a
//! single token (implicit concatenation), which never crosses a `Newline` or
//! `Semicolon` token because those appear between the literals.

use std::collections::VecDeque;

use crate::exception::{ExcType, Exception};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    FString(Vec<FStringPiece>),

    // Keywords
    Def,
    Class,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Return,
    Break,
    Continue,
    Pass,
    Try,
    Except,
    Finally,
    Raise,
    Import,
    Global,
    Nonlocal,
    Assert,
    Lambda,
    And,
    Or,
    Not,
    True,
    False,
    None,
    As,

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,

    // Punctuation
    Comma,
    Colon,
    Semicolon,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Short description used in parse error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{name}'"),
            Self::Int(n) => format!("integer '{n}'"),
            Self::Float(f) => format!("float '{f}'"),
            Self::Str(_) => "string literal".to_owned(),
            Self::FString(_) => "f-string literal".to_owned(),
            Self::Newline => "end of line".to_owned(),
            Self::Indent => "indent".to_owned(),
            Self::Dedent => "dedent".to_owned(),
            Self::Eof => "end of file".to_owned(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::Def => "def",
            Self::Class => "class",
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::While => "while",
            Self::For => "for",
            Self::In => "in",
            Self::Return => "return",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Pass => "pass",
            Self::Try => "try",
            Self::Except => "except",
            Self::Finally => "finally",
            Self::Raise => "raise",
            Self::Import => "import",
            Self::Global => "global",
            Self::Nonlocal => "nonlocal",
            Self::Assert => "assert",
            Self::Lambda => "lambda",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::True => "True",
            Self::False => "False",
            Self::None => "None",
            Self::As => "as",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::StarStar => "**",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
            Self::PercentAssign => "%=",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Dot => ".",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            _ => "?",
        }
    }
}

/// One segment of an f-string payload as produced by the lexer.
///
/// Embedded expressions are kept as source text; the parser re-parses each
/// one as a full expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FStringPiece {
    Literal(String),
    Expr { source: String, spec: Option<String> },
}

/// A lexical failure, surfaced to callers as a parse error.
#[derive(Debug, Clone)]
pub(crate) struct LexError {
    pub message: String,
    pub line: u32,
    /// True for inconsistent-indentation failures (`IndentError` kind).
    pub indent: bool,
}

impl LexError {
    fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
            indent: false,
        }
    }

    fn indent(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
            indent: true,
        }
    }

    pub(crate) fn into_exception(self) -> Exception {
        let kind = if self.indent { ExcType::IndentError } else { ExcType::ParseError };
        Exception::new(kind, self.message).with_line(self.line)
    }
}

pub(crate) struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    /// Indentation levels of enclosing blocks; always starts with 0.
    indents: Vec<usize>,
    /// Nesting depth of `()`/`[]`/`{}`; layout is insignificant when > 0.
    bracket_depth: usize,
    pending: VecDeque<Token>,
    at_line_start: bool,
    /// One-token lookahead used for implicit string concatenation.
    stashed: Option<Token>,
    eof: bool,
}

impl Lexer {
    pub(crate) fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            indents: vec![0],
            bracket_depth: 0,
            pending: VecDeque::new(),
            at_line_start: true,
            stashed: None,
            eof: false,
        }
    }

    /// Produces the next token, merging adjacent string/f-string literals.
    pub(crate) fn next_token(&mut self) -> Result<Token, LexError> {
        let mut token = self.next_unmerged()?;
        if !matches!(token.kind, TokenKind::Str(_) | TokenKind::FString(_)) {
            return Ok(token);
        }
        loop {
            let next = self.next_unmerged()?;
            if matches!(next.kind, TokenKind::Str(_) | TokenKind::FString(_)) {
                token.kind = merge_string_tokens(token.kind, next.kind);
            } else {
                self.stashed = Some(next);
                return Ok(token);
            }
        }
    }

    fn next_unmerged(&mut self) -> Result<Token, LexError> {
        if let Some(token) = self.stashed.take() {
            return Ok(token);
        }
        if let Some(token) = self.pending.pop_front() {
            return Ok(token);
        }
        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                self.handle_line_start()?;
                if let Some(token) = self.pending.pop_front() {
                    return Ok(token);
                }
            }

            self.skip_spaces_and_comments();

            let Some(c) = self.peek() else {
                return Ok(self.finish());
            };

            if c == '\n' {
                self.advance();
                let newline_line = self.line;
                self.line += 1;
                if self.bracket_depth == 0 && !self.at_line_start {
                    self.at_line_start = true;
                    return Ok(Token {
                        kind: TokenKind::Newline,
                        line: newline_line,
                    });
                }
                // Blank line or newline inside brackets: not significant.
                self.at_line_start = self.bracket_depth == 0;
                continue;
            }

            return self.lex_regular(c);
        }
    }

    fn finish(&mut self) -> Token {
        let line = self.line;
        if !self.eof {
            self.eof = true;
            if !self.at_line_start {
                self.pending.push_back(Token {
                    kind: TokenKind::Newline,
                    line,
                });
            }
            while self.indents.len() > 1 {
                self.indents.pop();
                self.pending.push_back(Token {
                    kind: TokenKind::Dedent,
                    line,
                });
            }
            self.pending.push_back(Token { kind: TokenKind::Eof, line });
            if let Some(token) = self.pending.pop_front() {
                return token;
            }
        }
        Token { kind: TokenKind::Eof, line }
    }

    /// Measures leading whitespace at the start of a logical line and emits
    /// `Indent`/`Dedent` tokens. Blank and comment-only lines are skipped
    /// without affecting the indent stack.
    fn handle_line_start(&mut self) -> Result<(), LexError> {
        loop {
            let mut width = 0usize;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => width += 1,
                    // Tabs advance to the next multiple of 8 columns.
                    '\t' => width += 8 - width % 8,
                    _ => break,
                }
                self.advance();
            }
            match self.peek() {
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    continue;
                }
                Some('#') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                    continue;
                }
                Option::None => {
                    self.at_line_start = false;
                    return Ok(());
                }
                Some(_) => {
                    self.at_line_start = false;
                    let current = *self.indents.last().unwrap_or(&0);
                    if width > current {
                        self.indents.push(width);
                        self.pending.push_back(Token {
                            kind: TokenKind::Indent,
                            line: self.line,
                        });
                    } else if width < current {
                        while self.indents.len() > 1 && *self.indents.last().unwrap_or(&0) > width {
                            self.indents.pop();
                            self.pending.push_back(Token {
                                kind: TokenKind::Dedent,
                                line: self.line,
                            });
                        }
                        if *self.indents.last().unwrap_or(&0) != width {
                            return Err(LexError::indent(
                                "unindent does not match any outer indentation level",
                                self.line,
                            ));
                        }
                    }
                    return Ok(());
                }
            }
        }
    }

    fn skip_spaces_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => self.advance(),
                Some('#') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_regular(&mut self, c: char) -> Result<Token, LexError> {
        let line = self.line;
        if c == '"' || c == '\'' {
            return self.lex_string(false, false);
        }
        if c.is_ascii_digit() {
            return self.lex_number();
        }
        if c.is_alphabetic() || c == '_' {
            return self.lex_ident_or_prefixed_string();
        }

        self.advance();
        let kind = match c {
            '+' => self.with_eq(TokenKind::Plus, TokenKind::PlusAssign),
            '-' => self.with_eq(TokenKind::Minus, TokenKind::MinusAssign),
            '*' => {
                if self.peek() == Some('*') {
                    self.advance();
                    TokenKind::StarStar
                } else {
                    self.with_eq(TokenKind::Star, TokenKind::StarAssign)
                }
            }
            '/' => self.with_eq(TokenKind::Slash, TokenKind::SlashAssign),
            '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentAssign),
            '=' => self.with_eq(TokenKind::Assign, TokenKind::Eq),
            '<' => self.with_eq(TokenKind::Lt, TokenKind::LtEq),
            '>' => self.with_eq(TokenKind::Gt, TokenKind::GtEq),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    return Err(LexError::new("unexpected character '!'", line));
                }
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '(' => {
                self.bracket_depth += 1;
                TokenKind::LParen
            }
            ')' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RParen
            }
            '[' => {
                self.bracket_depth += 1;
                TokenKind::LBracket
            }
            ']' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBracket
            }
            '{' => {
                self.bracket_depth += 1;
                TokenKind::LBrace
            }
            '}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBrace
            }
            other => return Err(LexError::new(format!("unexpected character '{other}'"), line)),
        };
        Ok(Token { kind, line })
    }

    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            with_eq
        } else {
            plain
        }
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let line = self.line;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut offset = 1;
            if matches!(self.peek_at(1), Some('+' | '-')) {
                offset = 2;
            }
            if self.peek_at(offset).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..offset {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let kind = if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| LexError::new(format!("invalid float literal '{text}'"), line))?;
            TokenKind::Float(value)
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| LexError::new(format!("integer literal too large '{text}'"), line))?;
            TokenKind::Int(value)
        };
        Ok(Token { kind, line })
    }

    fn lex_ident_or_prefixed_string(&mut self) -> Result<Token, LexError> {
        let line = self.line;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();

        // String prefixes: f, r, fr, rf in any case, immediately before a quote.
        if matches!(self.peek(), Some('"' | '\'')) {
            let lower = text.to_ascii_lowercase();
            let (is_f, is_raw) = match lower.as_str() {
                "f" => (true, false),
                "r" => (false, true),
                "fr" | "rf" => (true, true),
                _ => (false, false),
            };
            if is_f || is_raw {
                return self.lex_string(is_f, is_raw);
            }
        }

        let kind = match text.as_str() {
            "def" => TokenKind::Def,
            "class" => TokenKind::Class,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "pass" => TokenKind::Pass,
            "try" => TokenKind::Try,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "raise" => TokenKind::Raise,
            "import" => TokenKind::Import,
            "global" => TokenKind::Global,
            "nonlocal" => TokenKind::Nonlocal,
            "assert" => TokenKind::Assert,
            "lambda" => TokenKind::Lambda,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "as" => TokenKind::As,
            _ => TokenKind::Ident(text),
        };
        Ok(Token { kind, line })
    }

    /// Lexes a string starting at the opening quote. Handles single and
    /// triple quoting, escapes (unless raw), and f-string payload splitting.
    fn lex_string(&mut self, is_f: bool, is_raw: bool) -> Result<Token, LexError> {
        let line = self.line;
        let quote = self.peek().unwrap_or('"');
        self.advance();
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut raw_payload = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(LexError::new("unterminated string literal", line));
            };
            if c == quote {
                if triple {
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.advance();
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                    raw_payload.push(c);
                    continue;
                }
                self.advance();
                break;
            }
            if c == '\n' {
                if !triple {
                    return Err(LexError::new("unterminated string literal", line));
                }
                self.line += 1;
            }
            if c == '\\' && !is_raw {
                // Keep the escape for the payload pass so f-string brace
                // escapes are seen before brace splitting.
                self.advance();
                raw_payload.push('\\');
                if let Some(escaped) = self.peek() {
                    self.advance();
                    raw_payload.push(escaped);
                    if escaped == '\n' {
                        self.line += 1;
                    }
                }
                continue;
            }
            self.advance();
            raw_payload.push(c);
        }

        let kind = if is_f {
            TokenKind::FString(split_fstring(&raw_payload, is_raw, line)?)
        } else {
            TokenKind::Str(if is_raw {
                raw_payload
            } else {
                apply_escapes(&raw_payload, false)
            })
        };
        Ok(Token { kind, line })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

/// Resolves backslash escapes in a string payload.
///
/// Inside f-strings, `\{` and `\}` become literal braces. Unknown escapes
/// keep the backslash, matching the reference behavior.
fn apply_escapes(payload: &str, fstring: bool) -> String {
    let mut out = String::with_capacity(payload.len());
    let mut chars = payload.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(c @ ('{' | '}')) if fstring => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            Option::None => out.push('\\'),
        }
    }
    out
}

/// Splits an f-string payload into literal pieces and embedded expression
/// sources with optional `:spec` suffixes. `{{`/`}}` and `\{`/`\}` encode
/// literal braces.
fn split_fstring(payload: &str, is_raw: bool, line: u32) -> Result<Vec<FStringPiece>, LexError> {
    let chars: Vec<char> = payload.chars().collect();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && !is_raw && i + 1 < chars.len() {
            match chars[i + 1] {
                b @ ('{' | '}') => {
                    literal.push(b);
                    i += 2;
                    continue;
                }
                _ => {
                    // Leave other escapes for the literal pass below.
                    literal.push('\\');
                    literal.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
            }
        }
        if c == '{' {
            if chars.get(i + 1) == Some(&'{') {
                literal.push('{');
                i += 2;
                continue;
            }
            if !literal.is_empty() {
                let text = if is_raw { literal.clone() } else { apply_escapes(&literal, true) };
                pieces.push(FStringPiece::Literal(text));
                literal.clear();
            }
            let (source, spec, next) = scan_fstring_expr(&chars, i + 1, line)?;
            pieces.push(FStringPiece::Expr { source, spec });
            i = next;
            continue;
        }
        if c == '}' {
            if chars.get(i + 1) == Some(&'}') {
                literal.push('}');
                i += 2;
                continue;
            }
            return Err(LexError::new("single '}' is not allowed in f-string", line));
        }
        literal.push(c);
        i += 1;
    }
    if !literal.is_empty() {
        let text = if is_raw { literal } else { apply_escapes(&literal, true) };
        pieces.push(FStringPiece::Literal(text));
    }
    Ok(pieces)
}

/// Scans an embedded `{expr[:spec]}` starting just after the `{`.
///
/// Returns the expression source, the optional format spec, and the index
/// just past the closing `}`. Brackets and quotes inside the expression are
/// tracked so colons in subscripts do not start the spec.
fn scan_fstring_expr(chars: &[char], start: usize, line: u32) -> Result<(String, Option<String>, usize), LexError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start;
    let mut colon: Option<usize> = None;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && colon.is_none() => colon = Some(i),
            '}' => {
                if depth == 0 {
                    let expr_end = colon.unwrap_or(i);
                    let source: String = chars[start..expr_end].iter().collect();
                    if source.trim().is_empty() {
                        return Err(LexError::new("empty expression in f-string", line));
                    }
                    let spec = colon.map(|c_idx| chars[c_idx + 1..i].iter().collect());
                    return Ok((source, spec, i + 1));
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    Err(LexError::new("unterminated expression in f-string", line))
}

/// Merges two adjacent string/f-string tokens into one literal.
fn merge_string_tokens(left: TokenKind, right: TokenKind) -> TokenKind {
    match (left, right) {
        (TokenKind::Str(mut a), TokenKind::Str(b)) => {
            a.push_str(&b);
            TokenKind::Str(a)
        }
        (left, right) => {
            let mut pieces = into_pieces(left);
            pieces.extend(into_pieces(right));
            TokenKind::FString(pieces)
        }
    }
}

fn into_pieces(kind: TokenKind) -> Vec<FStringPiece> {
    match kind {
        TokenKind::Str(s) => {
            if s.is_empty() {
                vec![]
            } else {
                vec![FStringPiece::Literal(s)]
            }
        }
        TokenKind::FString(pieces) => pieces,
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().expect("lex failure");
            let done = token.kind == TokenKind::Eof;
            out.push(token.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn indent_dedent_pairs() {
        let toks = kinds("if x:\n    y = 1\nz = 2\n");
        assert!(toks.contains(&TokenKind::Indent));
        assert!(toks.contains(&TokenKind::Dedent));
    }

    #[test]
    fn blank_and_comment_lines_do_not_dedent() {
        let toks = kinds("if x:\n    a = 1\n\n    # comment\n    b = 2\n");
        let dedents = toks.iter().filter(|t| **t == TokenKind::Dedent).count();
        assert_eq!(dedents, 1);
    }

    #[test]
    fn inconsistent_dedent_is_indent_error() {
        let mut lexer = Lexer::new("if x:\n    a = 1\n  b = 2\n");
        let mut err = None;
        for _ in 0..32 {
            match lexer.next_token() {
                Ok(t) if t.kind == TokenKind::Eof => break,
                Ok(_) => {}
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        let err = err.expect("expected an indentation error");
        assert!(err.indent);
    }

    #[test]
    fn newlines_inside_brackets_are_insignificant() {
        let toks = kinds("x = [1,\n     2,\n     3]\n");
        assert!(!toks.iter().any(|t| *t == TokenKind::Indent));
        let newlines = toks.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn implicit_string_concatenation() {
        let toks = kinds("x = 'abc' 'def'\n");
        assert!(toks.contains(&TokenKind::Str("abcdef".to_owned())));
    }

    #[test]
    fn implicit_concatenation_across_bracketed_newline() {
        let toks = kinds("x = ('abc'\n     'def')\n");
        assert!(toks.contains(&TokenKind::Str("abcdef".to_owned())));
    }

    #[test]
    fn comment_between_literals_does_not_break_adjacency() {
        let toks = kinds("x = ('abc'  # note\n     'def')\n");
        assert!(toks.contains(&TokenKind::Str("abcdef".to_owned())));
    }

    #[test]
    fn trailing_comment_on_one_line_does_not_break_adjacency() {
        let toks = kinds("x = 'abc' 'def'  # note\n");
        assert!(toks.contains(&TokenKind::Str("abcdef".to_owned())));
    }

    #[test]
    fn concatenation_does_not_cross_semicolons() {
        let toks = kinds("x = 'a'; y = 'b'\n");
        assert!(toks.contains(&TokenKind::Str("a".to_owned())));
        assert!(toks.contains(&TokenKind::Str("b".to_owned())));
    }

    #[test]
    fn fstring_pieces_and_spec() {
        let toks = kinds("f\"{x:.2f} ok\"\n");
        let TokenKind::FString(pieces) = &toks[0] else {
            panic!("expected f-string, got {:?}", toks[0]);
        };
        assert_eq!(
            pieces[0],
            FStringPiece::Expr {
                source: "x".to_owned(),
                spec: Some(".2f".to_owned()),
            }
        );
        assert_eq!(pieces[1], FStringPiece::Literal(" ok".to_owned()));
    }

    #[test]
    fn fstring_double_braces_are_literal() {
        let toks = kinds("f\"{{literal}}\"\n");
        let TokenKind::FString(pieces) = &toks[0] else {
            panic!("expected f-string");
        };
        assert_eq!(pieces, &[FStringPiece::Literal("{literal}".to_owned())]);
    }

    #[test]
    fn raw_string_keeps_backslashes() {
        let toks = kinds("r'a\\nb'\n");
        assert!(toks.contains(&TokenKind::Str("a\\nb".to_owned())));
    }

    #[test]
    fn float_and_exponent_literals() {
        let toks = kinds("1.5 2e3 7\n");
        assert_eq!(toks[0], TokenKind::Float(1.5));
        assert_eq!(toks[1], TokenKind::Float(2000.0));
        assert_eq!(toks[2], TokenKind::Int(7));
    }
}
