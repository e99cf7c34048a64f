//! Lexer implementation

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for the analysis dialect.
///
/// Indentation-sensitive: an indentation stack emits synthetic
/// `Indent`/`Dedent` tokens, and newlines inside brackets are joined
/// away, so the parser sees Python-shaped block structure without
/// tracking layout itself.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
    indent_stack: Vec<usize>,
    paren_depth: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
            indent_stack: vec![0],
            paren_depth: 0,
            at_line_start: true,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            if self.at_line_start && self.paren_depth == 0 {
                self.scan_line_start(&mut tokens);
            }
            self.at_line_start = false;
            self.skip_spaces_and_comments();

            let start_pos = self.pos;
            let start_line = self.line;
            let start_col = self.column;

            let Some(c) = self.peek_char() else {
                // Close the last statement, unwind open blocks, stop.
                let needs_newline = matches!(
                    tokens.last(),
                    Some(t) if !matches!(
                        t.kind,
                        TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
                    )
                );
                if needs_newline {
                    tokens.push(self.token_at(TokenKind::Newline, start_pos, start_line, start_col));
                }
                while self.indent_stack.len() > 1 {
                    self.indent_stack.pop();
                    tokens.push(self.token_at(TokenKind::Dedent, start_pos, start_line, start_col));
                }
                tokens.push(self.token_at(TokenKind::Eof, start_pos, start_line, start_col));
                break;
            };

            let kind = match c {
                '\n' => {
                    self.advance_newline();
                    if self.paren_depth == 0 {
                        self.at_line_start = true;
                        TokenKind::Newline
                    } else {
                        // Implicit line joining inside brackets.
                        continue;
                    }
                }
                '(' => {
                    self.advance();
                    self.paren_depth += 1;
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    TokenKind::RParen
                }
                '[' => {
                    self.advance();
                    self.paren_depth += 1;
                    TokenKind::LBracket
                }
                ']' => {
                    self.advance();
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    TokenKind::RBracket
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                ':' => {
                    self.advance();
                    TokenKind::Colon
                }
                ';' => {
                    self.advance();
                    TokenKind::Semicolon
                }
                '.' => {
                    self.advance();
                    TokenKind::Dot
                }

                '+' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::PlusAssign
                    } else {
                        TokenKind::Plus
                    }
                }
                '-' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::MinusAssign
                    } else {
                        TokenKind::Minus
                    }
                }
                '*' => {
                    self.advance();
                    match self.peek_char() {
                        Some('*') => {
                            self.advance();
                            TokenKind::DoubleStar
                        }
                        Some('=') => {
                            self.advance();
                            TokenKind::StarAssign
                        }
                        _ => TokenKind::Star,
                    }
                }
                '/' => {
                    self.advance();
                    match self.peek_char() {
                        Some('/') => {
                            self.advance();
                            TokenKind::DoubleSlash
                        }
                        Some('=') => {
                            self.advance();
                            TokenKind::SlashAssign
                        }
                        _ => TokenKind::Slash,
                    }
                }
                '%' => {
                    self.advance();
                    TokenKind::Percent
                }

                '=' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Eq
                    } else {
                        TokenKind::Assign
                    }
                }
                '!' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Ne
                    } else {
                        TokenKind::Error("Unexpected character: !".to_string())
                    }
                }
                '<' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }

                '"' | '\'' => self.scan_string(c),

                c if c.is_ascii_digit() => self.scan_number(),

                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

                c => {
                    self.advance();
                    TokenKind::Error(format!("Unexpected character: {}", c))
                }
            };

            tokens.push(Token {
                kind,
                span: Span {
                    start: start_pos,
                    end: self.pos,
                    line: start_line,
                    column: start_col,
                },
            });
        }

        tokens
    }

    /// Measure the indentation of the next non-blank line and emit
    /// `Indent`/`Dedent` tokens against the stack. Blank and
    /// comment-only lines produce no layout tokens at all.
    fn scan_line_start(&mut self, tokens: &mut Vec<Token>) {
        loop {
            let mut width = 0usize;
            loop {
                match self.peek_char() {
                    Some(' ') => {
                        self.advance();
                        width += 1;
                    }
                    Some('\t') => {
                        self.advance();
                        width += 8 - (width % 8);
                    }
                    Some('\r') => {
                        self.advance();
                    }
                    _ => break,
                }
            }

            if self.peek_char() == Some('#') {
                self.skip_comment();
            }

            match self.peek_char() {
                Some('\n') => {
                    self.advance_newline();
                    continue;
                }
                None => return,
                _ => {
                    self.apply_indent(width, tokens);
                    return;
                }
            }
        }
    }

    fn apply_indent(&mut self, width: usize, tokens: &mut Vec<Token>) {
        let pos = self.pos;
        let line = self.line;
        let col = self.column;
        let current = *self.indent_stack.last().unwrap_or(&0);

        if width > current {
            self.indent_stack.push(width);
            tokens.push(self.token_at(TokenKind::Indent, pos, line, col));
        } else if width < current {
            while self.indent_stack.last().is_some_and(|&w| w > width) {
                self.indent_stack.pop();
                tokens.push(self.token_at(TokenKind::Dedent, pos, line, col));
            }
            if self.indent_stack.last() != Some(&width) {
                tokens.push(self.token_at(
                    TokenKind::Error("Inconsistent dedent".to_string()),
                    pos,
                    line,
                    col,
                ));
                self.indent_stack.push(width);
            }
        }
    }

    /// Scan an identifier or keyword. Keywords are case-sensitive.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let ident = &self.source[start..self.pos];

        match ident {
            "import" => TokenKind::Import,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "in" => TokenKind::In,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "def" => TokenKind::Def,
            "class" => TokenKind::Class,
            "return" => TokenKind::Return,
            "pass" => TokenKind::Pass,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "del" => TokenKind::Del,
            "global" => TokenKind::Global,
            "lambda" => TokenKind::Lambda,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::NoneLit,
            _ => TokenKind::Identifier(ident.to_string()),
        }
    }

    /// Scan a string literal with escape sequences.
    fn scan_string(&mut self, quote: char) -> TokenKind {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None | Some('\n') => return TokenKind::Error("Unterminated string".to_string()),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => {
                            self.advance();
                            value.push('\n');
                        }
                        Some('t') => {
                            self.advance();
                            value.push('\t');
                        }
                        Some('r') => {
                            self.advance();
                            value.push('\r');
                        }
                        Some('\\') => {
                            self.advance();
                            value.push('\\');
                        }
                        Some('"') => {
                            self.advance();
                            value.push('"');
                        }
                        Some('\'') => {
                            self.advance();
                            value.push('\'');
                        }
                        _ => value.push('\\'),
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        TokenKind::Str(value)
    }

    /// Scan an integer or float literal.
    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        let mut is_float = false;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Fractional part only when a digit follows the dot, so
        // subscripts like df[0].mean() still lex as attribute access.
        if self.peek_char() == Some('.')
            && self
                .peek_next_char()
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
        {
            is_float = true;
            self.advance(); // .
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let next = self.peek_next_char();
            let exponent_follows = match next {
                Some(d) if d.is_ascii_digit() => true,
                Some('+') | Some('-') => true,
                _ => false,
            };
            if exponent_follows {
                is_float = true;
                self.advance(); // e
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.advance();
                }
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_digit() {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let text = &self.source[start..self.pos];
        if is_float {
            match text.parse::<f64>() {
                Ok(n) => TokenKind::Float(n),
                Err(_) => TokenKind::Error(format!("Invalid number: {}", text)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(_) => match text.parse::<f64>() {
                    Ok(n) => TokenKind::Float(n),
                    Err(_) => TokenKind::Error(format!("Invalid number: {}", text)),
                },
            }
        }
    }

    /// Skip spaces, carriage returns, and comments, but not newlines.
    fn skip_spaces_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    self.skip_comment();
                }
                _ => break,
            }
        }
    }

    /// Skip a comment up to (not including) the line break.
    fn skip_comment(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn token_at(&self, kind: TokenKind, pos: usize, line: usize, column: usize) -> Token {
        Token {
            kind,
            span: Span {
                start: pos,
                end: pos,
                line,
                column,
            },
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].char_indices();
        iter.next();
        iter.next().map(|(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }

    fn advance_newline(&mut self) {
        self.advance();
        self.line += 1;
        self.column = 1;
    }
}

// ============================================================================
// TESTS
// ============================================================================
