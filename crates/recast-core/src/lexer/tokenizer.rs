//! DDL tokenizer.

use super::{Keyword, Span, Token, TokenKind};

/// A lexer that tokenizes SQL DDL input.
pub struct Lexer<'a> {
    /// The input source text.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position where the current token started.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace, `-- ...` line comments, and `/* ... */` block
    /// comments. Comments never survive into the token stream, which is
    /// what makes canonical SQL comment-free.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    fn scan_word(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }
        let text = &self.input[self.start..self.pos];
        match Keyword::from_text(text) {
            Some(kw) => self.make_token(TokenKind::Keyword(kw)),
            None => self.make_token(TokenKind::Identifier(text.to_string())),
        }
    }

    /// Scans a quoted identifier. SQLite accepts `"x"`, `` `x` `` and
    /// `[x]`; the closing quote doubles to escape itself except for
    /// brackets, which cannot contain `]`.
    fn scan_quoted_identifier(&mut self, close: char) -> Token {
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if c == close => {
                    if close != ']' && self.peek_next() == Some(close) {
                        value.push(close);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        return self.make_token(TokenKind::QuotedIdentifier(value));
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    return self.make_token(TokenKind::Error(
                        "unterminated quoted identifier".to_string(),
                    ));
                }
            }
        }
    }

    fn scan_string(&mut self) -> Token {
        let mut value = String::new();
        loop {
            match self.peek() {
                Some('\'') => {
                    if self.peek_next() == Some('\'') {
                        value.push('\'');
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        return self.make_token(TokenKind::String(value));
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    return self
                        .make_token(TokenKind::Error("unterminated string literal".to_string()));
                }
            }
        }
    }

    fn scan_blob(&mut self) -> Token {
        self.advance(); // opening quote
        let hex_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.advance();
        }
        let hex = self.input[hex_start..self.pos].to_string();
        if self.peek() != Some('\'') {
            return self.make_token(TokenKind::Error("malformed blob literal".to_string()));
        }
        self.advance();
        self.make_token(TokenKind::Blob(hex))
    }

    /// Numbers are kept as raw text; re-parsing them would lose the exact
    /// spelling the canonical form must reproduce.
    fn scan_number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = self.input[self.start..self.pos].to_string();
        self.make_token(TokenKind::Number(text))
    }

    fn scan_placeholder(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let text = self.input[self.start..self.pos].to_string();
        self.make_token(TokenKind::Placeholder(text))
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => return self.make_token(TokenKind::Eof),
        };

        match c {
            '(' => {
                self.advance();
                self.make_token(TokenKind::LeftParen)
            }
            ')' => {
                self.advance();
                self.make_token(TokenKind::RightParen)
            }
            ',' => {
                self.advance();
                self.make_token(TokenKind::Comma)
            }
            ';' => {
                self.advance();
                self.make_token(TokenKind::Semicolon)
            }
            '.' => {
                if self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                    self.scan_number()
                } else {
                    self.advance();
                    self.make_token(TokenKind::Dot)
                }
            }
            '\'' => {
                self.advance();
                self.scan_string()
            }
            '"' => {
                self.advance();
                self.scan_quoted_identifier('"')
            }
            '`' => {
                self.advance();
                self.scan_quoted_identifier('`')
            }
            '[' => {
                self.advance();
                self.scan_quoted_identifier(']')
            }
            'x' | 'X' if self.peek_next() == Some('\'') => {
                self.advance();
                self.scan_blob()
            }
            '?' | ':' | '@' => {
                self.advance();
                self.scan_placeholder()
            }
            '+' => {
                self.advance();
                self.make_token(TokenKind::Operator("+"))
            }
            '-' => {
                self.advance();
                self.make_token(TokenKind::Operator("-"))
            }
            '*' => {
                self.advance();
                self.make_token(TokenKind::Operator("*"))
            }
            '/' => {
                self.advance();
                self.make_token(TokenKind::Operator("/"))
            }
            '%' => {
                self.advance();
                self.make_token(TokenKind::Operator("%"))
            }
            '~' => {
                self.advance();
                self.make_token(TokenKind::Operator("~"))
            }
            '&' => {
                self.advance();
                self.make_token(TokenKind::Operator("&"))
            }
            '=' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::Operator("=="))
                } else {
                    self.make_token(TokenKind::Operator("="))
                }
            }
            '<' => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        self.make_token(TokenKind::Operator("<="))
                    }
                    Some('>') => {
                        self.advance();
                        self.make_token(TokenKind::Operator("<>"))
                    }
                    Some('<') => {
                        self.advance();
                        self.make_token(TokenKind::Operator("<<"))
                    }
                    _ => self.make_token(TokenKind::Operator("<")),
                }
            }
            '>' => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        self.make_token(TokenKind::Operator(">="))
                    }
                    Some('>') => {
                        self.advance();
                        self.make_token(TokenKind::Operator(">>"))
                    }
                    _ => self.make_token(TokenKind::Operator(">")),
                }
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::Operator("!="))
                } else {
                    self.make_token(TokenKind::Error("unexpected character: !".to_string()))
                }
            }
            '|' => {
                self.advance();
                if self.peek() == Some('|') {
                    self.advance();
                    self.make_token(TokenKind::Operator("||"))
                } else {
                    self.make_token(TokenKind::Operator("|"))
                }
            }
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_alphanumeric() || c == '_' || c == '$' => self.scan_word(),
            other => {
                self.advance();
                self.make_token(TokenKind::Error(format!("unexpected character: {other}")))
            }
        }
    }
}
