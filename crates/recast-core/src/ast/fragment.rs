//! Opaque SQL fragments.
//!
//! View bodies, trigger bodies, CHECK expressions, DEFAULT expressions and
//! partial-index WHERE clauses are not modeled structurally. They are kept
//! as token runs and re-emitted deterministically, which gives them a
//! canonical form (stable spacing, upper-case keywords, no comments)
//! without a full expression grammar.

use core::fmt;

use crate::lexer::TokenKind;

/// A run of tokens re-emitted as canonical SQL text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    tokens: Vec<TokenKind>,
}

impl SqlFragment {
    /// Creates an empty fragment.
    #[must_use]
    pub const fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Creates a fragment from a token run.
    #[must_use]
    pub fn from_tokens(tokens: Vec<TokenKind>) -> Self {
        Self { tokens }
    }

    /// Appends a token.
    pub fn push(&mut self, token: TokenKind) {
        self.tokens.push(token);
    }

    /// Returns true if the fragment holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The tokens of this fragment.
    #[must_use]
    pub fn tokens(&self) -> &[TokenKind] {
        &self.tokens
    }
}

/// Spacing policy for canonical emission. Tight around punctuation, a
/// single space everywhere else; function calls stay glued to their
/// opening paren.
fn needs_space(prev: &TokenKind, current: &TokenKind) -> bool {
    if matches!(
        current,
        TokenKind::Comma | TokenKind::RightParen | TokenKind::Semicolon | TokenKind::Dot
    ) {
        return false;
    }
    if matches!(prev, TokenKind::LeftParen | TokenKind::Dot) {
        return false;
    }
    if matches!(current, TokenKind::LeftParen)
        && matches!(
            prev,
            TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_)
        )
    {
        return false;
    }
    true
}

fn write_token(f: &mut fmt::Formatter<'_>, token: &TokenKind) -> fmt::Result {
    match token {
        TokenKind::Keyword(kw) => f.write_str(kw.as_str()),
        TokenKind::Identifier(name) => f.write_str(name),
        TokenKind::QuotedIdentifier(name) => write!(f, "\"{}\"", name.replace('"', "\"\"")),
        TokenKind::Number(raw) => f.write_str(raw),
        TokenKind::String(value) => write!(f, "'{}'", value.replace('\'', "''")),
        TokenKind::Blob(hex) => write!(f, "X'{hex}'"),
        TokenKind::Placeholder(raw) => f.write_str(raw),
        TokenKind::Operator(op) => f.write_str(op),
        TokenKind::LeftParen => f.write_str("("),
        TokenKind::RightParen => f.write_str(")"),
        TokenKind::Comma => f.write_str(","),
        TokenKind::Dot => f.write_str("."),
        TokenKind::Semicolon => f.write_str(";"),
        TokenKind::Eof | TokenKind::Error(_) => Ok(()),
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prev: Option<&TokenKind> = None;
        for token in &self.tokens {
            if let Some(p) = prev {
                if needs_space(p, token) {
                    f.write_str(" ")?;
                }
            }
            write_token(f, token)?;
            prev = Some(token);
        }
        Ok(())
    }
}
