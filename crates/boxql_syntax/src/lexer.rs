//! Lexer for GraphQL documents.

use crate::token::{Token, TokenKind};
use boxql_core::{Interner, Span, Text};

/// A lexer for GraphQL source text.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: u32,
    interner: &'a Interner,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer.
    pub fn new(source: &'a str, interner: &'a Interner) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            interner,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos as usize).copied()
    }

    #[inline]
    fn peek_at(&self, offset: u32) -> Option<u8> {
        self.bytes.get((self.pos + offset) as usize).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn advance_by(&mut self, n: u32) {
        self.pos += n;
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_ignored();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match c {
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b':' => self.single(TokenKind::Colon),
            b'=' => self.single(TokenKind::Eq),
            b'|' => self.single(TokenKind::Pipe),
            b'&' => self.single(TokenKind::Amp),
            b'@' => self.single(TokenKind::At),
            b'!' => self.single(TokenKind::Bang),
            b'$' => self.single(TokenKind::Dollar),
            b'.' => {
                if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                    self.advance_by(3);
                    TokenKind::Spread
                } else {
                    self.advance();
                    TokenKind::Error
                }
            }
            b'"' => self.scan_string(),
            b'-' | b'0'..=b'9' => self.scan_number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),
            _ => {
                // Skip the whole UTF-8 sequence so spans stay on char boundaries.
                let width = self.source[start as usize..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                self.advance_by(width as u32);
                TokenKind::Error
            }
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    #[inline]
    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Skips whitespace, line terminators, commas and comments.
    fn skip_ignored(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | b',') => self.advance(),
                Some(b'#') => {
                    let rest = &self.bytes[self.pos as usize..];
                    match memchr::memchr(b'\n', rest) {
                        Some(newline) => self.advance_by(newline as u32),
                        None => self.pos = self.bytes.len() as u32,
                    }
                }
                Some(0xEF) if self.peek_at(1) == Some(0xBB) && self.peek_at(2) == Some(0xBF) => {
                    self.advance_by(3);
                }
                _ => break,
            }
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::from_keyword(&self.source[start as usize..self.pos as usize])
            .unwrap_or(TokenKind::Ident)
    }

    fn scan_digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        (self.pos - start) as usize
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut is_float = false;

        if self.peek() == Some(b'-') {
            self.advance();
        }

        if self.scan_digits() == 0 {
            return TokenKind::Error;
        }

        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            self.scan_digits();
        }

        if let Some(b'e' | b'E') = self.peek() {
            is_float = true;
            self.advance();
            if let Some(b'+' | b'-') = self.peek() {
                self.advance();
            }
            if self.scan_digits() == 0 {
                return TokenKind::Error;
            }
        }

        if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        self.advance();

        if self.peek() == Some(b'"') && self.peek_at(1) == Some(b'"') {
            self.advance_by(2);
            return self.scan_block_string();
        }

        loop {
            match self.peek() {
                None | Some(b'\n') => return TokenKind::Error,
                Some(b'"') => {
                    self.advance();
                    return TokenKind::StringLiteral;
                }
                Some(b'\\') => self.advance_by(2),
                _ => self.advance(),
            }
        }
    }

    fn scan_block_string(&mut self) -> TokenKind {
        loop {
            match self.peek() {
                None => return TokenKind::Error,
                Some(b'"') if self.peek_at(1) == Some(b'"') && self.peek_at(2) == Some(b'"') => {
                    self.advance_by(3);
                    return TokenKind::BlockStringLiteral;
                }
                Some(b'\\')
                    if self.peek_at(1) == Some(b'"')
                        && self.peek_at(2) == Some(b'"')
                        && self.peek_at(3) == Some(b'"') =>
                {
                    self.advance_by(4);
                }
                _ => self.advance(),
            }
        }
    }

    /// Interns the text at the given span.
    pub fn intern_span(&self, span: Span) -> Text {
        self.interner.intern(self.span_text(span))
    }

    /// Gets the text at the given span.
    pub fn span_text(&self, span: Span) -> &'a str {
        &self.source[span.start as usize..span.end as usize]
    }
}

/// Tokenizes the entire source.
pub fn tokenize(source: &str, interner: &Interner) -> Vec<Token> {
    let mut lexer = Lexer::new(source, interner);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token();
        let is_eof = token.is_eof();
        tokens.push(token);
        if is_eof {
            break;
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let interner = Interner::new();
        tokenize(source, &interner).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_commas_are_insignificant() {
        assert_eq!(
            kinds("{ a, b }"),
            vec![
                TokenKind::LBrace,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_selection_punctuation() {
        assert_eq!(
            kinds("...on User @skip(if: $x) [Int!]!"),
            vec![
                TokenKind::Spread,
                TokenKind::On,
                TokenKind::Ident,
                TokenKind::At,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Dollar,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::Ident,
                TokenKind::Bang,
                TokenKind::RBracket,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 -17 3.14 1e10 2.5e-3"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("# leading\n{ a # trailing\n }"),
            vec![
                TokenKind::LBrace,
                TokenKind::Ident,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""hello" "esc\"aped" """block""""#),
            vec![
                TokenKind::StringLiteral,
                TokenKind::StringLiteral,
                TokenKind::BlockStringLiteral,
                TokenKind::Eof,
            ]
        );
    }
}
