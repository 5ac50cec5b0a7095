//! Scanner implementation for Sable source code.
//!
//! A direct-coded scanner over a held source buffer. Each call to
//! [`Scanner::next_token`] skips whitespace and comments, then dispatches
//! on the first significant byte. Lexemes are slices of the source; the
//! scanner never allocates.

use crate::token::{keyword_from_ident, Token, TokenKind};

/// The Sable scanner.
///
/// Produces tokens lazily over the source it holds. The scanner is
/// infallible: malformed input yields [`TokenKind::Error`] tokens whose
/// lexeme is the message, and after the end of input every call returns
/// [`TokenKind::Eof`].
///
/// The scanner is `Clone`: its whole state is a borrowed buffer plus
/// three counters, so a consumer can cheaply fork it to look one token
/// ahead without disturbing the live position.
///
/// # Example
///
/// ```
/// use sable_lex::{Scanner, TokenKind};
///
/// let mut scanner = Scanner::new("var answer = 42;");
/// assert_eq!(scanner.next_token().kind, TokenKind::Var);
/// assert_eq!(scanner.next_token().lexeme, "answer");
/// ```
#[derive(Clone)]
pub struct Scanner<'src> {
    /// The full source text.
    source: &'src str,
    /// Byte offset of the first character of the token being scanned.
    start: usize,
    /// Byte offset of the next character to consume.
    current: usize,
    /// Current 1-based line number.
    line: u32,
}

impl<'src> Scanner<'src> {
    /// Creates a scanner over `source`.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scans and returns the next token.
    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let byte = self.advance();
        match byte {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b',' => self.make_token(TokenKind::Comma),
            b'.' => self.make_token(TokenKind::Dot),
            b'-' => self.make_token(TokenKind::Minus),
            b'+' => self.make_token(TokenKind::Plus),
            b';' => self.make_token(TokenKind::Semicolon),
            b'*' => self.make_token(TokenKind::Star),
            b'/' => self.make_token(TokenKind::Slash),

            b'!' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            b'=' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.make_token(kind)
            }
            b'<' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.make_token(kind)
            }
            b'>' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind)
            }

            b'"' => self.scan_string(),
            b'0'..=b'9' => self.scan_number(),
            b if is_ident_start(b) => self.scan_identifier(),

            _ => self.error_token("unexpected character"),
        }
    }

    // =========================================================================
    // CHARACTER PRIMITIVES
    // =========================================================================

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Consumes and returns the next byte.
    fn advance(&mut self) -> u8 {
        let byte = self.source.as_bytes()[self.current];
        self.current += 1;
        byte
    }

    /// Returns the next byte without consuming it, `0` at end of input.
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source.as_bytes()[self.current]
        }
    }

    /// Returns the byte after next, `0` past end of input.
    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source.as_bytes()[self.current + 1]
        }
    }

    /// Consumes the next byte only if it equals `expected`.
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                b'\n' => {
                    self.line += 1;
                    self.current += 1;
                }
                b' ' | b'\r' | b'\t' => {
                    self.current += 1;
                }
                b'/' => {
                    if self.peek_next() != b'/' {
                        return;
                    }
                    while !self.is_at_end() && self.peek() != b'\n' {
                        self.current += 1;
                    }
                }
                _ => return,
            }
        }
    }

    // =========================================================================
    // TOKEN CONSTRUCTORS
    // =========================================================================

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.current],
            line: self.line,
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.line,
        }
    }

    // =========================================================================
    // COMPOUND TOKENS
    // =========================================================================

    /// Scans a double-quoted string. No escape sequences; a newline inside
    /// the literal is taken verbatim and counted.
    fn scan_string(&mut self) -> Token<'src> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.current += 1;
        }

        if self.is_at_end() {
            return self.error_token("unterminated string");
        }

        self.current += 1; // closing quote
        self.make_token(TokenKind::String)
    }

    /// Scans a number: decimal digits with an optional `.digits` fraction.
    /// A trailing `.` without digits is not part of the number.
    fn scan_number(&mut self) -> Token<'src> {
        while self.peek().is_ascii_digit() {
            self.current += 1;
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.current += 1; // the period
            while self.peek().is_ascii_digit() {
                self.current += 1;
            }
        }

        self.make_token(TokenKind::Number)
    }

    /// Scans an identifier, then classifies it as a keyword if it matches
    /// one.
    fn scan_identifier(&mut self) -> Token<'src> {
        while is_ident_continue(self.peek()) {
            self.current += 1;
        }

        let text = &self.source[self.start..self.current];
        let kind = keyword_from_ident(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }
}

fn is_ident_start(byte: u8) -> bool {
    byte == b'_' || byte.is_ascii_alphabetic()
}

fn is_ident_continue(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a scanner and collect all tokens up to EOF.
    fn scan_tokens(source: &str) -> Vec<Token<'_>> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    /// Helper to get the first token from source.
    fn first_token(source: &str) -> Token<'_> {
        Scanner::new(source).next_token()
    }

    // ========================================================================
    // PUNCTUATION AND OPERATORS
    // ========================================================================

    #[test]
    fn test_single_char_tokens() {
        let kinds: Vec<_> = scan_tokens("(){},.-+;*/").iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Semicolon,
                TokenKind::Star,
                TokenKind::Slash,
            ]
        );
    }

    #[test]
    fn test_one_or_two_char_tokens() {
        let kinds: Vec<_> = scan_tokens("! != = == < <= > >=")
            .iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
            ]
        );
    }

    #[test]
    fn test_maximal_munch() {
        // `===` must scan as `==` then `=`, not `=` `==`.
        let kinds: Vec<_> = scan_tokens("===").iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::EqualEqual, TokenKind::Equal]);
    }

    // ========================================================================
    // IDENTIFIERS AND KEYWORDS
    // ========================================================================

    #[test]
    fn test_identifiers() {
        assert_eq!(first_token("x").kind, TokenKind::Identifier);
        assert_eq!(first_token("_private").kind, TokenKind::Identifier);
        assert_eq!(first_token("snake_case_1").lexeme, "snake_case_1");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(first_token("and").kind, TokenKind::And);
        assert_eq!(first_token("else").kind, TokenKind::Else);
        assert_eq!(first_token("false").kind, TokenKind::False);
        assert_eq!(first_token("for").kind, TokenKind::For);
        assert_eq!(first_token("fun").kind, TokenKind::Fun);
        assert_eq!(first_token("if").kind, TokenKind::If);
        assert_eq!(first_token("nil").kind, TokenKind::Nil);
        assert_eq!(first_token("or").kind, TokenKind::Or);
        assert_eq!(first_token("print").kind, TokenKind::Print);
        assert_eq!(first_token("return").kind, TokenKind::Return);
        assert_eq!(first_token("true").kind, TokenKind::True);
        assert_eq!(first_token("var").kind, TokenKind::Var);
        assert_eq!(first_token("while").kind, TokenKind::While);
    }

    #[test]
    fn test_keyword_prefixed_identifier() {
        assert_eq!(first_token("variable").kind, TokenKind::Identifier);
        assert_eq!(first_token("classy").kind, TokenKind::Identifier);
        assert_eq!(first_token("nils").kind, TokenKind::Identifier);
    }

    // ========================================================================
    // LITERALS
    // ========================================================================

    #[test]
    fn test_numbers() {
        assert_eq!(first_token("0").lexeme, "0");
        assert_eq!(first_token("123").lexeme, "123");
        assert_eq!(first_token("3.25").lexeme, "3.25");
    }

    #[test]
    fn test_number_trailing_dot_is_separate() {
        let tokens = scan_tokens("4.");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "4");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }

    #[test]
    fn test_string_literal() {
        let token = first_token("\"hi there\"");
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.lexeme, "\"hi there\"");
    }

    #[test]
    fn test_multiline_string_counts_lines() {
        let mut scanner = Scanner::new("\"a\nb\" x");
        let string = scanner.next_token();
        assert_eq!(string.kind, TokenKind::String);
        let ident = scanner.next_token();
        assert_eq!(ident.line, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let token = first_token("\"oops");
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(token.lexeme, "unterminated string");
    }

    // ========================================================================
    // WHITESPACE, COMMENTS, LINES
    // ========================================================================

    #[test]
    fn test_comments_are_skipped() {
        let tokens = scan_tokens("1 // the rest is ignored\n2");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].lexeme, "2");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_comment_at_eof() {
        assert!(scan_tokens("// nothing else").is_empty());
    }

    #[test]
    fn test_line_numbers() {
        let tokens = scan_tokens("a\nb\r\n\tc");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut scanner = Scanner::new("");
        assert_eq!(scanner.next_token().kind, TokenKind::Eof);
        assert_eq!(scanner.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_unexpected_character() {
        let token = first_token("@");
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(token.lexeme, "unexpected character");
    }
}
