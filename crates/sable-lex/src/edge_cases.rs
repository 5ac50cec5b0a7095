//! Edge case tests for sable-lex

#[cfg(test)]
mod tests {
    use crate::{Scanner, Token, TokenKind};

    fn scan_all(source: &str) -> Vec<Token<'_>> {
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

    // ==================== EDGE CASES ====================

    #[test]
    fn test_edge_empty_source() {
        assert!(scan_all("").is_empty());
    }

    #[test]
    fn test_edge_whitespace_only() {
        assert!(scan_all(" \t\r\n  \n").is_empty());
    }

    #[test]
    fn test_edge_long_identifier() {
        let name = "a".repeat(10_000);
        let tokens = scan_all(&name);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].lexeme.len(), 10_000);
    }

    #[test]
    fn test_edge_empty_string_literal() {
        let tokens = scan_all("\"\"");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "\"\"");
    }

    #[test]
    fn test_edge_string_holding_comment_marker() {
        let tokens = scan_all("\"// not a comment\"");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
    }

    #[test]
    fn test_edge_slash_then_comment() {
        let tokens = scan_all("1 / 2 // half");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Number, TokenKind::Slash, TokenKind::Number]
        );
    }

    #[test]
    fn test_edge_leading_dot_number() {
        // `.5` is Dot then Number, not a literal.
        let tokens = scan_all(".5");
        assert_eq!(tokens[0].kind, TokenKind::Dot);
        assert_eq!(tokens[1].kind, TokenKind::Number);
    }

    #[test]
    fn test_edge_error_token_does_not_stall() {
        // The scanner must make progress past an unexpected character.
        let tokens = scan_all("@ @ x");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_edge_crlf_counts_one_line() {
        let tokens = scan_all("a\r\nb");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_edge_digits_then_letters_split() {
        // `12abc` scans as Number(12) then Identifier(abc).
        let tokens = scan_all("12abc");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "12");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }
}

#[cfg(test)]
mod properties {
    use crate::{Scanner, TokenKind};
    use proptest::prelude::*;

    proptest! {
        /// Scanning arbitrary ASCII input terminates and never panics.
        #[test]
        fn scan_terminates(source in "[ -~\\t\\r\\n]{0,400}") {
            let mut scanner = Scanner::new(&source);
            let mut steps = 0usize;
            loop {
                let token = scanner.next_token();
                if token.kind == TokenKind::Eof {
                    break;
                }
                steps += 1;
                prop_assert!(steps <= source.len() + 1);
            }
        }

        /// Token lines are monotonically non-decreasing and bounded by the
        /// number of newlines in the source.
        #[test]
        fn lines_are_monotone(source in "[a-z0-9+;\\n ]{0,200}") {
            let max_line = 1 + source.bytes().filter(|&b| b == b'\n').count() as u32;
            let mut scanner = Scanner::new(&source);
            let mut last = 1u32;
            loop {
                let token = scanner.next_token();
                prop_assert!(token.line >= last);
                prop_assert!(token.line <= max_line);
                last = token.line;
                if token.kind == TokenKind::Eof {
                    break;
                }
            }
        }

        /// Lexemes of non-error tokens are exact slices of the input.
        #[test]
        fn lexemes_are_slices(source in "[a-z0-9(){}.,+\\-*/;<>=! ]{0,200}") {
            let mut scanner = Scanner::new(&source);
            loop {
                let token = scanner.next_token();
                if token.kind == TokenKind::Eof {
                    break;
                }
                if token.kind != TokenKind::Error {
                    prop_assert!(source.contains(token.lexeme));
                }
            }
        }
    }
}
