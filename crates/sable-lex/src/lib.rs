//! sable-lex - Lexical Analyzer (Scanner)
//!
//! ============================================================================
//! LEXICAL ANALYSIS
//! ============================================================================
//!
//! The scanner transforms a stream of bytes into a stream of tokens. It is
//! the first phase of the pipeline and the only one that touches raw source
//! text; everything downstream works with `Token`s.
//!
//! PROPERTIES:
//! -----------
//! - Lazy: tokens are produced one at a time on demand; no token vector is
//!   ever materialized by the scanner itself.
//! - Zero-copy: a token's lexeme is a slice of the held source buffer.
//! - Infallible: lexical errors (unexpected character, unterminated
//!   string) are reported *as tokens* of kind [`TokenKind::Error`] whose
//!   lexeme is the message. The consumer decides how to surface them.
//! - Byte-oriented: identifiers, keywords, and string literals are byte
//!   compared; no Unicode processing.
//!
//! LEXEME vs TOKEN:
//! ----------------
//! - Lexeme: the actual source characters (e.g. `var`, `123`, `+`)
//! - Token: the category plus metadata (kind, lexeme slice, line)
//!
//! ```text
//! Source:  var x = 42;
//! Tokens:  [Var] [Identifier "x"] [Equal] [Number "42"] [Semicolon] [Eof]
//! ```
//!
//! LINE TRACKING:
//! --------------
//! Lines are 1-based. `\n` increments the line counter (also inside string
//! literals); `\r`, `\t`, and space are whitespace; `//` comments run to
//! end of line.

pub mod scanner;
pub mod token;

#[cfg(test)]
mod edge_cases;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};
