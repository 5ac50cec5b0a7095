//! Diagnostic module - error and warning reporting infrastructure.
//!
//! Diagnostics are accumulated in a [`Handler`] during a phase and flushed
//! once the phase completes. This keeps reporting out of the hot parsing
//! path and lets panic-mode recovery surface several independent errors in
//! a single run.
//!
//! # Examples
//!
//! ```
//! use sable_util::{Handler, Level};
//!
//! let handler = Handler::new();
//! handler.error(3, Some("="), "invalid assignment target");
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.error_count(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that prevents execution.
    Error,
    /// A condition worth reporting that does not prevent execution.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with severity and a line-oriented location.
///
/// The `context` is the lexeme the reporter was looking at, when there is
/// one: `None` for end-of-file positions and for scanner error tokens
/// (whose lexeme is itself the message).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub level: Level,
    /// 1-based source line.
    pub line: u32,
    /// Lexeme under the cursor when the diagnostic was produced.
    pub context: Option<String>,
    /// Main diagnostic message.
    pub message: String,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(line: u32, context: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            line,
            context: context.map(str::to_owned),
            message: message.into(),
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(line: u32, context: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            line,
            context: context.map(str::to_owned),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    /// Renders as `[line 7] error at 'foo': message` (the `at` clause is
    /// omitted when there is no context lexeme).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] {}", self.line, self.level)?;
        if let Some(context) = &self.context {
            write!(f, " at '{}'", context)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Collects diagnostics produced during a phase.
///
/// The handler uses interior mutability so that a phase holding `&Handler`
/// can report from deeply nested call sites without threading `&mut`
/// everywhere.
///
/// # Examples
///
/// ```
/// use sable_util::Handler;
///
/// let handler = Handler::new();
/// assert!(!handler.has_errors());
/// handler.error(1, None, "unexpected end of input");
/// assert!(handler.has_errors());
/// ```
#[derive(Default)]
pub struct Handler {
    /// Collected diagnostics, in report order.
    diagnostics: RefCell<Vec<Diagnostic>>,
    /// Whether to panic on errors (for tests that must not produce any).
    panic_on_error: bool,
}

impl Handler {
    /// Create a new handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handler that panics on the first error (for tests).
    pub fn new_panicking() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            panic_on_error: true,
        }
    }

    /// Report an error at `line`, optionally anchored to a lexeme.
    pub fn error(&self, line: u32, context: Option<&str>, message: impl Into<String>) {
        self.emit(Diagnostic::error(line, context, message));
    }

    /// Report a warning at `line`.
    pub fn warning(&self, line: u32, context: Option<&str>, message: impl Into<String>) {
        self.emit(Diagnostic::warning(line, context, message));
    }

    /// Emit a pre-built diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        if self.panic_on_error && diagnostic.level == Level::Error {
            panic!("diagnostic error: {}", diagnostic);
        }
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Whether any error-level diagnostic has been reported.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of error-level diagnostics reported so far.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Take all collected diagnostics, leaving the handler empty.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Write every collected diagnostic to stderr, in report order.
    pub fn flush_to_stderr(&self) {
        for diagnostic in self.diagnostics.borrow().iter() {
            eprintln!("{}", diagnostic);
        }
    }
}
