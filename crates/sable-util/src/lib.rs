//! sable-util - Foundation Types for the Sable Interpreter
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! This crate provides the small set of utilities shared by every phase of
//! the interpreter pipeline:
//!
//! 1. DIAGNOSTICS
//!    Error and warning collection with line-oriented source locations.
//!    The scanner tracks lines rather than byte spans, so a diagnostic
//!    carries `{line, context lexeme, message}` and renders in the classic
//!    `[line N] error at 'lexeme': message` shape.
//!
//! 2. INTERPRETER RESULT
//!    The terminal status of one `interpret()` call: success, compile
//!    error, or runtime error. Defined here so the driver can map it to
//!    exit codes without depending on the VM internals.
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! - Diagnostics are COLLECTED, not printed at the error site. The
//!   compiler keeps parsing after an error (panic-mode recovery) and the
//!   whole batch is flushed to stderr when compilation finishes, so one
//!   run surfaces several errors.
//! - No allocation on the happy path: a run that produces no diagnostics
//!   touches only an empty `Vec` behind a `RefCell`.

mod diagnostic;

pub use diagnostic::{Diagnostic, Handler, Level};

use thiserror::Error;

/// Terminal status of one interpretation request.
///
/// `interpret(source)` is synchronous: it either runs the program to
/// completion or stops at the first fatal condition. The two error variants
/// distinguish "the source never became bytecode" from "the bytecode
/// stopped mid-run".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InterpretError {
    /// The compiler reported one or more diagnostics; no code was produced.
    #[error("compile error")]
    Compile,

    /// Execution halted on a runtime check (type mismatch, undefined
    /// global, bad call, stack overflow). The reason and stack trace have
    /// already been written to stderr.
    #[error("runtime error")]
    Runtime,
}
