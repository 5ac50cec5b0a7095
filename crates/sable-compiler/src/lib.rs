//! sable-compiler - Single-Pass Bytecode Compiler
//!
//! ============================================================================
//! SINGLE-PASS COMPILATION
//! ============================================================================
//!
//! This compiler has no AST. Parsing and code generation are fused: as each
//! production is recognized, its bytecode is appended to the chunk of the
//! function currently being compiled. What a multi-pass compiler would keep
//! in tree nodes lives here in the parser's control flow:
//!
//! - OPERATOR PRECEDENCE is the Pratt parser's recursion depth. By the time
//!   an infix handler emits its opcode, both operand subexpressions have
//!   already been emitted, so the operator lands after them - postfix
//!   order, which is exactly stack-machine evaluation order.
//!
//! - VARIABLE RESOLUTION happens at the use site. The compiler's local
//!   array mirrors the VM's value stack one-to-one: declaring a local
//!   appends a descriptor, and the descriptor's index *is* the runtime
//!   stack slot relative to the frame base. Nothing is ever looked up at
//!   runtime for locals; globals fall back to a name-keyed table.
//!
//! - FORWARD CONTROL FLOW cannot know its target yet, so jumps are emitted
//!   with a placeholder 16-bit distance and back-patched the moment the
//!   target offset becomes known. A chunk leaves the compiler with no
//!   unpatched jumps.
//!
//! ERROR RECOVERY:
//! ---------------
//! On the first error the compiler enters panic mode: further diagnostics
//! are suppressed while it skips tokens to the next statement boundary
//! (a semicolon or a keyword that can begin a declaration), then parsing
//! resumes normally. One run therefore reports each independent error
//! once, with no cascade.
//!
//! The public surface is one function: [`compile`].

mod compiler;
mod rules;

#[cfg(test)]
mod edge_cases;

use std::rc::Rc;

use sable_core::{Function, Interner};
use sable_util::Handler;
use thiserror::Error;

use compiler::Compiler;

/// Compilation failed; diagnostics have been written to stderr.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("compilation failed with {errors} error(s)")]
pub struct CompileFailed {
    /// Number of error diagnostics reported.
    pub errors: usize,
}

/// Compiles `source` into the synthetic top-level script function.
///
/// Strings created at compile time (identifiers used as global names,
/// string literals) are interned through `strings`, the same interner the
/// VM executes against, so compile-time and runtime strings share one
/// identity space.
///
/// On success the returned function's chunk is ready to execute. On
/// failure every collected diagnostic is flushed to stderr and
/// [`CompileFailed`] is returned.
pub fn compile(source: &str, strings: &mut Interner) -> Result<Rc<Function>, CompileFailed> {
    let handler = Handler::new();
    let function = Compiler::new(source, strings, &handler).compile();

    if handler.has_errors() {
        let errors = handler.error_count();
        handler.flush_to_stderr();
        return Err(CompileFailed { errors });
    }
    Ok(Rc::new(function))
}
