//! sable-vm - Bytecode Execution Engine
//!
//! ============================================================================
//! THE STACK MACHINE
//! ============================================================================
//!
//! The VM executes chunks against one flat value stack partitioned into
//! call frames. There are no registers: every operand is pushed, every
//! result replaces its operands on the stack top.
//!
//! FRAME LAYOUT:
//! -------------
//! ```text
//!            base                       top
//!             │                          │
//!             ▼                          ▼
//! ... ──┬──────────┬──────┬──────┬─────┬───
//!       │ callee   │ arg0 │ arg1 │ ... │
//!       │ (slot 0) │ (1)  │ (2)  │     │
//! ... ──┴──────────┴──────┴──────┴─────┴───
//! ```
//!
//! A frame's base slot holds the function value being executed; its
//! arguments sit in the following slots and *are* the callee's first
//! locals - the compiler's slot assignment and this layout are the same
//! numbering. `Return` truncates the stack to the base and pushes the
//! return value, which simultaneously frees the callee, its arguments,
//! and every temporary in one operation.
//!
//! EXECUTION MODEL:
//! ----------------
//! Single-threaded, synchronous fetch-decode-execute. `interpret` runs to
//! completion or to the first fatal runtime error; there are no
//! suspension points. Native functions run on the VM thread and must
//! return promptly; they cannot re-enter the interpreter.
//!
//! The VM passes through three states: Ready (no frames), Running, and
//! Halted with a terminal status - which is just `Result<(),
//! InterpretError>` at the API boundary.
//!
//! ERRORS:
//! -------
//! Runtime checks (operand types, undefined globals, callability, arity,
//! stack depth) halt execution. The reason plus a frame-by-frame trace
//! (`[line N] in ...`, innermost first) is written to stderr, then the
//! stacks are reset so a REPL can keep the same VM alive.

mod natives;
mod vm;

pub use sable_util::InterpretError;
pub use vm::{RuntimeError, Vm, FRAMES_MAX, STACK_MAX};
