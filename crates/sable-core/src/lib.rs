//! sable-core - Runtime Data Model for the Sable Interpreter
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! This crate defines the contract between the compiler and the VM:
//!
//! 1. VALUES AND OBJECTS
//!    The tagged [`Value`] sum (nil / bool / number / object) and the heap
//!    object kinds behind it: interned strings, functions, and native
//!    functions. Objects are shared through `Rc`, so a value is two words
//!    and cloning is a refcount bump.
//!
//! 2. CHUNKS
//!    A [`Chunk`] is what the compiler produces and the VM executes: a
//!    linear sequence of instruction words (one opcode byte + the source
//!    line it came from) plus a constant pool addressed by 8-bit index.
//!
//! 3. THE INSTRUCTION SET
//!    [`OpCode`] enumerates every operation the VM understands. The
//!    compiler's slot assignments and operand encodings *are* the VM's
//!    stack layout, which is why both live against this one crate.
//!
//! 4. HASH TABLE AND STRING INTERNER
//!    An open-addressed, linear-probing [`Table`] keyed by interned
//!    strings, and the [`Interner`] built on it. Interning guarantees at
//!    most one string object per content, which turns string equality
//!    into pointer equality.
//!
//! 5. DISASSEMBLER
//!    An offset-indexed textual dump of a chunk, used by the driver's
//!    `--dump-bytecode` flag, the VM's execution trace, and the tests.
//!
//! OWNERSHIP MODEL:
//! ----------------
//! Strings are owned by the VM's interner and borrowed (via `Rc`) by
//! constant pools, the globals table, and the stack. Functions are owned
//! by the constant pool that introduces them and by any frame currently
//! executing them. Dropping the VM drops everything; there is no separate
//! teardown walk.

pub mod chunk;
pub mod debug;
pub mod object;
pub mod opcode;
pub mod table;
pub mod value;

pub use chunk::{Chunk, Instruction, MAX_CONSTANTS};
pub use debug::{disassemble, disassemble_instruction};
pub use object::{Function, FunctionKind, NativeFn, NativeFunction, Object, StringObject};
pub use opcode::OpCode;
pub use table::{str_hash, Interner, Table};
pub use value::{format_number, Value};
