//! Disassembler: offset-indexed textual dump of a chunk.
//!
//! The dump is deterministic for a given chunk (the fixed-point property
//! the tests rely on): rendering the same chunk twice yields identical
//! text. Output shape, per instruction:
//!
//! ```text
//! ==== add ====
//! 0000    1 GET_LOCAL           1
//! 0002    | GET_LOCAL           2
//! 0004    | ADD
//! 0005    | RETURN
//! ```
//!
//! The second column is the source line, collapsed to `|` when unchanged
//! from the previous instruction. Constant operands render the constant
//! (strings quoted); jump operands render the distance and the resolved
//! target offset.

use std::fmt::Write;

use crate::chunk::Chunk;
use crate::object::Object;
use crate::opcode::OpCode;
use crate::value::Value;

/// Renders the whole chunk under a `==== name ====` header.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "==== {} ====", name);

    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Renders one instruction at `offset` into `out` and returns the offset
/// of the next instruction.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let instruction = chunk.code()[offset];
    let _ = write!(out, "{:04} ", offset);

    if offset > 0 && chunk.code()[offset - 1].line == instruction.line {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", instruction.line);
    }

    let Some(op) = OpCode::from_byte(instruction.op) else {
        let _ = writeln!(out, "UNKNOWN {}", instruction.op);
        return offset + 1;
    };

    match op {
        OpCode::Const | OpCode::DefineGlobal | OpCode::GetGlobal | OpCode::SetGlobal => {
            constant_instruction(chunk, op, offset, out)
        }
        OpCode::GetLocal | OpCode::SetLocal | OpCode::Call => {
            byte_instruction(chunk, op, offset, out)
        }
        OpCode::Jump | OpCode::JumpIfFalse => jump_instruction(chunk, op, offset, 1, out),
        OpCode::Loop => jump_instruction(chunk, op, offset, -1, out),
        _ => {
            let _ = writeln!(out, "{}", op.mnemonic());
            offset + 1
        }
    }
}

/// Opcode with a u8 constant-pool operand; renders the constant.
fn constant_instruction(chunk: &Chunk, op: OpCode, offset: usize, out: &mut String) -> usize {
    let Some(operand) = operand_byte(chunk, offset + 1) else {
        let _ = writeln!(out, "{} <truncated>", op.mnemonic());
        return chunk.len();
    };

    let _ = write!(out, "{:<16} {:4} ", op.mnemonic(), operand);
    match chunk.constants().get(operand as usize) {
        Some(Value::Object(Object::String(string))) => {
            let _ = writeln!(out, "\"{}\"", string.as_str());
        }
        Some(value) => {
            let _ = writeln!(out, "{}", value);
        }
        None => {
            let _ = writeln!(out, "<bad constant>");
        }
    }
    offset + 2
}

/// Opcode with a plain u8 operand (slot index or argument count).
fn byte_instruction(chunk: &Chunk, op: OpCode, offset: usize, out: &mut String) -> usize {
    let Some(operand) = operand_byte(chunk, offset + 1) else {
        let _ = writeln!(out, "{} <truncated>", op.mnemonic());
        return chunk.len();
    };
    let _ = writeln!(out, "{:<16} {:4}", op.mnemonic(), operand);
    offset + 2
}

/// Opcode with a u16 jump distance; renders distance and resolved target.
fn jump_instruction(chunk: &Chunk, op: OpCode, offset: usize, sign: i64, out: &mut String) -> usize {
    let (Some(low), Some(high)) = (operand_byte(chunk, offset + 1), operand_byte(chunk, offset + 2))
    else {
        let _ = writeln!(out, "{} <truncated>", op.mnemonic());
        return chunk.len();
    };

    let distance = u16::from_le_bytes([low, high]) as i64;
    let target = offset as i64 + 3 + sign * distance;
    let _ = writeln!(out, "{:<16} {:4} ({:04})", op.mnemonic(), distance, target);
    offset + 3
}

fn operand_byte(chunk: &Chunk, offset: usize) -> Option<u8> {
    chunk.code().get(offset).map(|instruction| instruction.op)
}
