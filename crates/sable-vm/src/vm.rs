//! The virtual machine: value stack, call frames, and the dispatch loop.

use std::fmt::Write as _;
use std::rc::Rc;

use sable_core::{
    disassemble, disassemble_instruction, Function, FunctionKind, Interner, NativeFn,
    NativeFunction, Object, OpCode, StringObject, Table, Value,
};
use sable_util::InterpretError;
use thiserror::Error;

/// Maximum call depth.
pub const FRAMES_MAX: usize = 64;

/// Value stack capacity: one full frame of locals per possible call.
pub const STACK_MAX: usize = FRAMES_MAX * 256;

/// A fatal runtime condition. The message is the one-line reason printed
/// before the stack trace.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RuntimeError {
    message: String,
}

impl RuntimeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One activation of a function.
struct CallFrame {
    /// The function being executed.
    function: Rc<Function>,
    /// Index of the next instruction word in the function's chunk.
    ip: usize,
    /// Stack slot holding the callee value; locals are addressed
    /// relative to this.
    base: usize,
}

/// The Sable virtual machine.
///
/// Owns the value stack, the frame stack, the globals table, and the
/// string interner. One VM is one isolated world: nothing is shared
/// between instances, and dropping the VM drops every object it ever
/// allocated.
///
/// # Example
///
/// ```
/// use sable_vm::Vm;
///
/// let mut vm = Vm::new();
/// assert!(vm.interpret("var greeting = \"hi\";").is_ok());
/// ```
pub struct Vm {
    frames: Vec<CallFrame>,
    stack: Vec<Value>,
    globals: Table,
    strings: Interner,
    dump_bytecode: bool,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Creates a VM with the default natives registered.
    pub fn new() -> Self {
        let mut vm = Self {
            frames: Vec::with_capacity(FRAMES_MAX),
            stack: Vec::with_capacity(STACK_MAX),
            globals: Table::new(),
            strings: Interner::new(),
            dump_bytecode: false,
        };
        crate::natives::install(&mut vm);
        vm
    }

    /// Disassemble every compiled function to stdout before running it.
    pub fn set_dump_bytecode(&mut self, enabled: bool) {
        self.dump_bytecode = enabled;
    }

    /// Registers a host function under `name`. Must be called before the
    /// code that uses it runs; the function becomes an ordinary global.
    pub fn define_native(&mut self, name: &str, arity: u8, handler: NativeFn) {
        let key = self.strings.intern(name);
        let native = Rc::new(NativeFunction {
            name: name.to_string(),
            arity,
            handler,
        });
        self.globals.set(key, Value::Object(Object::Native(native)));
    }

    /// Reads a global by name (host inspection API).
    pub fn get_global(&mut self, name: &str) -> Option<Value> {
        let key = self.strings.intern(name);
        self.globals.get(&key).cloned()
    }

    /// Compiles and runs `source` to completion.
    ///
    /// Compile errors have already been reported to stderr by the
    /// compiler; runtime errors are reported here, stack trace included,
    /// and the VM is reset so it can be reused (the REPL relies on this).
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = sable_compiler::compile(source, &mut self.strings)
            .map_err(|_| InterpretError::Compile)?;

        if self.dump_bytecode {
            self.dump_function(&function);
        }

        tracing::debug!(target: "sable_vm", "executing script");
        let result = self
            .push(Value::Object(Object::Function(function.clone())))
            .and_then(|()| self.call_function(function, 0))
            .and_then(|()| self.run());

        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                self.report_runtime_error(&error);
                self.reset();
                Err(InterpretError::Runtime)
            }
        }
    }

    // =========================================================================
    // DISPATCH LOOP
    // =========================================================================

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if tracing::enabled!(target: "sable_vm", tracing::Level::TRACE) {
                self.trace_instruction();
            }

            let byte = self.read_byte();
            let Some(op) = OpCode::from_byte(byte) else {
                return Err(RuntimeError::new(format!("unknown opcode {}", byte)));
            };

            match op {
                OpCode::Const => {
                    let constant = self.read_constant();
                    self.push(constant)?;
                }
                OpCode::Nil => self.push(Value::Nil)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.pop();
                }

                OpCode::Neg => match self.pop() {
                    Value::Number(value) => self.push(Value::Number(-value))?,
                    _ => return Err(RuntimeError::new("operand must be a number")),
                },
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsy()))?;
                }

                OpCode::Add => self.add()?,
                OpCode::Sub => self.binary_numeric(|a, b| Value::Number(a - b))?,
                OpCode::Mul => self.binary_numeric(|a, b| Value::Number(a * b))?,
                OpCode::Div => self.binary_numeric(|a, b| Value::Number(a / b))?,
                OpCode::Less => self.binary_numeric(|a, b| Value::Bool(a < b))?,
                OpCode::Greater => self.binary_numeric(|a, b| Value::Bool(a > b))?,

                OpCode::Eq => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b))?;
                }

                OpCode::Print => {
                    let value = self.pop();
                    println!("{}", value);
                }

                OpCode::DefineGlobal => {
                    let name = self.read_string()?;
                    let value = self.pop();
                    self.globals.set(name, value);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string()?;
                    match self.globals.get(&name).cloned() {
                        Some(value) => self.push(value)?,
                        None => return Err(undefined_identifier(&name)),
                    }
                }
                OpCode::SetGlobal => {
                    let name = self.read_string()?;
                    let value = self.peek();
                    // Assignment may not create a global; undo the insert
                    // a fresh key just performed.
                    if self.globals.set(name.clone(), value) {
                        self.globals.delete(&name);
                        return Err(undefined_identifier(&name));
                    }
                }

                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    let value = self.stack[base + slot].clone();
                    self.push(value)?;
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let value = self.peek();
                    let base = self.frame().base;
                    self.stack[base + slot] = value;
                }

                OpCode::Jump => {
                    let distance = self.read_u16() as usize;
                    self.frame_mut().ip += distance;
                }
                OpCode::JumpIfFalse => {
                    let distance = self.read_u16() as usize;
                    if self.peek().is_falsy() {
                        self.frame_mut().ip += distance;
                    }
                }
                OpCode::Loop => {
                    let distance = self.read_u16() as usize;
                    self.frame_mut().ip -= distance;
                }

                OpCode::Call => {
                    let argc = self.read_byte();
                    self.call_value(argc)?;
                }
                OpCode::Return => {
                    let result = self.pop();
                    let Some(frame) = self.frames.pop() else {
                        return Ok(());
                    };
                    self.stack.truncate(frame.base);
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.push(result)?;
                }
            }
        }
    }

    // =========================================================================
    // CALLS
    // =========================================================================

    fn call_value(&mut self, argc: u8) -> Result<(), RuntimeError> {
        let callee_slot = self.stack.len() - argc as usize - 1;
        let callee = self.stack[callee_slot].clone();
        match callee {
            Value::Object(Object::Function(function)) => self.call_function(function, argc),
            Value::Object(Object::Native(native)) => self.call_native(&native, argc),
            _ => Err(RuntimeError::new("can only call functions")),
        }
    }

    fn call_function(&mut self, function: Rc<Function>, argc: u8) -> Result<(), RuntimeError> {
        if argc != function.arity {
            return Err(RuntimeError::new(format!(
                "expected {} arguments but got {}",
                function.arity, argc
            )));
        }
        if self.frames.len() >= FRAMES_MAX {
            return Err(RuntimeError::new("stack overflow"));
        }

        tracing::trace!(target: "sable_vm", callee = function.describe(), "call");
        let base = self.stack.len() - argc as usize - 1;
        self.frames.push(CallFrame {
            function,
            ip: 0,
            base,
        });
        Ok(())
    }

    fn call_native(&mut self, native: &Rc<NativeFunction>, argc: u8) -> Result<(), RuntimeError> {
        if argc != native.arity {
            return Err(RuntimeError::new(format!(
                "expected {} arguments but got {}",
                native.arity, argc
            )));
        }

        let first_arg = self.stack.len() - argc as usize;
        let result = (native.handler)(&self.stack[first_arg..]);
        // Drop the arguments and the callee value, push the result.
        self.stack.truncate(first_arg - 1);
        self.push(result)
    }

    // =========================================================================
    // FRAME AND STACK PRIMITIVES
    // =========================================================================

    fn frame(&self) -> &CallFrame {
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frame_mut();
        let byte = frame.function.chunk.code()[frame.ip].op;
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self) -> u16 {
        let low = self.read_byte();
        let high = self.read_byte();
        u16::from_le_bytes([low, high])
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte();
        self.frame().function.chunk.constant(index).clone()
    }

    fn read_string(&mut self) -> Result<Rc<StringObject>, RuntimeError> {
        match self.read_constant() {
            Value::Object(Object::String(string)) => Ok(string),
            _ => Err(RuntimeError::new("expected string constant")),
        }
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::new("stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Value {
        debug_assert!(!self.stack.is_empty(), "pop on empty stack");
        self.stack.pop().unwrap_or(Value::Nil)
    }

    fn peek(&self) -> Value {
        self.stack.last().cloned().unwrap_or(Value::Nil)
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// `Add`: numeric addition, except that a string on either side turns
    /// the operation into stringify-and-concatenate. The result goes
    /// through the interner, so repeated concatenations of equal content
    /// share one object.
    fn add(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => {
                let sum = x + y;
                self.push(Value::Number(sum))
            }
            _ if a.as_string().is_some() || b.as_string().is_some() => {
                let text = format!("{}{}", a, b);
                let object = self.strings.intern(&text);
                self.push(Value::Object(Object::String(object)))
            }
            _ => Err(RuntimeError::new("operands must be numbers")),
        }
    }

    fn binary_numeric(&mut self, apply: fn(f64, f64) -> Value) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        match (a, b) {
            (Value::Number(a), Value::Number(b)) => self.push(apply(a, b)),
            _ => Err(RuntimeError::new("operands must be numbers")),
        }
    }

    // =========================================================================
    // DIAGNOSTICS
    // =========================================================================

    /// One line of reason, then the frame trace, innermost first, using
    /// the line of the instruction preceding each frame's ip.
    fn report_runtime_error(&self, error: &RuntimeError) {
        eprintln!("{}", error);
        for frame in self.frames.iter().rev() {
            let instruction = frame.ip.saturating_sub(1);
            let line = frame
                .function
                .chunk
                .code()
                .get(instruction)
                .map(|word| word.line)
                .unwrap_or(0);
            match frame.function.kind {
                FunctionKind::Script => eprintln!("[line {}] in script", line),
                FunctionKind::Named => {
                    eprintln!("[line {}] in fn {}", line, frame.function.describe());
                }
                FunctionKind::Anonymous => eprintln!("[line {}] in <anonymous>", line),
            }
        }
    }

    fn dump_function(&self, function: &Function) {
        print!("{}", disassemble(&function.chunk, function.describe()));
        for constant in function.chunk.constants() {
            if let Value::Object(Object::Function(nested)) = constant {
                self.dump_function(nested);
            }
        }
    }

    fn trace_instruction(&self) {
        let frame = self.frame();
        let mut instruction = String::new();
        disassemble_instruction(&frame.function.chunk, frame.ip, &mut instruction);

        let mut stack_view = String::new();
        for value in &self.stack {
            let _ = write!(stack_view, "[ {} ] ", value);
        }
        tracing::trace!(
            target: "sable_vm",
            stack = %stack_view.trim_end(),
            instruction = %instruction.trim_end(),
        );
    }
}

fn undefined_identifier(name: &Rc<StringObject>) -> RuntimeError {
    RuntimeError::new(format!("undefined identifier '{}'", name.as_str()))
}
