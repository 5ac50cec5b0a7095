//! The single-pass compiler: parser, scope tracker, and code generator in
//! one walk over the token stream.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use sable_core::{Function, FunctionKind, Interner, Object, OpCode, Value};
use sable_lex::{Scanner, Token, TokenKind};
use sable_util::Handler;

use crate::rules::{rule, InfixRule, Precedence, PrefixRule};

/// Maximum local slots per function, including the reserved slot 0 that
/// holds the function value itself. Slots are addressed by a one-byte
/// operand, so 255 user locals plus the reserved slot is the ceiling.
pub(crate) const MAX_LOCALS: usize = 256;

/// A local variable descriptor. Exists only during compilation; its index
/// in the locals array is the runtime stack slot relative to the frame
/// base.
struct Local<'src> {
    /// Name token lexeme.
    name: &'src str,
    /// Scope depth, or `None` while the initializer is still being
    /// compiled (reading the variable then is an error).
    depth: Option<u32>,
}

/// Per-function compilation state.
///
/// Entering a nested function swaps a fresh scope in and keeps the
/// enclosing one on the Rust call stack; leaving swaps it back. The
/// locals array always describes the function currently being compiled,
/// so resolution never sees an outer function's slots - a name that
/// misses here is compiled as a global reference.
struct FunctionScope<'src> {
    /// The function being built.
    function: Function,
    /// Live local descriptors; index == frame-relative slot.
    locals: Vec<Local<'src>>,
    /// Current block nesting depth; 0 is global scope.
    scope_depth: u32,
    /// Constant-pool indices already issued for identifier names, so
    /// repeated references to one global reuse a single constant.
    const_cache: FxHashMap<&'src str, u8>,
}

impl<'src> FunctionScope<'src> {
    fn new(kind: FunctionKind, name: Option<Rc<sable_core::StringObject>>) -> Self {
        Self {
            function: Function::new(kind, name),
            // Slot 0 belongs to the function value itself.
            locals: vec![Local {
                name: "",
                depth: Some(0),
            }],
            scope_depth: 0,
            const_cache: FxHashMap::default(),
        }
    }
}

/// The compiler. Create with [`Compiler::new`], run with
/// [`Compiler::compile`].
pub(crate) struct Compiler<'src, 'ctx> {
    scanner: Scanner<'src>,
    /// Most recently consumed token.
    previous: Token<'src>,
    /// Next token to consume.
    current: Token<'src>,
    /// Diagnostic sink.
    handler: &'ctx Handler,
    /// Set on the first error; suppresses diagnostics until the next
    /// statement boundary.
    panic_mode: bool,
    /// Runtime string identity space, shared with the VM.
    strings: &'ctx mut Interner,
    /// State of the function currently being compiled.
    func: FunctionScope<'src>,
}

impl<'src, 'ctx> Compiler<'src, 'ctx> {
    pub(crate) fn new(source: &'src str, strings: &'ctx mut Interner, handler: &'ctx Handler) -> Self {
        Self {
            scanner: Scanner::new(source),
            previous: Token::synthetic(TokenKind::Eof),
            current: Token::synthetic(TokenKind::Eof),
            handler,
            panic_mode: false,
            strings,
            func: FunctionScope::new(FunctionKind::Script, None),
        }
    }

    /// Compiles the whole source into the top-level script function.
    pub(crate) fn compile(mut self) -> Function {
        self.advance();
        while !self.matches(TokenKind::Eof) {
            self.declaration();
        }
        self.emit_return();
        self.func.function
    }

    // =========================================================================
    // TOKEN PLUMBING
    // =========================================================================

    /// Advances past error tokens, reporting each one.
    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let token = self.current;
            self.error_at(token, token.lexeme);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    /// Whether the token after `current` is an identifier. Forks the
    /// scanner; used to tell `fun name(...)` declarations from anonymous
    /// `fun (...)` expressions.
    fn next_is_identifier(&self) -> bool {
        let mut lookahead = self.scanner.clone();
        lookahead.next_token().kind == TokenKind::Identifier
    }

    // =========================================================================
    // DIAGNOSTICS
    // =========================================================================

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let context = match token.kind {
            // Error tokens carry the message as their lexeme; EOF has no
            // lexeme worth quoting.
            TokenKind::Eof | TokenKind::Error => None,
            _ => Some(token.lexeme),
        };
        self.handler.error(token.line, context, message);
    }

    /// Skips to the next statement boundary and leaves panic mode.
    fn synchronize(&mut self) {
        self.panic_mode = false;

        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // CODE EMISSION
    // =========================================================================

    fn emit_op(&mut self, op: OpCode) {
        let line = self.previous.line;
        self.func.function.chunk.write_op(op, line);
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.func.function.chunk.write(byte, line);
    }

    /// The implicit `return nil` terminating every function.
    fn emit_return(&mut self) {
        self.emit_ops(OpCode::Nil, OpCode::Return);
    }

    fn emit_constant(&mut self, value: Value) {
        let constant = self.make_constant(value);
        self.emit_op(OpCode::Const);
        self.emit_byte(constant);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.func.function.chunk.add_constant(value) {
            Some(index) => index,
            None => {
                self.error("too many constants in one chunk");
                0
            }
        }
    }

    /// Constant-pool index for an identifier name, deduplicated per
    /// function.
    fn identifier_constant(&mut self, name: &'src str) -> u8 {
        if let Some(&index) = self.func.const_cache.get(name) {
            return index;
        }
        let object = self.strings.intern(name);
        let index = self.make_constant(Value::Object(Object::String(object)));
        self.func.const_cache.insert(name, index);
        index
    }

    /// Emits a forward jump with a placeholder distance; returns the
    /// offset of the first operand word for [`Compiler::patch_jump`].
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.func.function.chunk.len() - 2
    }

    /// Resolves a forward jump to the current end of code.
    fn patch_jump(&mut self, offset: usize) {
        // The distance is measured from just past the two operand words.
        let distance = self.func.function.chunk.len() - offset - 2;
        if distance > u16::MAX as usize {
            self.error("too much code to jump over");
            return;
        }
        let [low, high] = (distance as u16).to_le_bytes();
        self.func.function.chunk.patch(offset, low);
        self.func.function.chunk.patch(offset + 1, high);
    }

    /// Emits a backward jump to `loop_start`; the distance is known up
    /// front, so no patching is involved.
    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let distance = self.func.function.chunk.len() - loop_start + 2;
        let distance = if distance > u16::MAX as usize {
            self.error("loop body too large");
            0
        } else {
            distance as u16
        };
        let [low, high] = distance.to_le_bytes();
        self.emit_byte(low);
        self.emit_byte(high);
    }

    // =========================================================================
    // SCOPES AND LOCALS
    // =========================================================================

    fn begin_scope(&mut self) {
        self.func.scope_depth += 1;
    }

    /// Closes a scope, popping each local it declared.
    fn end_scope(&mut self) {
        self.func.scope_depth -= 1;
        while self
            .func
            .locals
            .last()
            .is_some_and(|local| local.depth.is_some_and(|depth| depth > self.func.scope_depth))
        {
            self.emit_op(OpCode::Pop);
            self.func.locals.pop();
        }
    }

    /// Records a local for the just-consumed identifier. Global scope
    /// declares nothing here; globals are defined by name at runtime.
    fn declare_variable(&mut self) {
        if self.func.scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;

        let mut duplicate = false;
        for local in self.func.locals.iter().rev() {
            // Stop at the enclosing scope; only same-scope names clash.
            if local.depth.is_some_and(|depth| depth < self.func.scope_depth) {
                break;
            }
            if local.name == name {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("variable already defined");
        }

        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        if self.func.locals.len() >= MAX_LOCALS {
            self.error("too many local variables in function");
            return;
        }
        self.func.locals.push(Local { name, depth: None });
    }

    /// Marks the newest local as initialized, making it resolvable.
    fn mark_initialized(&mut self) {
        if self.func.scope_depth == 0 {
            return;
        }
        if let Some(local) = self.func.locals.last_mut() {
            local.depth = Some(self.func.scope_depth);
        }
    }

    /// Resolves a name against the current function's locals, innermost
    /// first. `None` means the reference compiles as a global.
    fn resolve_local(&mut self, name: &str) -> Option<u8> {
        let mut in_own_initializer = false;
        let mut found = None;
        for (index, local) in self.func.locals.iter().enumerate().rev() {
            if local.name == name {
                in_own_initializer = local.depth.is_none();
                found = Some(index as u8);
                break;
            }
        }
        if in_own_initializer {
            self.error("cannot read variable in its own initializer");
        }
        found
    }

    // =========================================================================
    // DECLARATIONS
    // =========================================================================

    fn declaration(&mut self) {
        if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else if self.check(TokenKind::Fun) && self.next_is_identifier() {
            self.advance();
            self.fun_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("expected variable name");

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "expected ';' after variable declaration");

        self.define_variable(global);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("expected function name");
        // A function may refer to itself; it is initialized from the
        // moment its body starts compiling.
        self.mark_initialized();
        self.function_body(FunctionKind::Named);
        self.define_variable(global);
    }

    /// Consumes an identifier and declares it. Returns the name's
    /// constant index for globals; locals return a dummy 0 (they are
    /// addressed by slot, not name).
    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.func.scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.lexeme)
    }

    fn define_variable(&mut self, global: u8) {
        if self.func.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op(OpCode::DefineGlobal);
        self.emit_byte(global);
    }

    /// Compiles a parameter list and body into a fresh function, then
    /// emits a constant reference to it in the enclosing chunk.
    ///
    /// For [`FunctionKind::Named`] the name is `previous` (the declaration
    /// just consumed it); anonymous functions start at their `fun` token.
    fn function_body(&mut self, kind: FunctionKind) {
        let name = match kind {
            FunctionKind::Named => Some(self.strings.intern(self.previous.lexeme)),
            _ => None,
        };
        let paren_message = match kind {
            FunctionKind::Named => "expected '(' after function name",
            _ => "expected '(' after 'fun'",
        };

        let enclosing = std::mem::replace(&mut self.func, FunctionScope::new(kind, name));
        // The body scope has no matching end_scope: Return truncates the
        // whole frame at runtime.
        self.begin_scope();

        self.consume(TokenKind::LeftParen, paren_message);
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.func.function.arity == u8::MAX {
                    self.error_at_current("cannot have more than 255 parameters");
                } else {
                    self.func.function.arity += 1;
                }
                let param = self.parse_variable("expected parameter name");
                self.define_variable(param);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after parameters");
        self.consume(TokenKind::LeftBrace, "expected '{' before function body");
        self.block();
        self.emit_return();

        let finished = std::mem::replace(&mut self.func, enclosing);
        let constant = self.make_constant(Value::Object(Object::Function(Rc::new(
            finished.function,
        ))));
        self.emit_op(OpCode::Const);
        self.emit_byte(constant);
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "expected '}' after block");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "expected ';' after value");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "expected ';' after expression");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "expected '(' after 'if'");
        self.expression();
        self.consume(TokenKind::RightParen, "expected ')' after condition");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        let else_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);
        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.func.function.chunk.len();
        self.consume(TokenKind::LeftParen, "expected '(' after 'while'");
        self.expression();
        self.consume(TokenKind::RightParen, "expected ')' after condition");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    /// C-style `for`: optional initializer, optional condition, optional
    /// increment. The increment compiles *before* the body in the
    /// bytecode, so the body jumps back to the increment and the
    /// increment jumps back to the condition.
    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "expected '(' after 'for'");

        if self.matches(TokenKind::Semicolon) {
            // No initializer.
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.func.function.chunk.len();
        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "expected ';' after loop condition");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.func.function.chunk.len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "expected ')' after for clauses");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    fn return_statement(&mut self) {
        if self.func.function.kind == FunctionKind::Script {
            self.error("cannot return from top-level code");
        }

        if self.matches(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "expected ';' after return value");
            self.emit_op(OpCode::Return);
        }
    }

    // =========================================================================
    // EXPRESSIONS (PRATT CORE)
    // =========================================================================

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// The Pratt core: one prefix production, then infix productions as
    /// long as their precedence meets the floor.
    ///
    /// Assignment is special-cased: a variable prefix may only consume a
    /// trailing `=` when the floor is at or below `Assignment`, which is
    /// exactly when the expression position can be a target. A leftover
    /// `=` after the loop is therefore always an invalid target.
    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix = rule(self.previous.kind).prefix;
        if prefix == PrefixRule::None {
            self.error("expected expression");
            return;
        }

        let can_assign = precedence <= Precedence::Assignment;
        self.run_prefix(prefix, can_assign);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            let infix = rule(self.previous.kind).infix;
            self.run_infix(infix);
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("invalid assignment target");
        }
    }

    fn run_prefix(&mut self, prefix: PrefixRule, can_assign: bool) {
        match prefix {
            PrefixRule::None => {}
            PrefixRule::Grouping => self.grouping(),
            PrefixRule::Unary => self.unary(),
            PrefixRule::Number => self.number(),
            PrefixRule::String => self.string(),
            PrefixRule::Literal => self.literal(),
            PrefixRule::Variable => self.variable(can_assign),
            PrefixRule::Function => self.function_body(FunctionKind::Anonymous),
        }
    }

    fn run_infix(&mut self, infix: InfixRule) {
        match infix {
            InfixRule::None => {}
            InfixRule::Binary => self.binary(),
            InfixRule::And => self.and_operator(),
            InfixRule::Or => self.or_operator(),
            InfixRule::Call => self.call(),
        }
    }

    // =========================================================================
    // PREFIX HANDLERS
    // =========================================================================

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "expected ')' after expression");
    }

    fn number(&mut self) {
        // The scanner guarantees a well-formed decimal literal.
        let value: f64 = self.previous.lexeme.parse().unwrap_or_default();
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        // Strip the surrounding quotes; there are no escape sequences.
        let text = &lexeme[1..lexeme.len() - 1];
        let object = self.strings.intern(text);
        self.emit_constant(Value::Object(Object::String(object)));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => self.error("expected expression"),
        }
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Neg),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => self.error("expected expression"),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        let (get_op, set_op, operand) = match self.resolve_local(name) {
            Some(slot) => (OpCode::GetLocal, OpCode::SetLocal, slot),
            None => (
                OpCode::GetGlobal,
                OpCode::SetGlobal,
                self.identifier_constant(name),
            ),
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op(set_op);
        } else {
            self.emit_op(get_op);
        }
        self.emit_byte(operand);
    }

    // =========================================================================
    // INFIX HANDLERS
    // =========================================================================

    fn binary(&mut self) {
        let operator = self.previous.kind;
        // Left-associative: the right operand must bind strictly tighter.
        self.parse_precedence(rule(operator).precedence.one_higher());

        match operator {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Sub),
            TokenKind::Star => self.emit_op(OpCode::Mul),
            TokenKind::Slash => self.emit_op(OpCode::Div),
            TokenKind::EqualEqual => self.emit_op(OpCode::Eq),
            TokenKind::BangEqual => self.emit_ops(OpCode::Eq, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            _ => self.error("expected expression"),
        }
    }

    /// `a and b`: if `a` is falsy it is the result; otherwise pop it and
    /// evaluate `b`.
    fn and_operator(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    /// `a or b`: if `a` is truthy it is the result; otherwise pop it and
    /// evaluate `b`.
    fn or_operator(&mut self) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self) {
        let argc = self.argument_list();
        self.emit_op(OpCode::Call);
        self.emit_byte(argc);
    }

    fn argument_list(&mut self) -> u8 {
        let mut argc: u8 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if argc == u8::MAX {
                    self.error("cannot have more than 255 arguments");
                } else {
                    argc += 1;
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after arguments");
        argc
    }
}
