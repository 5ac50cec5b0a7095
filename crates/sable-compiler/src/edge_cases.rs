//! Boundary tests for sable-compiler: the 8-bit and 16-bit operand limits.

use sable_core::Interner;

fn compiles(source: &str) -> bool {
    let mut strings = Interner::new();
    crate::compile(source, &mut strings).is_ok()
}

// ==================== CONSTANT POOL (8-BIT INDEX) ====================

/// A source with `count` distinct number literals as statements.
fn numbers_program(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        source.push_str(&format!("{}.5;\n", i));
    }
    source
}

#[test]
fn test_edge_256_constants_compile() {
    assert!(compiles(&numbers_program(256)));
}

#[test]
fn test_edge_257_constants_fail() {
    assert!(!compiles(&numbers_program(257)));
}

// ==================== LOCAL SLOTS (8-BIT INDEX) ====================

/// A block declaring `count` distinct locals. Slot 0 is reserved for the
/// enclosing function value, so 255 user locals fill the 256-slot frame.
fn locals_program(count: usize) -> String {
    let mut source = String::from("{\n");
    for i in 0..count {
        source.push_str(&format!("var l{} = {};\n", i, i));
    }
    source.push('}');
    source
}

#[test]
fn test_edge_255_locals_fill_the_frame() {
    assert!(compiles(&locals_program(255)));
}

#[test]
fn test_edge_256th_local_overflows_the_frame() {
    assert!(!compiles(&locals_program(256)));
}

// ==================== PARAMETERS AND ARGUMENTS ====================

fn params_program(count: usize) -> String {
    let params: Vec<String> = (0..count).map(|i| format!("p{}", i)).collect();
    format!("fun wide({}) {{}}", params.join(", "))
}

fn args_program(count: usize) -> String {
    format!("f({});", vec!["x"; count].join(", "))
}

#[test]
fn test_edge_255_parameters_compile() {
    assert!(compiles(&params_program(255)));
}

#[test]
fn test_edge_256_parameters_fail() {
    assert!(!compiles(&params_program(256)));
}

#[test]
fn test_edge_255_arguments_compile() {
    assert!(compiles(&args_program(255)));
}

#[test]
fn test_edge_256_arguments_fail() {
    assert!(!compiles(&args_program(256)));
}

// ==================== JUMP DISTANCE (16-BIT OPERAND) ====================
//
// An `if (true) { ... }` then-branch of N instruction words patches its
// exit jump to a distance of N + 4 (the branch pop, the body, and the
// trailing else-jump). `x;` compiles to 3 words (GET_GLOBAL + operand +
// POP) and `x = x;` to 5, which lets the tests hit the 16-bit ceiling
// exactly.

fn jump_program(three_word_statements: usize, five_word_statements: usize) -> String {
    let mut source = String::from("if (true) {\n");
    for _ in 0..three_word_statements {
        source.push_str("x;\n");
    }
    for _ in 0..five_word_statements {
        source.push_str("x = x;\n");
    }
    source.push('}');
    source
}

#[test]
fn test_edge_jump_of_exactly_65535_compiles() {
    // 21842 * 3 + 1 * 5 + 4 == 65535.
    assert!(compiles(&jump_program(21842, 1)));
}

#[test]
fn test_edge_jump_of_65536_fails() {
    // 21844 * 3 + 4 == 65536.
    assert!(!compiles(&jump_program(21844, 0)));
}
