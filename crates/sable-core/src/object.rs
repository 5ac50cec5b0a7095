//! Heap object kinds: interned strings, functions, native functions.

use std::fmt;
use std::rc::Rc;

use crate::chunk::Chunk;
use crate::table::str_hash;
use crate::value::Value;

/// An immutable interned string.
///
/// The FNV-1a hash is computed once at creation and stored; the interner
/// and the globals table probe on it without rehashing. Two
/// `StringObject`s with equal content never coexist inside one interner,
/// so equality between interned strings is `Rc::ptr_eq`.
#[derive(Debug)]
pub struct StringObject {
    text: Box<str>,
    hash: u32,
}

impl StringObject {
    /// Creates a string object, hashing the content.
    pub fn new(text: &str) -> Self {
        Self::with_hash(text, str_hash(text.as_bytes()))
    }

    /// Creates a string object with a precomputed hash.
    ///
    /// The caller must pass the FNV-1a hash of `text`; the interner uses
    /// this to avoid hashing twice on the probe-then-insert path.
    pub fn with_hash(text: &str, hash: u32) -> Self {
        Self {
            text: text.into(),
            hash,
        }
    }

    /// The string content.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The stored FNV-1a hash of the content.
    pub fn hash(&self) -> u32 {
        self.hash
    }
}

/// What kind of function object this is.
///
/// The kind decides how the function renders in stack traces and values:
/// the synthetic top-level script, a named declaration, or an anonymous
/// function expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    /// The implicit function wrapping top-level code.
    Script,
    /// A `fun name(...) {...}` declaration.
    Named,
    /// A `fun (...) {...}` expression.
    Anonymous,
}

/// A compiled function: its chunk plus calling metadata.
///
/// Produced by the compiler, executed by the VM. `arity` is capped at 255
/// by compile-time checks, so an argument count always fits the `Call`
/// instruction's one-byte operand.
#[derive(Debug)]
pub struct Function {
    /// Script / named / anonymous.
    pub kind: FunctionKind,
    /// Declared name; `None` for scripts and anonymous functions.
    pub name: Option<Rc<StringObject>>,
    /// Number of declared parameters.
    pub arity: u8,
    /// The compiled body.
    pub chunk: Chunk,
}

impl Function {
    /// Creates an empty function of the given kind.
    pub fn new(kind: FunctionKind, name: Option<Rc<StringObject>>) -> Self {
        Self {
            kind,
            name,
            arity: 0,
            chunk: Chunk::new(),
        }
    }

    /// How the function appears in stack traces and printed values:
    /// `script`, the declared name, or `<anonymous>`.
    pub fn describe(&self) -> &str {
        match self.kind {
            FunctionKind::Script => "script",
            FunctionKind::Anonymous => "<anonymous>",
            FunctionKind::Named => self
                .name
                .as_ref()
                .map(|name| name.as_str())
                .unwrap_or("<anonymous>"),
        }
    }
}

/// Host function signature.
///
/// The VM passes the argument window (exactly `arity` values, in call
/// order) and pushes the returned value itself.
pub type NativeFn = fn(&[Value]) -> Value;

/// A host-provided function exposed to Sable code.
#[derive(Debug)]
pub struct NativeFunction {
    /// Name the function was registered under (for display).
    pub name: String,
    /// Required argument count.
    pub arity: u8,
    /// The host callback.
    pub handler: NativeFn,
}

/// A reference to a heap object.
///
/// Cloning bumps a refcount; identity comparison is pointer comparison.
#[derive(Clone, Debug)]
pub enum Object {
    /// An interned string.
    String(Rc<StringObject>),
    /// A compiled function.
    Function(Rc<Function>),
    /// A host function.
    Native(Rc<NativeFunction>),
}

impl Object {
    /// Identity comparison. Interning makes this equivalent to content
    /// equality for strings.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::String(a), Object::String(b)) => Rc::ptr_eq(a, b),
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::Native(a), Object::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::String(string) => write!(f, "{}", string.as_str()),
            Object::Function(function) => match function.kind {
                FunctionKind::Script => write!(f, "<script>"),
                _ => write!(f, "<fn {}>", function.describe()),
            },
            Object::Native(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_object_stores_hash() {
        let object = StringObject::new("hello");
        assert_eq!(object.hash(), str_hash(b"hello"));
        assert_eq!(object.as_str(), "hello");
        assert_eq!(object.len(), 5);
    }

    #[test]
    fn test_function_describe() {
        let script = Function::new(FunctionKind::Script, None);
        assert_eq!(script.describe(), "script");

        let name = Rc::new(StringObject::new("area"));
        let named = Function::new(FunctionKind::Named, Some(name));
        assert_eq!(named.describe(), "area");

        let anon = Function::new(FunctionKind::Anonymous, None);
        assert_eq!(anon.describe(), "<anonymous>");
    }

    #[test]
    fn test_object_identity() {
        let a = Rc::new(StringObject::new("x"));
        let same = Object::String(a.clone());
        let also_same = Object::String(a);
        let different = Object::String(Rc::new(StringObject::new("x")));

        assert!(same.ptr_eq(&also_same));
        // Equal content but distinct allocation: identity says no. The
        // interner is what prevents this situation for real values.
        assert!(!same.ptr_eq(&different));
    }

    #[test]
    fn test_object_display() {
        let string = Object::String(Rc::new(StringObject::new("hi")));
        assert_eq!(format!("{}", string), "hi");

        let function = Object::Function(Rc::new(Function::new(
            FunctionKind::Named,
            Some(Rc::new(StringObject::new("area"))),
        )));
        assert_eq!(format!("{}", function), "<fn area>");

        let script = Object::Function(Rc::new(Function::new(FunctionKind::Script, None)));
        assert_eq!(format!("{}", script), "<script>");
    }
}
