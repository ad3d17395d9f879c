//! The two-tier symbol table: a global map plus a stack of lexical scopes.
//!
//! Grounded in `original_source/apexSym.c`/`apexSym.h`. The original keys
//! locals by name within a linked list of `LocalScope` frames pushed on call
//! and popped on return; spec.md §4.2 explicitly keeps this runtime-name-keyed
//! design rather than resolving locals to slot indices at compile time
//! ("the compiler does not build a lexical slot table").

use ahash::AHashMap;

use crate::intern::StringId;
use crate::value::Value;

/// A flat name → value map, used both as the global table and as one scope
/// frame in the `ScopeStack`.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    entries: AHashMap<StringId, Value>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: StringId) -> Option<Value> {
        self.entries.get(&name).copied()
    }

    /// Sets `name` to `value`, returning the value previously bound there (if
    /// any) so the caller can release its heap reference before overwriting.
    pub fn set(&mut self, name: StringId, value: Value) -> Option<Value> {
        self.entries.insert(name, value)
    }

    pub fn remove(&mut self, name: StringId) -> Option<Value> {
        self.entries.remove(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StringId, &Value)> {
        self.entries.iter()
    }
}

/// Stack of lexical scopes, one frame pushed per function activation.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<SymbolTable>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.frames.push(SymbolTable::new());
    }

    /// Pops the innermost scope, returning its entries so the VM can release
    /// any heap values it owned.
    #[must_use]
    pub fn pop(&mut self) -> Option<SymbolTable> {
        self.frames.pop()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Reads `name` from the innermost active scope, per spec.md §4.2: locals
    /// resolve within the current function activation only (no enclosing
    /// lexical capture across nested scopes beyond one call frame).
    #[must_use]
    pub fn get(&self, name: StringId) -> Option<Value> {
        self.frames.last().and_then(|frame| frame.get(name))
    }

    pub fn set(&mut self, name: StringId, value: Value) -> Option<Value> {
        self.frames
            .last_mut()
            .expect("SET_LOCAL outside any active scope")
            .set(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::ScopeStack;
    use crate::intern::Interner;
    use crate::value::Value;

    #[test]
    fn locals_are_scoped_per_call() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut stack = ScopeStack::new();
        stack.push();
        stack.set(x, Value::Int(1));
        assert_eq!(stack.get(x), Some(Value::Int(1)));
        stack.pop();
        stack.push();
        assert_eq!(stack.get(x), None, "fresh call frame starts empty");
    }
}
