//! Interactive REPL session support.
//!
//! Grounded in `ouros/src/bin/ouros-repl.rs`'s read-eval-print loop shape:
//! a persistent session object that keeps interpreter state across
//! `execute`-style calls. Unlike that loop's hand-rolled bracket-balance
//! `needs_more_input` heuristic, incompleteness detection here reuses the
//! parser's own `allow_incomplete` mode (spec.md §4.1), and each accepted
//! snippet is appended to the VM's single running chunk via
//! `Vm::compile_repl_snippet` (spec.md §4.2's "one running chunk" note)
//! rather than recompiling from scratch.

use crate::bytecode::compiler::CompileOutput;
use crate::bytecode::vm::Vm;
use crate::bytecode::Chunk;
use crate::error::{CompileError, RuntimeError, SyntaxError};
use crate::heap::Heap;
use crate::intern::Interner;
use crate::parser::Parser;
use crate::stdlib::Registry;
use crate::symtab::SymbolTable;
use crate::value::Value;

/// The result of submitting one snippet to a [`ReplSession`].
pub enum ReplOutcome {
    /// The snippet ended mid-construct; prompt the user for another line and
    /// resubmit the concatenation.
    Incomplete,
    /// The (complete) snippet failed to parse.
    SyntaxError(Vec<SyntaxError>),
    /// The snippet parsed but failed to compile.
    CompileError(Vec<CompileError>),
    /// The snippet compiled but raised a runtime error.
    RuntimeError(RuntimeError),
    /// The snippet ran to completion, producing this value.
    Value(Value),
}

/// A persistent interactive session: one `Vm` whose chunk, heap, globals,
/// and interner live across every submitted snippet, so a name bound in one
/// line is visible to the next (spec.md §4.2).
pub struct ReplSession {
    vm: Vm,
    filename: String,
}

impl ReplSession {
    /// Starts a fresh session with `@args` bound from `argv` (spec.md §6),
    /// reporting diagnostics against `filename` (conventionally `<stdin>`).
    #[must_use]
    pub fn new(argv: &[String], filename: impl Into<String>) -> Self {
        let output = CompileOutput {
            chunk: Chunk::new(),
            heap: Heap::new(),
            globals: SymbolTable::new(),
        };
        let mut vm = Vm::new(output, Interner::new(), Registry::with_builtins());
        vm.set_program_args(argv);
        Self { vm, filename: filename.into() }
    }

    /// Parses and, if complete, compiles and runs `source` as the next
    /// snippet in this session.
    pub fn submit(&mut self, source: &str) -> ReplOutcome {
        let result = Parser::new(source, self.filename.clone(), self.vm.interner_mut(), true).parse();
        if result.incomplete {
            return ReplOutcome::Incomplete;
        }
        if !result.errors.is_empty() {
            return ReplOutcome::SyntaxError(result.errors);
        }
        if let Err(errors) = self.vm.compile_repl_snippet(&result.program) {
            return ReplOutcome::CompileError(errors);
        }
        match self.vm.run() {
            Ok(value) => ReplOutcome::Value(value),
            Err(err) => ReplOutcome::RuntimeError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReplOutcome, ReplSession};
    use crate::value::Value;

    #[test]
    fn bindings_persist_across_submissions() {
        let mut session = ReplSession::new(&[], "<test>");
        assert!(matches!(session.submit("x = 10;"), ReplOutcome::Value(Value::Int(10))));
        assert!(matches!(session.submit("x + 5;"), ReplOutcome::Value(Value::Int(15))));
    }

    #[test]
    fn unterminated_construct_is_incomplete() {
        let mut session = ReplSession::new(&[], "<test>");
        assert!(matches!(session.submit("if (true) {"), ReplOutcome::Incomplete));
    }

    #[test]
    fn functions_defined_earlier_are_callable_later() {
        let mut session = ReplSession::new(&[], "<test>");
        assert!(matches!(session.submit("fn double(x) { return x * 2; }"), ReplOutcome::Value(Value::Null)));
        assert!(matches!(session.submit("double(21);"), ReplOutcome::Value(Value::Int(42))));
    }
}
