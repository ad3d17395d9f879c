//! Apex: a dynamically-typed scripting language with a bytecode VM.
//!
//! Pipeline: source text → [`lexer`]/[`parser`] → AST ([`ast`]) →
//! [`bytecode::compiler`] → [`bytecode::vm`]. [`repl`] wraps the VM for
//! interactive use; [`stdlib`] provides the native libraries `CALL_LIB`
//! dispatches to.

pub mod args;
pub mod ast;
pub mod bytecode;
pub mod containers;
pub mod error;
pub mod function;
pub mod heap;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod stdlib;
pub mod symtab;
pub mod value;

pub use crate::args::program_args;
pub use crate::bytecode::compiler::{compile, compile_into, CompileOutput};
pub use crate::bytecode::vm::Vm;
pub use crate::error::{ApexError, CompileError, RuntimeError, SrcLoc, SyntaxError};
pub use crate::intern::{Interner, StringId};
pub use crate::parser::{ParseResult, Parser};
pub use crate::repl::{ReplOutcome, ReplSession};
pub use crate::stdlib::Registry;
pub use crate::value::Value;

/// Parses, compiles, and runs `source` as a complete program: the one-shot
/// pipeline `apex-cli`'s script-execution mode drives (spec.md §6).
pub fn run_script(source: &str, filename: &str, argv: &[String]) -> Result<Value, ApexError> {
    let mut interner = Interner::new();
    let result = Parser::new(source, filename, &mut interner, false).parse();
    if !result.errors.is_empty() {
        return Err(result.errors.into_iter().next().expect("checked non-empty").into());
    }
    let output = compile(&result.program, &mut interner).map_err(|mut errors| -> ApexError { errors.remove(0).into() })?;
    let mut vm = Vm::new(output, interner, Registry::with_builtins());
    vm.set_program_args(argv);
    vm.run().map_err(Into::into)
}
