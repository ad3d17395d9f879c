//! The `io:` native library: printing and line-based reading.
//!
//! Grounded in `original_source/lib/io.c`'s `io_print`/`io_write`/`io_read`
//! registrations (spec.md §3: "io:print/io:read"). `io:open`'s file-handle
//! resource management needs a `Ptr`-backed resource table this pass doesn't
//! build, so it's left out; see `DESIGN.md`.

use std::io::{self, BufRead, Write};

use crate::bytecode::vm::Vm;
use crate::error::RuntimeError;
use crate::value::Value;

use super::BuiltinFn;

pub const FUNCTIONS: &[(&str, BuiltinFn)] = &[("print", print), ("write", write), ("read", read)];

fn expect_arity(argc: usize, expected: usize, name: &str, vm: &Vm) -> Result<(), RuntimeError> {
    if argc != expected {
        return Err(vm.native_error(format!("io:{name} expects {expected} argument(s) but got {argc}")));
    }
    Ok(())
}

fn print(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "print", vm)?;
    let arg = vm.pop_arg()?;
    println!("{}", arg.display_string(vm.heap(), vm.interner()));
    vm.push_result(Value::Null)
}

fn write(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "write", vm)?;
    let arg = vm.pop_arg()?;
    print!("{}", arg.display_string(vm.heap(), vm.interner()));
    io::stdout().flush().map_err(|e| vm.native_error(format!("io:write failed: {e}")))?;
    vm.push_result(Value::Null)
}

/// Reads one line from stdin (trailing newline stripped), or `null` at EOF.
fn read(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 0, "read", vm)?;
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line).map_err(|e| vm.native_error(format!("io:read failed: {e}")))?;
    if read == 0 {
        return vm.push_result(Value::Null);
    }
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let id = vm.interner_mut().intern(trimmed);
    vm.push_result(Value::Str(id))
}
