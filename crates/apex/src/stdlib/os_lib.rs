//! The `os:` native library: process exit, environment, and time.
//!
//! `exit`/`time` are grounded in `original_source/lib/os.c`'s registration
//! list; `getenv` is named by spec.md §3 ("os:exit/os:getenv"). `remove`/
//! `rename`/`date` are left out: the first two are destructive filesystem
//! operations outside this crate's scope, and `date` formatting needs the
//! `chrono` dependency DESIGN.md already drops.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::bytecode::vm::Vm;
use crate::error::RuntimeError;
use crate::value::Value;

use super::BuiltinFn;

pub const FUNCTIONS: &[(&str, BuiltinFn)] = &[("exit", exit), ("getenv", getenv), ("time", time)];

fn expect_arity(argc: usize, expected: usize, name: &str, vm: &Vm) -> Result<(), RuntimeError> {
    if argc != expected {
        return Err(vm.native_error(format!("os:{name} expects {expected} argument(s) but got {argc}")));
    }
    Ok(())
}

/// `os:exit(code)`: terminates the process immediately, matching
/// `original_source/lib/os.c`'s `os_exit` calling `exit(3)` directly rather
/// than unwinding through the VM.
fn exit(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "exit", vm)?;
    let arg = vm.pop_arg()?;
    let Value::Int(code) = arg else {
        return Err(vm.native_error(format!("os:exit expects an int argument, found {}", arg.type_name())));
    };
    std::process::exit(code as i32);
}

fn getenv(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "getenv", vm)?;
    let arg = vm.pop_arg()?;
    let Value::Str(name_id) = arg else {
        return Err(vm.native_error(format!("os:getenv expects a string argument, found {}", arg.type_name())));
    };
    let name = vm.interner().resolve(name_id).to_owned();
    match std::env::var(&name) {
        Ok(value) => {
            let id = vm.interner_mut().intern(&value);
            vm.push_result(Value::Str(id))
        }
        Err(_) => vm.push_result(Value::Null),
    }
}

/// `os:time()`: seconds since the Unix epoch, avoiding the `chrono`
/// dependency this crate does not carry for a single timestamp call.
fn time(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 0, "time", vm)?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| vm.native_error(format!("os:time failed: {e}")))?;
    vm.push_result(Value::Int(now.as_secs() as i64))
}
