//! The `str:` native library: case conversion, length, substring, concatenation.
//!
//! Grounded in `original_source/lib/str.c`'s `str_upper`/`str_lower`/`str_sub`
//! registrations (spec.md §3: "string case conversion, length, substring").
//! `concat` is not in the original's table but is a natural companion to
//! `Interner::concat`, which the `+` operator on strings already uses.

use crate::bytecode::vm::Vm;
use crate::error::RuntimeError;
use crate::value::Value;

use super::BuiltinFn;

pub const FUNCTIONS: &[(&str, BuiltinFn)] = &[
    ("len", len),
    ("upper", upper),
    ("lower", lower),
    ("substr", substr),
    ("concat", concat),
];

fn expect_arity(argc: usize, expected: usize, name: &str, vm: &Vm) -> Result<(), RuntimeError> {
    if argc != expected {
        return Err(vm.native_error(format!("str:{name} expects {expected} argument(s) but got {argc}")));
    }
    Ok(())
}

fn as_str_arg(value: Value, vm: &Vm) -> Result<crate::intern::StringId, RuntimeError> {
    match value {
        Value::Str(id) => Ok(id),
        other => Err(vm.native_error(format!("expected a string argument, found {}", other.type_name()))),
    }
}

fn as_int_arg(value: Value, vm: &Vm) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(i) => Ok(i),
        other => Err(vm.native_error(format!("expected an int argument, found {}", other.type_name()))),
    }
}

fn len(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "len", vm)?;
    let arg = vm.pop_arg()?;
    let id = as_str_arg(arg, vm)?;
    let length = vm.interner().resolve(id).chars().count() as i64;
    vm.push_result(Value::Int(length))
}

fn upper(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "upper", vm)?;
    let arg = vm.pop_arg()?;
    let id = as_str_arg(arg, vm)?;
    let upper = vm.interner().resolve(id).to_uppercase();
    let result = vm.interner_mut().intern(&upper);
    vm.push_result(Value::Str(result))
}

fn lower(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "lower", vm)?;
    let arg = vm.pop_arg()?;
    let id = as_str_arg(arg, vm)?;
    let lower = vm.interner().resolve(id).to_lowercase();
    let result = vm.interner_mut().intern(&lower);
    vm.push_result(Value::Str(result))
}

/// `str:substr(s, start, len)`: a 0-based, clamped substring by character
/// index, following `apexStr.c`'s `apexStr_substr` clamp-don't-error behavior
/// for out-of-range `start`/`len` rather than erroring.
fn substr(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 3, "substr", vm)?;
    let args = vm.pop_native_args(argc)?;
    let id = as_str_arg(args[0], vm)?;
    let start = as_int_arg(args[1], vm)?.max(0) as usize;
    let len = as_int_arg(args[2], vm)?.max(0) as usize;
    let chars: Vec<char> = vm.interner().resolve(id).chars().collect();
    let end = (start + len).min(chars.len());
    let text: String = if start >= chars.len() { String::new() } else { chars[start..end].iter().collect() };
    let result = vm.interner_mut().intern(&text);
    vm.push_result(Value::Str(result))
}

fn concat(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "concat", vm)?;
    let args = vm.pop_native_args(argc)?;
    let a = as_str_arg(args[0], vm)?;
    let b = as_str_arg(args[1], vm)?;
    let result = vm.interner_mut().concat(a, b);
    vm.push_result(Value::Str(result))
}
