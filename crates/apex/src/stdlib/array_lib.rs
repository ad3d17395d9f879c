//! The `array:` native library: length, membership, mutation, and joining.
//!
//! `key_exists` is grounded in `original_source/lib/array.c`'s registration
//! list; `len`/`push`/`unset`/`keys`/`values`/`join` are named by spec.md §3
//! ("array length/keys/values/push/unset") and are built the way
//! `containers.rs`'s `Array` already exposes them (`push_synthetic`,
//! `remove`), so `unset` is exactly `Array::remove` wired up to a name.

use crate::bytecode::vm::Vm;
use crate::containers::ArrayKey;
use crate::error::RuntimeError;
use crate::heap::HeapData;
use crate::value::Value;

use super::BuiltinFn;

pub const FUNCTIONS: &[(&str, BuiltinFn)] = &[
    ("len", len),
    ("key_exists", key_exists),
    ("push", push),
    ("unset", unset),
    ("keys", keys),
    ("values", values),
    ("join", join),
];

fn expect_arity(argc: usize, expected: usize, name: &str, vm: &Vm) -> Result<(), RuntimeError> {
    if argc != expected {
        return Err(vm.native_error(format!("array:{name} expects {expected} argument(s) but got {argc}")));
    }
    Ok(())
}

fn as_array_arg(value: Value, vm: &Vm) -> Result<crate::heap::HeapId, RuntimeError> {
    match value {
        Value::Arr(id) => Ok(id),
        other => Err(vm.native_error(format!("expected an array argument, found {}", other.type_name()))),
    }
}

fn as_key_arg(value: Value, vm: &Vm) -> Result<ArrayKey, RuntimeError> {
    ArrayKey::from_value(&value).ok_or_else(|| vm.native_error(format!("a value of type {} cannot be used as an array key", value.type_name())))
}

fn len(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "len", vm)?;
    let arg = vm.pop_arg()?;
    let id = as_array_arg(arg, vm)?;
    let HeapData::Array(array) = vm.heap().get(id) else {
        return Err(vm.native_error("internal error: array argument did not point at an array payload"));
    };
    let length = array.len() as i64;
    vm.push_result(Value::Int(length))
}

fn key_exists(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "key_exists", vm)?;
    let args = vm.pop_native_args(argc)?;
    let id = as_array_arg(args[0], vm)?;
    let key = as_key_arg(args[1], vm)?;
    let HeapData::Array(array) = vm.heap().get(id) else {
        return Err(vm.native_error("internal error: array argument did not point at an array payload"));
    };
    let exists = array.get(&key).is_some();
    vm.push_result(Value::Bool(exists))
}

fn push(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "push", vm)?;
    let args = vm.pop_native_args(argc)?;
    let id = as_array_arg(args[0], vm)?;
    let value = args[1];
    let HeapData::Array(array) = vm.heap_mut().get_mut(id) else {
        return Err(vm.native_error("internal error: array argument did not point at an array payload"));
    };
    array.push_synthetic(value);
    if let Some(heap_id) = value.heap_id() {
        vm.heap_mut().retain(heap_id);
    }
    vm.push_result(args[0])
}

fn unset(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "unset", vm)?;
    let args = vm.pop_native_args(argc)?;
    let id = as_array_arg(args[0], vm)?;
    let key = as_key_arg(args[1], vm)?;
    let HeapData::Array(array) = vm.heap_mut().get_mut(id) else {
        return Err(vm.native_error("internal error: array argument did not point at an array payload"));
    };
    let removed = array.remove(&key);
    if let Some(removed) = removed {
        if let Some(heap_id) = removed.heap_id() {
            vm.heap_mut().release(heap_id);
        }
    }
    vm.push_result(args[0])
}

fn keys(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "keys", vm)?;
    let arg = vm.pop_arg()?;
    let id = as_array_arg(arg, vm)?;
    let HeapData::Array(array) = vm.heap().get(id) else {
        return Err(vm.native_error("internal error: array argument did not point at an array payload"));
    };
    let mut result = crate::containers::Array::new();
    for (key, _) in array.iter() {
        result.push_synthetic(key.to_value());
    }
    let result_id = vm.heap_mut().alloc(HeapData::Array(result));
    vm.push_result(Value::Arr(result_id))
}

fn values(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "values", vm)?;
    let arg = vm.pop_arg()?;
    let id = as_array_arg(arg, vm)?;
    let HeapData::Array(array) = vm.heap().get(id) else {
        return Err(vm.native_error("internal error: array argument did not point at an array payload"));
    };
    let entries: Vec<Value> = array.values().copied().collect();
    let mut result = crate::containers::Array::new();
    for value in &entries {
        result.push_synthetic(*value);
        if let Some(heap_id) = value.heap_id() {
            vm.heap_mut().retain(heap_id);
        }
    }
    let result_id = vm.heap_mut().alloc(HeapData::Array(result));
    vm.push_result(Value::Arr(result_id))
}

fn join(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "join", vm)?;
    let args = vm.pop_native_args(argc)?;
    let id = as_array_arg(args[0], vm)?;
    let Value::Str(sep_id) = args[1] else {
        return Err(vm.native_error(format!("array:join expects a string separator, found {}", args[1].type_name())));
    };
    let sep = vm.interner().resolve(sep_id).to_owned();
    let HeapData::Array(array) = vm.heap().get(id) else {
        return Err(vm.native_error("internal error: array argument did not point at an array payload"));
    };
    let joined = array
        .values()
        .map(|v| v.display_string(vm.heap(), vm.interner()))
        .collect::<Vec<_>>()
        .join(&sep);
    let result = vm.interner_mut().intern(&joined);
    vm.push_result(Value::Str(result))
}
