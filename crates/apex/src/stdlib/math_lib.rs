//! The `math:` native library: numeric helpers.
//!
//! `abs`/`floor`/`ceil`/`fmod`/`max` are grounded in `original_source/lib/math.c`'s
//! registration list; `sqrt`/`pow`/`min` are not in that list but are named
//! explicitly by spec.md §3 ("numeric abs/sqrt/pow/floor/ceil"), so they're
//! added as natural siblings of the others.

use crate::bytecode::vm::Vm;
use crate::error::RuntimeError;
use crate::value::Value;

use super::BuiltinFn;

pub const FUNCTIONS: &[(&str, BuiltinFn)] = &[
    ("abs", abs),
    ("sqrt", sqrt),
    ("pow", pow),
    ("floor", floor),
    ("ceil", ceil),
    ("max", max),
    ("min", min),
    ("fmod", fmod),
];

fn expect_arity(argc: usize, expected: usize, name: &str, vm: &Vm) -> Result<(), RuntimeError> {
    if argc != expected {
        return Err(vm.native_error(format!("math:{name} expects {expected} argument(s) but got {argc}")));
    }
    Ok(())
}

fn as_f64(value: Value, vm: &Vm) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(i) => Ok(i as f64),
        Value::Flt(f) => Ok(f64::from(f)),
        Value::Dbl(d) => Ok(d),
        other => Err(vm.native_error(format!("expected a numeric argument, found {}", other.type_name()))),
    }
}

/// Preserves the argument's own numeric type for the result, matching how
/// Apex's arithmetic operators promote rather than always widening to `Dbl`.
fn unary_numeric(vm: &mut Vm, argc: usize, name: &str, f: impl Fn(f64) -> f64) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, name, vm)?;
    let arg = vm.pop_arg()?;
    let result = match arg {
        Value::Int(i) => Value::Int(f(i as f64) as i64),
        Value::Flt(v) => Value::Flt(f(f64::from(v)) as f32),
        Value::Dbl(v) => Value::Dbl(f(v)),
        other => return Err(vm.native_error(format!("math:{name} expects a numeric argument, found {}", other.type_name()))),
    };
    vm.push_result(result)
}

fn abs(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    unary_numeric(vm, argc, "abs", f64::abs)
}

fn sqrt(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 1, "sqrt", vm)?;
    let arg = vm.pop_arg()?;
    let value = as_f64(arg, vm)?;
    vm.push_result(Value::Dbl(value.sqrt()))
}

fn pow(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "pow", vm)?;
    let args = vm.pop_native_args(argc)?;
    let base = as_f64(args[0], vm)?;
    let exp = as_f64(args[1], vm)?;
    vm.push_result(Value::Dbl(base.powf(exp)))
}

fn floor(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    unary_numeric(vm, argc, "floor", f64::floor)
}

fn ceil(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    unary_numeric(vm, argc, "ceil", f64::ceil)
}

fn max(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "max", vm)?;
    let args = vm.pop_native_args(argc)?;
    let a = as_f64(args[0], vm)?;
    let b = as_f64(args[1], vm)?;
    vm.push_result(if a >= b { args[0] } else { args[1] })
}

fn min(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "min", vm)?;
    let args = vm.pop_native_args(argc)?;
    let a = as_f64(args[0], vm)?;
    let b = as_f64(args[1], vm)?;
    vm.push_result(if a <= b { args[0] } else { args[1] })
}

fn fmod(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    expect_arity(argc, 2, "fmod", vm)?;
    let args = vm.pop_native_args(argc)?;
    let a = as_f64(args[0], vm)?;
    let b = as_f64(args[1], vm)?;
    vm.push_result(Value::Dbl(a % b))
}
