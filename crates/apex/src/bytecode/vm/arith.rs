//! Arithmetic, comparison, and unary-operator opcodes.
//!
//! Grounded in `original_source/apexVM.c`'s `vm_add`/`vm_sub`/`vm_mul`/
//! `vm_div`/`vm_mod`/`vm_cmp` and the `OP_NEGATE`/`OP_POSITIVE`/`OP_NOT`
//! dispatch arms. Operand pop order is fixed as right-then-left (the
//! original calls e.g. `vm_add(vm, stack_pop(vm), stack_pop(vm))`, which is
//! undefined evaluation order in C; this VM pops the right operand first,
//! then the left, and always evaluates the binary op as `left OP right`).
//!
//! `vm_mod`'s mixed-type cases other than `(int,int)`, `(int,flt)`,
//! `(int,dbl)`, and `(flt,flt)` use C's `/` instead of `%` in the original —
//! a copy-paste bug that contradicts both `vm_mod`'s own doc comment
//! ("the remainder is the result of the operation") and spec.md §4.3's
//! description of modulus. Every combination here computes an actual
//! remainder.

use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::value::Value;

use super::Vm;

/// Distinguishes the two error messages `binary_arith` can produce, since
/// the original gives subtraction and multiplication distinct wording.
pub(super) enum ArithVerb {
    Sub,
    Mul,
}

impl ArithVerb {
    fn message(&self, a: &str, b: &str) -> String {
        match self {
            Self::Sub => format!("cannot subtract {a} from {b}"),
            Self::Mul => format!("cannot multiply {a} with {b}"),
        }
    }
}

impl Vm {
    pub(super) fn binary_add(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => Value::Int(x + y),
            (Value::Int(x), Value::Flt(y)) => Value::Flt(x as f32 + y),
            (Value::Int(x), Value::Dbl(y)) => Value::Dbl(x as f64 + y),
            (Value::Flt(x), Value::Flt(y)) => Value::Flt(x + y),
            (Value::Flt(x), Value::Int(y)) => Value::Flt(x + y as f32),
            (Value::Flt(x), Value::Dbl(y)) => Value::Dbl(x as f64 + y),
            (Value::Dbl(x), Value::Dbl(y)) => Value::Dbl(x + y),
            (Value::Dbl(x), Value::Int(y)) => Value::Dbl(x + y as f64),
            (Value::Dbl(x), Value::Flt(y)) => Value::Dbl(x + y as f64),
            (Value::Str(x), Value::Str(y)) => {
                let mut joined = self.interner.resolve(x).to_owned();
                joined.push_str(self.interner.resolve(y));
                Value::Str(self.interner.intern(&joined))
            }
            (Value::Bool(_), Value::Bool(_)) => {
                return Err(self.err("cannot perform arithmetic on a boolean value"));
            }
            (Value::Str(_), Value::Int(_)) | (Value::Int(_), Value::Str(_)) => {
                return Err(self.err("cannot add string to an int"));
            }
            (Value::Str(_), Value::Flt(_)) | (Value::Flt(_), Value::Str(_)) => {
                return Err(self.err("cannot add string to a flt"));
            }
            (Value::Str(_), Value::Dbl(_)) | (Value::Dbl(_), Value::Str(_)) => {
                return Err(self.err("cannot add string to a dbl"));
            }
            (Value::Int(_), Value::Bool(_)) | (Value::Bool(_), Value::Int(_)) => {
                return Err(self.err("cannot add bool to an int"));
            }
            (Value::Str(_), Value::Bool(_)) | (Value::Bool(_), Value::Str(_)) => {
                return Err(self.err("cannot add string to a bool"));
            }
            (a, b) => {
                return Err(self.err(format!("cannot add {} to {}", a.type_name(), b.type_name())));
            }
        };
        self.push(result)
    }

    pub(super) fn binary_arith(
        &mut self,
        int_op: impl Fn(i64, i64) -> i64,
        flt_op: impl Fn(f32, f32) -> f32,
        dbl_op: impl Fn(f64, f64) -> f64,
        verb: ArithVerb,
    ) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => Value::Int(int_op(x, y)),
            (Value::Int(x), Value::Flt(y)) => Value::Flt(flt_op(x as f32, y)),
            (Value::Int(x), Value::Dbl(y)) => Value::Dbl(dbl_op(x as f64, y)),
            (Value::Flt(x), Value::Flt(y)) => Value::Flt(flt_op(x, y)),
            (Value::Flt(x), Value::Int(y)) => Value::Flt(flt_op(x, y as f32)),
            (Value::Flt(x), Value::Dbl(y)) => Value::Dbl(dbl_op(x as f64, y)),
            (Value::Dbl(x), Value::Dbl(y)) => Value::Dbl(dbl_op(x, y)),
            (Value::Dbl(x), Value::Int(y)) => Value::Dbl(dbl_op(x, y as f64)),
            (Value::Dbl(x), Value::Flt(y)) => Value::Dbl(dbl_op(x, y as f64)),
            (a, b) => {
                return Err(self.err(verb.message(a.type_name(), b.type_name())));
            }
        };
        self.push(result)
    }

    pub(super) fn binary_div(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        if is_zero(b) {
            return Err(self.err("division by zero"));
        }
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => Value::Int(x / y),
            (Value::Int(x), Value::Flt(y)) => Value::Flt(x as f32 / y),
            (Value::Int(x), Value::Dbl(y)) => Value::Dbl(x as f64 / y),
            (Value::Flt(x), Value::Flt(y)) => Value::Flt(x / y),
            (Value::Flt(x), Value::Int(y)) => Value::Flt(x / y as f32),
            (Value::Flt(x), Value::Dbl(y)) => Value::Dbl(x as f64 / y),
            (Value::Dbl(x), Value::Dbl(y)) => Value::Dbl(x / y),
            (Value::Dbl(x), Value::Int(y)) => Value::Dbl(x / y as f64),
            (Value::Dbl(x), Value::Flt(y)) => Value::Dbl(x / y as f64),
            (a, b) => {
                return Err(self.err(format!("cannot divide {} by {}", a.type_name(), b.type_name())));
            }
        };
        self.push(result)
    }

    pub(super) fn binary_mod(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        if is_zero(b) {
            return Err(self.err("modulus by zero"));
        }
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => Value::Int(x % y),
            (Value::Int(x), Value::Flt(y)) => Value::Flt((x % round_to_i64(f64::from(y))) as f32),
            (Value::Int(x), Value::Dbl(y)) => Value::Dbl((x % round_to_i64(y)) as f64),
            (Value::Flt(x), Value::Flt(y)) => {
                Value::Flt((round_to_i64(f64::from(x)) % round_to_i64(f64::from(y))) as f32)
            }
            (Value::Flt(x), Value::Int(y)) => Value::Flt((round_to_i64(f64::from(x)) % y) as f32),
            (Value::Flt(x), Value::Dbl(y)) => Value::Dbl((round_to_i64(f64::from(x)) % round_to_i64(y)) as f64),
            (Value::Dbl(x), Value::Dbl(y)) => Value::Dbl((round_to_i64(x) % round_to_i64(y)) as f64),
            (Value::Dbl(x), Value::Int(y)) => Value::Dbl((round_to_i64(x) % y) as f64),
            (Value::Dbl(x), Value::Flt(y)) => Value::Dbl((round_to_i64(x) % round_to_i64(f64::from(y))) as f64),
            (a, b) => {
                return Err(self.err(format!("cannot apply modulus on {} by {}", a.type_name(), b.type_name())));
            }
        };
        self.push(result)
    }

    pub(super) fn binary_bitand(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => self.push(Value::Int(x & y)),
            (a, b) => Err(self.err(format!("cannot apply '&' to {} and {}", a.type_name(), b.type_name()))),
        }
    }

    pub(super) fn binary_bitor(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => self.push(Value::Int(x | y)),
            (a, b) => Err(self.err(format!("cannot apply '|' to {} and {}", a.type_name(), b.type_name()))),
        }
    }

    pub(super) fn compare_eq(&mut self, is_eq: bool) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let equal = if let Some(order) = numeric_order(a, b) {
            order.is_eq()
        } else {
            match (a, b) {
                (Value::Str(x), Value::Str(y)) => x == y,
                (Value::Bool(x), Value::Bool(y)) => x == y,
                (Value::Null, Value::Null) => true,
                (Value::Fn(x), Value::Fn(y))
                | (Value::Arr(x), Value::Arr(y))
                | (Value::Obj(x), Value::Obj(y))
                | (Value::Type(x), Value::Type(y)) => x == y,
                (Value::CFn(x), Value::CFn(y)) => x == y,
                (Value::Ptr(x), Value::Ptr(y)) => x == y,
                _ => false,
            }
        };
        self.push(Value::Bool(if is_eq { equal } else { !equal }))
    }

    pub(super) fn compare_ord(&mut self, pred: impl Fn(Ordering) -> bool) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let order = numeric_order(a, b)
            .ok_or_else(|| self.err(format!("cannot compare {} to {}", a.type_name(), b.type_name())))?;
        self.push(Value::Bool(pred(order)))
    }

    pub(super) fn unary_negate(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop()?;
        let result = match value {
            Value::Int(i) => Value::Int(-i),
            Value::Flt(f) => Value::Flt(-f),
            Value::Dbl(d) => Value::Dbl(-d),
            other => return Err(self.err(format!("cannot negate {}", other.type_name()))),
        };
        self.push(result)
    }

    pub(super) fn unary_positive(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop()?;
        let result = match value {
            Value::Int(_) | Value::Flt(_) | Value::Dbl(_) => value,
            other => return Err(self.err(format!("cannot positive {}", other.type_name()))),
        };
        self.push(result)
    }
}

fn is_zero(value: Value) -> bool {
    match value {
        Value::Int(i) => i == 0,
        Value::Flt(f) => f == 0.0,
        Value::Dbl(d) => d == 0.0,
        _ => false,
    }
}

fn round_to_i64(value: f64) -> i64 {
    value.round() as i64
}

/// Numeric three-way comparison shared by `compare_eq` and `compare_ord`.
/// `None` means at least one operand is not numeric.
fn numeric_order(a: Value, b: Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(&y)),
        (Value::Int(x), Value::Flt(y)) => (x as f32).partial_cmp(&y),
        (Value::Int(x), Value::Dbl(y)) => (x as f64).partial_cmp(&y),
        (Value::Flt(x), Value::Flt(y)) => x.partial_cmp(&y),
        (Value::Flt(x), Value::Int(y)) => x.partial_cmp(&(y as f32)),
        (Value::Flt(x), Value::Dbl(y)) => (x as f64).partial_cmp(&y),
        (Value::Dbl(x), Value::Dbl(y)) => x.partial_cmp(&y),
        (Value::Dbl(x), Value::Int(y)) => x.partial_cmp(&(y as f64)),
        (Value::Dbl(x), Value::Flt(y)) => x.partial_cmp(&(y as f64)),
        _ => None,
    }
}
