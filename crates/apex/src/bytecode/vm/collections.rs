//! Array/object container opcodes and `foreach` iteration.
//!
//! Grounded in `original_source/apexVal.c`'s array/object accessors and
//! `apexVM.c`'s `OP_ITER_START`/`OP_ITER_NEXT` handling, and spec.md §4.3's
//! exact stack shapes for `CREATE_ARRAY`/`GET_ELEMENT`/`SET_ELEMENT`/
//! `CREATE_OBJECT`/`GET_MEMBER`/`SET_MEMBER` and the iteration opcodes.

use crate::containers::{Array, ArrayKey};
use crate::error::RuntimeError;
use crate::heap::HeapData;
use crate::value::Value;

use super::Vm;

impl Vm {
    /// `CREATE_ARRAY n`: pops `n` (key, value) pairs (value on top of its
    /// key) and pushes a fresh Array built from them in first-insertion order.
    pub(super) fn create_array(&mut self, count_value: Value) -> Result<(), RuntimeError> {
        let count = as_usize(count_value, self)?;
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let value = self.pop()?;
            let key = self.pop()?;
            pairs.push((key, value));
        }
        pairs.reverse();

        let mut array = Array::new();
        for (key, value) in pairs {
            let array_key = ArrayKey::from_value(&key).ok_or_else(|| self.err(format!("a value of type {} cannot be used as an array key", key.type_name())))?;
            array.set(array_key, value);
            if let Some(id) = value.heap_id() {
                self.heap_mut().retain(id);
            }
        }
        let id = self.heap_mut().alloc(HeapData::Array(array));
        self.push(Value::Arr(id))
    }

    /// `GET_ELEMENT`: pops index then container (spec.md §4.3).
    pub(super) fn get_element(&mut self) -> Result<(), RuntimeError> {
        let index = self.pop()?;
        let container = self.pop()?;
        match container {
            Value::Arr(id) => {
                let key = ArrayKey::from_value(&index).ok_or_else(|| self.err(format!("a value of type {} cannot be used as an array key", index.type_name())))?;
                let HeapData::Array(array) = self.heap.get(id) else {
                    return Err(self.err("internal error: Arr value did not point at an array payload"));
                };
                let value = array
                    .get(&key)
                    .copied()
                    .ok_or_else(|| self.err(format!("no such key '{}' in array", crate::containers::key_display(key, &self.interner))))?;
                self.push(value)
            }
            Value::Str(s) => {
                let Value::Int(i) = index else {
                    return Err(self.err(format!("string index must be an int, found {}", index.type_name())));
                };
                let text = self.interner.resolve(s);
                let ch = (i >= 0)
                    .then(|| text.chars().nth(i as usize))
                    .flatten()
                    .ok_or_else(|| self.err(format!("string index {i} out of range")))?;
                let id = self.interner_mut().intern(&ch.to_string());
                self.push(Value::Str(id))
            }
            other => Err(self.err(format!("cannot index a value of type {}", other.type_name()))),
        }
    }

    /// `SET_ELEMENT`: pops index, then container, then value (spec.md §4.3).
    pub(super) fn set_element(&mut self) -> Result<(), RuntimeError> {
        let index = self.pop()?;
        let container = self.pop()?;
        let value = self.pop()?;
        match container {
            Value::Arr(id) => {
                let key = ArrayKey::from_value(&index).ok_or_else(|| self.err(format!("a value of type {} cannot be used as an array key", index.type_name())))?;
                let HeapData::Array(array) = self.heap.get_mut(id) else {
                    return Err(self.err("internal error: Arr value did not point at an array payload"));
                };
                let old = array.get(&key).copied();
                array.set(key, value);
                self.rebind(old, value);
                Ok(())
            }
            other => Err(self.err(format!("cannot assign an element on a value of type {}", other.type_name()))),
        }
    }

    /// `CREATE_OBJECT n`: pops the type-name string then `n` (key, value)
    /// pairs, and stores them as the already-registered `Type`'s field
    /// defaults (spec.md §4.3) — it does not allocate a new instance.
    pub(super) fn create_object(&mut self, count_value: Value) -> Result<(), RuntimeError> {
        let count = as_usize(count_value, self)?;
        let type_name = self.pop()?.as_str_id();
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let value = self.pop()?;
            let key = self.pop()?;
            pairs.push((key.as_str_id(), value));
        }
        pairs.reverse();

        let Some(Value::Type(type_id)) = self.globals.get(type_name) else {
            return Err(self.err(format!("type '{}' was not registered at compile time", self.interner.resolve(type_name))));
        };
        for (key, value) in pairs {
            let HeapData::Object(obj) = self.heap.get_mut(type_id) else {
                return Err(self.err("internal error: Type value did not point at an object payload"));
            };
            let old = obj.get(key).copied();
            obj.set(key, value);
            self.rebind(old, value);
        }
        Ok(())
    }

    /// `GET_MEMBER name`: pops the container, reads `name` from it.
    pub(super) fn get_member(&mut self, name_value: Value) -> Result<(), RuntimeError> {
        let name = name_value.as_str_id();
        let container = self.pop()?;
        match container {
            Value::Obj(id) | Value::Type(id) => {
                let HeapData::Object(obj) = self.heap.get(id) else {
                    return Err(self.err("internal error: Obj value did not point at an object payload"));
                };
                let value = obj
                    .get(name)
                    .copied()
                    .ok_or_else(|| self.err(format!("no such field '{}' on '{}'", self.interner.resolve(name), self.interner.resolve(obj.name))))?;
                self.push(value)
            }
            other => Err(self.err(format!("cannot access member '{}' on a {}", self.interner.resolve(name), other.type_name()))),
        }
    }

    /// `SET_MEMBER name`: pops the container, then the value, and stores.
    pub(super) fn set_member(&mut self, name_value: Value) -> Result<(), RuntimeError> {
        let name = name_value.as_str_id();
        let container = self.pop()?;
        let value = self.pop()?;
        match container {
            Value::Obj(id) | Value::Type(id) => {
                let HeapData::Object(obj) = self.heap.get_mut(id) else {
                    return Err(self.err("internal error: Obj value did not point at an object payload"));
                };
                let old = obj.get(name).copied();
                obj.set(name, value);
                self.rebind(old, value);
                Ok(())
            }
            other => Err(self.err(format!("cannot set member '{}' on a {}", self.interner.resolve(name), other.type_name()))),
        }
    }

    /// `ITER_START`: consumes an iterable (`Arr` only, spec.md §5 open
    /// question resolved against only arrays being iterable) and pushes
    /// `(index = 0, iterable)`.
    pub(super) fn iter_start(&mut self) -> Result<(), RuntimeError> {
        let iterable = self.pop()?;
        match iterable {
            Value::Arr(_) => {
                self.push(Value::Int(0))?;
                self.push(iterable)
            }
            other => Err(self.err(format!("foreach requires an array, found {}", other.type_name()))),
        }
    }

    /// `ITER_NEXT`: stack is `[..., index, iterable]`. If the index has
    /// reached the end, leaves `iterable` on the stack and pushes `false`.
    /// Otherwise pushes `index+1, iterable, value, key, true` (spec.md §4.3).
    pub(super) fn iter_next(&mut self) -> Result<(), RuntimeError> {
        let iterable = self.pop()?;
        let index_value = self.pop()?;
        let Value::Int(index) = index_value else {
            return Err(self.err("internal error: iteration index was not an int"));
        };
        let Value::Arr(id) = iterable else {
            return Err(self.err("internal error: iteration target was not an array"));
        };
        let HeapData::Array(array) = self.heap.get(id) else {
            return Err(self.err("internal error: Arr value did not point at an array payload"));
        };
        if index < 0 || index as usize >= array.len() {
            self.push(iterable)?;
            self.push(Value::Bool(false))
        } else {
            let (key, value) = array.entry_at(index as usize).expect("index bounds checked above");
            self.push(Value::Int(index + 1))?;
            self.push(iterable)?;
            self.push(value)?;
            self.push(key.to_value())?;
            self.push(Value::Bool(true))
        }
    }

    /// `JUMP_IF_DONE offset`: pops the `ITER_NEXT` sentinel. `true` leaves
    /// `index+1, iterable, value, key` on the stack for the loop body to
    /// bind and falls through; `false` discards the trailing `iterable` left
    /// by `ITER_NEXT` (the compiler emits no cleanup after the loop) and
    /// jumps past the body.
    pub(super) fn jump_if_done(&mut self, offset: Value) -> Result<(), RuntimeError> {
        let sentinel = self.pop()?;
        match sentinel {
            Value::Bool(true) => Ok(()),
            Value::Bool(false) => {
                self.pop()?;
                self.set_ip((self.ip() as i64 + offset.as_int()) as usize);
                Ok(())
            }
            other => Err(self.err(format!("internal error: iteration sentinel was not a bool (found {})", other.type_name()))),
        }
    }
}

fn as_usize(value: Value, vm: &Vm) -> Result<usize, RuntimeError> {
    match value {
        Value::Int(i) if i >= 0 => Ok(i as usize),
        other => Err(vm.err(format!("expected a non-negative count, found {}", other.type_name()))),
    }
}
