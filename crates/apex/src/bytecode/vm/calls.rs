//! `CALL`, `CALL_MEMBER`, `CALL_LIB`, `NEW`, and `RETURN` — function dispatch
//! and the call-frame/scope lifecycle around them.
//!
//! Grounded in `original_source/apexVM.c`'s `vm_call`/`vm_callmember`/
//! `vm_new`/`OP_RETURN` handling and spec.md §4.3's "State machine of a Fn
//! call". The original pushes the return address onto the value stack as a
//! bare int; this VM tracks it as a `CallFrame` field instead (see the
//! `CallFrame` doc comment in `mod.rs`), so `RETURN` always pops exactly one
//! value — the one the compiler guarantees precedes every `RETURN` opcode
//! (`Stmt::Return` compiles to `<value-or-PushNull>; RETURN`, and
//! `compile_fn_decl` appends a synthetic `PushNull; RETURN` so a body that
//! falls off the end still leaves a value to pop).

use crate::error::RuntimeError;
use crate::function::{Function, NativeFunction};
use crate::heap::HeapData;
use crate::value::Value;

use super::{CallFrame, Vm};

impl Vm {
    /// `CALL argc`: pops a callable (Fn or CFn) then `argc` positional args.
    pub(super) fn call(&mut self, argc_value: Value) -> Result<(), RuntimeError> {
        let argc = as_usize(argc_value, &self.srcloc)?;
        let callee = self.pop()?;
        match callee {
            Value::Fn(fn_id) => {
                let function = self.function_at(fn_id)?;
                self.invoke_apex_fn(&function, argc, None)
            }
            Value::CFn(native) => self.invoke_native(native, argc),
            other => Err(self.err(format!("cannot call a value of type {}", other.type_name()))),
        }
    }

    /// `CALL_MEMBER name`: stack is `[args…, receiver, argc]`; looks up
    /// `name` on the receiver (spec.md §4.3 "field lookup") and dispatches,
    /// binding `this` to the receiver for the duration of an Apex-fn call.
    pub(super) fn call_member(&mut self, name_value: Value) -> Result<(), RuntimeError> {
        let name = name_value.as_str_id();
        let argc_value = self.pop()?;
        let argc = as_usize(argc_value, &self.srcloc)?;
        let receiver = self.pop()?;
        let field = self.lookup_field(receiver, name)?;
        match field {
            Value::Fn(fn_id) => {
                let function = self.function_at(fn_id)?;
                self.invoke_apex_fn(&function, argc, Some(receiver))
            }
            Value::CFn(native) => self.invoke_native(native, argc),
            other => Err(self.err(format!(
                "member '{}' is not callable (found {})",
                self.interner.resolve(name),
                other.type_name()
            ))),
        }
    }

    /// `CALL_LIB argc`: stack is `[args…, lib_name, fn_name]`.
    pub(super) fn call_lib(&mut self, argc_value: Value) -> Result<(), RuntimeError> {
        let argc = as_usize(argc_value, &self.srcloc)?;
        let fn_name = self.pop()?.as_str_id();
        let lib_name = self.pop()?.as_str_id();
        let native = NativeFunction { lib: lib_name, name: fn_name };
        self.invoke_native(native, argc)
    }

    /// `NEW argc`: stack is `[args…, type]`. Deep-copies the type's field
    /// map into a fresh instance, then calls its `new` method if one exists.
    pub(super) fn new_instance(&mut self, argc_value: Value) -> Result<(), RuntimeError> {
        let argc = as_usize(argc_value, &self.srcloc)?;
        let type_value = self.pop()?;
        let Value::Type(type_id) = type_value else {
            return Err(self.err(format!("cannot instantiate a value of type {}", type_value.type_name())));
        };
        let (instance, type_name) = match self.heap.get(type_id) {
            HeapData::Object(type_obj) => (type_obj.shallow_clone_fields(type_obj.name), type_obj.name),
            _ => return Err(self.err("internal error: Type value did not point at an object payload")),
        };

        let field_values: Vec<Value> = instance.iter().map(|(_, v)| *v).collect();
        for value in &field_values {
            if let Some(id) = value.heap_id() {
                self.heap.retain(id);
            }
        }
        let ctor = instance.get(self.new_id).copied();
        let instance_id = self.heap.alloc(HeapData::Object(instance));
        let receiver = Value::Obj(instance_id);

        match ctor {
            Some(Value::Fn(fn_id)) => {
                let function = self.function_at(fn_id)?;
                self.invoke_apex_fn(&function, argc, Some(receiver))
            }
            Some(Value::CFn(_)) => Err(self.err("a type's 'new' method must be an Apex function, not a native one")),
            Some(_) | None => {
                if argc == 0 {
                    self.push(receiver)
                } else {
                    Err(self.err(format!(
                        "type '{}' has no constructor but {argc} argument(s) were given",
                        self.interner.resolve(type_name)
                    )))
                }
            }
        }
    }

    /// `RETURN`: pops the return value, the active call frame, and the
    /// function's scope; restores the instruction pointer and the previous
    /// object-context. Returns `true` when the call stack is now empty
    /// (top-level `RETURN`, which `run()` treats like `HALT`).
    pub(super) fn return_from_call(&mut self) -> Result<bool, RuntimeError> {
        let value = self.pop()?;
        let Some(frame) = self.call_stack.pop() else {
            // A top-level `return;` (outside any function): treat like HALT.
            self.push(value)?;
            return Ok(true);
        };

        let is_constructor = frame.fn_name == self.new_id && matches!(self.obj_context, Some(Value::Obj(_)));
        let result = if is_constructor {
            if !matches!(value, Value::Null) {
                eprintln!("warning: constructor '{}' return value discarded", self.interner.resolve(frame.fn_name));
            }
            self.obj_context.expect("checked by is_constructor")
        } else {
            value
        };

        if let Some(scope) = self.scopes.pop() {
            for (_, bound) in scope.iter() {
                if let Some(id) = bound.heap_id() {
                    self.heap.release(id);
                }
            }
        }

        self.obj_context = frame.saved_obj_context;
        self.ip = frame.return_ip;
        self.push(result)?;
        Ok(false)
    }

    /// Reads a `Function`'s payload out of the heap without holding a borrow
    /// across the rest of the call (the struct is small; cloning is cheap
    /// and avoids fighting the borrow checker while pushing frames/scopes).
    fn function_at(&self, fn_id: crate::heap::HeapId) -> Result<Function, RuntimeError> {
        match self.heap.get(fn_id) {
            HeapData::Function(f) => Ok(f.clone()),
            _ => Err(self.err("internal error: Fn value did not point at a function payload")),
        }
    }

    fn lookup_field(&self, receiver: Value, name: crate::intern::StringId) -> Result<Value, RuntimeError> {
        let Some(id) = receiver.heap_id() else {
            return Err(self.err(format!("cannot access member '{}' on a {}", self.interner.resolve(name), receiver.type_name())));
        };
        match self.heap.get(id) {
            HeapData::Object(obj) => obj
                .get(name)
                .copied()
                .ok_or_else(|| self.err(format!("no such field '{}' on '{}'", self.interner.resolve(name), self.interner.resolve(obj.name)))),
            _ => Err(self.err(format!("cannot access member '{}' on a {}", self.interner.resolve(name), receiver.type_name()))),
        }
    }

    /// Shared call-frame/scope setup for an Apex-defined function, used by
    /// `call`, `call_member`, and `new_instance`. `receiver` is `Some` only
    /// for member calls and constructors, binding `this` for the duration.
    fn invoke_apex_fn(&mut self, function: &Function, argc: usize, receiver: Option<Value>) -> Result<(), RuntimeError> {
        if !function.accepts(argc) {
            return Err(self.err(format!(
                "function '{}' expects {}{} argument(s) but got {argc}",
                self.interner.resolve(function.name),
                if function.variadic { "at least " } else { "" },
                function.argc
            )));
        }
        let mut args = self.pop_native_args(argc)?;

        self.call_stack.push(CallFrame {
            fn_name: function.name,
            return_ip: self.ip,
            call_srcloc: self.srcloc.clone(),
            saved_obj_context: self.obj_context,
        });
        self.scopes.push();

        if function.variadic {
            let tail = args.split_off(function.argc);
            for (name, value) in function.params[..function.argc].iter().zip(args) {
                self.bind_local(*name, value);
            }
            let mut array = crate::containers::Array::new();
            for value in tail {
                array.push_synthetic(value);
                if let Some(id) = value.heap_id() {
                    self.heap.retain(id);
                }
            }
            let arr_id = self.heap.alloc(HeapData::Array(array));
            let variadic_name = *function.params.last().expect("variadic function has at least one param");
            self.bind_local(variadic_name, Value::Arr(arr_id));
        } else {
            for (name, value) in function.params.iter().zip(args) {
                self.bind_local(*name, value);
            }
        }

        if let Some(receiver) = receiver {
            self.obj_context = Some(receiver);
        }
        self.ip = function.address;
        Ok(())
    }

    fn bind_local(&mut self, name: crate::intern::StringId, value: Value) {
        let old = self.scopes.set(name, value);
        self.rebind(old, value);
    }

    /// Invokes a registered native-library function by taking the registry
    /// out of `self` for the duration of the call (it would otherwise be a
    /// `&mut self` inside a `&mut self` method).
    fn invoke_native(&mut self, native: NativeFunction, argc: usize) -> Result<(), RuntimeError> {
        let registry = std::mem::take(&mut self.natives);
        let result = registry.call(self, native.lib, native.name, argc);
        self.natives = registry;
        result
    }
}

fn as_usize(value: Value, srcloc: &crate::error::SrcLoc) -> Result<usize, RuntimeError> {
    match value {
        Value::Int(i) if i >= 0 => Ok(i as usize),
        other => Err(RuntimeError::new(srcloc.clone(), format!("expected a non-negative argument count, found {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::compiler::compile;
    use crate::intern::Interner;
    use crate::parser::Parser;
    use crate::stdlib::Registry;
    use crate::value::Value;

    fn run(src: &str) -> Value {
        let mut interner = Interner::new();
        let result = Parser::new(src, "<test>", &mut interner, false).parse();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let output = compile(&result.program, &mut interner).expect("compile error");
        let mut vm = super::Vm::new(output, interner, Registry::with_builtins());
        vm.run().expect("runtime error")
    }

    #[test]
    fn variadic_sum() {
        let v = run("fn sum(*xs) { s = 0; foreach (v in xs) { s += v; } return s; } return sum(1,2,3,4);");
        assert_eq!(v, Value::Int(10));
    }

    #[test]
    fn object_construction_and_independent_instances() {
        let v = run(
            r"
            Point { x = 0, y = 0 }
            fn Point.new(a, b) { this.x = a; this.y = b; }
            fn Point.norm2() { return this.x*this.x + this.y*this.y; }
            p = Point.new(3, 4);
            return p.norm2();
            ",
        );
        assert_eq!(v, Value::Int(25));
    }

    #[test]
    fn fixed_arity_mismatch_errors() {
        let mut interner = Interner::new();
        let result = Parser::new("fn f(a,b) { return a+b; } f(1);", "<test>", &mut interner, false).parse();
        let output = compile(&result.program, &mut interner).expect("compile error");
        let mut vm = super::Vm::new(output, interner, Registry::with_builtins());
        assert!(vm.run().is_err());
    }
}
