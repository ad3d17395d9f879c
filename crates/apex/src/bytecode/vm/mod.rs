//! The stack-based bytecode interpreter.
//!
//! Grounded in `original_source/apexVM.c`'s `vm_execute` dispatch loop and
//! `ApexVM` struct. Split the same way `ouros/src/bytecode/vm/{binary,call,
//! collections}.rs` splits its dispatch helpers out of `mod.rs`: this file
//! owns the `Vm` struct, the fetch/dispatch loop, and the opcodes simple
//! enough not to need their own module; `arith.rs`, `calls.rs`, and
//! `collections.rs` hold the rest.

mod arith;
mod calls;
mod collections;

use crate::bytecode::compiler::CompileOutput;
use crate::bytecode::{Chunk, OpCode};
use crate::error::{RuntimeError, SrcLoc, TraceFrame};
use crate::heap::{Heap, HeapData, HeapId};
use crate::intern::{Interner, StringId};
use crate::stdlib::Registry;
use crate::symtab::{ScopeStack, SymbolTable};
use crate::value::Value;

use self::arith::ArithVerb;

const STACK_MAX: usize = 4096;
const CALL_STACK_MAX: usize = 512;

/// One active function invocation. Mirrors `original_source/apexVM.h`'s
/// `CallFrame { fn_name, srcloc }`, plus the return address the original
/// keeps on the value stack as a bare int (kept as a struct field here
/// instead, since Rust has no use for that stringly-typed stack trick).
#[derive(Debug, Clone)]
struct CallFrame {
    fn_name: StringId,
    return_ip: usize,
    call_srcloc: SrcLoc,
    /// The object-context active just before this call, restored on return
    /// so a method calling another method resumes with its own `this`
    /// (spec.md §4.3: "on return, the context is cleared" — cleared back to
    /// whatever it was, not unconditionally to `None`).
    saved_obj_context: Option<Value>,
}

/// The bytecode interpreter. Owns everything produced by compilation (the
/// chunk, the heap, and the global table) plus the interner those all key
/// into, so that one `Vm` is a fully self-contained execution of one program
/// (spec.md §9 "Global state": no process-wide statics).
pub struct Vm {
    chunk: Chunk,
    heap: Heap,
    globals: SymbolTable,
    interner: Interner,
    natives: Registry,
    stack: Vec<Value>,
    call_stack: Vec<CallFrame>,
    scopes: ScopeStack,
    obj_context: Option<Value>,
    ip: usize,
    srcloc: SrcLoc,
    this_id: StringId,
    new_id: StringId,
}

impl Vm {
    #[must_use]
    pub fn new(output: CompileOutput, mut interner: Interner, natives: Registry) -> Self {
        let this_id = interner.intern("this");
        let new_id = interner.intern("new");
        Self {
            chunk: output.chunk,
            heap: output.heap,
            globals: output.globals,
            interner,
            natives,
            stack: Vec::with_capacity(256),
            call_stack: Vec::new(),
            scopes: ScopeStack::new(),
            obj_context: None,
            ip: 0,
            srcloc: SrcLoc::unknown(),
            this_id,
            new_id,
        }
    }

    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub(crate) fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub(crate) fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Advances the instruction pointer past the running chunk's current end,
    /// so a freshly appended REPL snippet runs starting from its own first
    /// instruction rather than re-executing from 0 (spec.md §4.2 note on the
    /// REPL appending to one running chunk).
    pub(crate) fn set_ip(&mut self, ip: usize) {
        self.ip = ip;
    }

    #[must_use]
    pub(crate) fn ip(&self) -> usize {
        self.ip
    }

    /// Compiles one REPL snippet into the chunk already loaded and positions
    /// the instruction pointer at the snippet's first new instruction, so the
    /// next `run()` resumes there instead of re-executing from 0. Lives here
    /// (rather than as a free function composing `heap_mut`/`globals_mut`/
    /// `interner_mut`) because it needs three disjoint `&mut` borrows of
    /// `self` at once, which only a method on `Vm` itself can take.
    pub(crate) fn compile_repl_snippet(&mut self, program: &crate::ast::Program) -> Result<(), Vec<crate::error::CompileError>> {
        let start = self.chunk.len();
        crate::bytecode::compiler::compile_repl_into(&mut self.chunk, &mut self.heap, &mut self.globals, &mut self.interner, program)?;
        self.ip = start;
        Ok(())
    }

    pub(crate) fn globals_mut(&mut self) -> &mut SymbolTable {
        &mut self.globals
    }

    /// Binds the `@args` global to an Array of Str values built from `argv`
    /// (spec.md §6). Needs disjoint `&mut` access to the heap, the interner,
    /// and the global table at once, so (like `compile_repl_snippet`) it
    /// lives here rather than behind separate accessors.
    pub fn set_program_args(&mut self, argv: &[String]) {
        let mut array = crate::containers::Array::new();
        for arg in argv {
            let id = self.interner.intern(arg);
            array.push_synthetic(Value::Str(id));
        }
        let heap_id = self.heap.alloc(HeapData::Array(array));
        let name = self.interner.intern("@args");
        let old = self.globals.set(name, Value::Arr(heap_id));
        self.rebind(old, Value::Arr(heap_id));
    }

    /// Pops `argc` values for a native-library call and returns them in
    /// call-site order (reversing the LIFO pop order), for native functions
    /// that want all their arguments at once instead of popping one at a time.
    pub(crate) fn pop_native_args(&mut self, argc: usize) -> Result<Vec<Value>, RuntimeError> {
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.pop()?);
        }
        args.reverse();
        Ok(args)
    }

    pub(crate) fn pop_arg(&mut self) -> Result<Value, RuntimeError> {
        self.pop()
    }

    pub(crate) fn push_result(&mut self, value: Value) -> Result<(), RuntimeError> {
        self.push(value)
    }

    pub(crate) fn native_error(&self, message: impl Into<String>) -> RuntimeError {
        self.err(message)
    }

    #[must_use]
    pub(crate) fn srcloc(&self) -> SrcLoc {
        self.srcloc.clone()
    }

    /// Runs from instruction 0 until `HALT`, returning the final top-of-stack
    /// value (or `Null` if the stack ended up empty).
    pub fn run(&mut self) -> Result<Value, RuntimeError> {
        loop {
            if self.ip >= self.chunk.len() {
                return Ok(self.stack.pop().unwrap_or(Value::Null));
            }
            let ins = self.chunk.ins[self.ip].clone();
            self.ip += 1;
            self.srcloc = ins.srcloc.clone();

            match ins.opcode {
                OpCode::Halt => return Ok(self.stack.pop().unwrap_or(Value::Null)),
                OpCode::PushInt | OpCode::PushFlt | OpCode::PushDbl | OpCode::PushStr | OpCode::PushBool => {
                    self.push(ins.value)?;
                }
                OpCode::PushNull => self.push(Value::Null)?,
                OpCode::Pop => {
                    self.pop()?;
                }
                OpCode::Add => self.binary_add()?,
                OpCode::Sub => self.binary_arith(|a, b| a - b, |a, b| a - b, |a, b| a - b, ArithVerb::Sub)?,
                OpCode::Mul => self.binary_arith(|a, b| a * b, |a, b| a * b, |a, b| a * b, ArithVerb::Mul)?,
                OpCode::Div => self.binary_div()?,
                OpCode::Mod => self.binary_mod()?,
                OpCode::BitAnd => self.binary_bitand()?,
                OpCode::BitOr => self.binary_bitor()?,
                OpCode::Eq => self.compare_eq(true)?,
                OpCode::Ne => self.compare_eq(false)?,
                OpCode::Lt => self.compare_ord(|o| o.is_lt())?,
                OpCode::Le => self.compare_ord(|o| o.is_le())?,
                OpCode::Gt => self.compare_ord(|o| o.is_gt())?,
                OpCode::Ge => self.compare_ord(|o| o.is_ge())?,
                OpCode::Not => {
                    let v = self.pop()?;
                    self.push(Value::Bool(!v.is_truthy()))?;
                }
                OpCode::Negate => self.unary_negate()?,
                OpCode::Positive => self.unary_positive()?,

                OpCode::PreIncLocal => self.incdec_local(ins.value, 1, false)?,
                OpCode::PostIncLocal => self.incdec_local(ins.value, 1, true)?,
                OpCode::PreDecLocal => self.incdec_local(ins.value, -1, false)?,
                OpCode::PostDecLocal => self.incdec_local(ins.value, -1, true)?,
                OpCode::PreIncGlobal => self.incdec_global(ins.value, 1, false)?,
                OpCode::PostIncGlobal => self.incdec_global(ins.value, 1, true)?,
                OpCode::PreDecGlobal => self.incdec_global(ins.value, -1, false)?,
                OpCode::PostDecGlobal => self.incdec_global(ins.value, -1, true)?,

                OpCode::GetGlobal => self.get_global(ins.value)?,
                OpCode::SetGlobal => self.set_global(ins.value)?,
                OpCode::GetLocal => self.get_local(ins.value)?,
                OpCode::SetLocal => self.set_local(ins.value)?,

                OpCode::Jump => {
                    self.ip = (self.ip as i64 + ins.value.as_int()) as usize;
                }
                OpCode::JumpIfFalse => {
                    let cond = self.pop()?;
                    if !cond.is_truthy() {
                        self.ip = (self.ip as i64 + ins.value.as_int()) as usize;
                    }
                }
                OpCode::JumpIfDone => self.jump_if_done(ins.value)?,

                OpCode::CreateArray => self.create_array(ins.value)?,
                OpCode::GetElement => self.get_element()?,
                OpCode::SetElement => self.set_element()?,
                OpCode::IterStart => self.iter_start()?,
                OpCode::IterNext => self.iter_next()?,

                OpCode::CreateObject => self.create_object(ins.value)?,
                OpCode::GetMember => self.get_member(ins.value)?,
                OpCode::SetMember => self.set_member(ins.value)?,

                OpCode::FunctionStart => {
                    // Straight-line execution must skip over function bodies;
                    // they only ever run via CALL jumping to `fn.address`.
                    // Mirrors `apexVM.c`'s `OP_FUNCTION_START`:
                    // `while (...ins[ip].opcode != OP_FUNCTION_END) ip++; ip++;`
                    while self.ip < self.chunk.len() && self.chunk.ins[self.ip].opcode != OpCode::FunctionEnd {
                        self.ip += 1;
                    }
                    self.ip += 1;
                }
                OpCode::FunctionEnd => {}

                OpCode::Call => self.call(ins.value)?,
                OpCode::CallMember => self.call_member(ins.value)?,
                OpCode::CallLib => self.call_lib(ins.value)?,
                OpCode::New => self.new_instance(ins.value)?,
                OpCode::Return => {
                    if self.return_from_call()? {
                        return Ok(self.stack.pop().unwrap_or(Value::Null));
                    }
                }
            }
        }
    }

    fn err(&self, message: impl Into<String>) -> RuntimeError {
        let mut trace = Vec::new();
        for frame in self.call_stack.iter().rev() {
            trace.push(TraceFrame {
                fn_name: self.interner.resolve(frame.fn_name).to_owned(),
                srcloc: frame.call_srcloc.clone(),
            });
        }
        RuntimeError {
            srcloc: self.srcloc.clone(),
            message: message.into(),
            trace,
        }
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(self.err("stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| self.err("stack underflow"))
    }

    fn peek(&self) -> Result<Value, RuntimeError> {
        self.stack.last().copied().ok_or_else(|| self.err("stack underflow"))
    }

    /// Retains `new`'s heap reference (if any) and releases `old`'s (if any),
    /// matching the bind-point refcounting spec.md §3 describes. Called
    /// whenever a variable, element, or field is overwritten.
    fn rebind(&mut self, old: Option<Value>, new: Value) {
        if let Some(id) = new.heap_id() {
            self.heap.retain(id);
        }
        if let Some(old) = old {
            if let Some(id) = old.heap_id() {
                self.heap.release(id);
            }
        }
    }

    fn get_global(&mut self, name: Value) -> Result<(), RuntimeError> {
        let name = name.as_str_id();
        let value = self
            .globals
            .get(name)
            .ok_or_else(|| self.err(format!("undefined global '{}'", self.interner.resolve(name))))?;
        self.push(value)
    }

    fn set_global(&mut self, name: Value) -> Result<(), RuntimeError> {
        let name = name.as_str_id();
        let value = self.pop()?;
        let old = self.globals.set(name, value);
        self.rebind(old, value);
        Ok(())
    }

    fn get_local(&mut self, name: Value) -> Result<(), RuntimeError> {
        let name = name.as_str_id();
        if name == self.this_id {
            let this = self.obj_context.ok_or_else(|| self.err("'this' is not bound outside a method"))?;
            return self.push(this);
        }
        let value = self.scopes.get(name).ok_or_else(|| self.err(format!("undefined local '{}'", self.interner.resolve(name))))?;
        self.push(value)
    }

    fn set_local(&mut self, name: Value) -> Result<(), RuntimeError> {
        let name = name.as_str_id();
        let value = self.pop()?;
        let old = self.scopes.set(name, value);
        self.rebind(old, value);
        Ok(())
    }

    fn incdec_local(&mut self, name: Value, delta: i64, is_post: bool) -> Result<(), RuntimeError> {
        let name = name.as_str_id();
        let current = self.scopes.get(name).ok_or_else(|| self.err(format!("undefined local '{}'", self.interner.resolve(name))))?;
        let updated = add_delta(current, delta, &self.srcloc)?;
        self.scopes.set(name, updated);
        self.push(if is_post { current } else { updated })
    }

    fn incdec_global(&mut self, name: Value, delta: i64, is_post: bool) -> Result<(), RuntimeError> {
        let name = name.as_str_id();
        let current = self
            .globals
            .get(name)
            .ok_or_else(|| self.err(format!("undefined global '{}'", self.interner.resolve(name))))?;
        let updated = add_delta(current, delta, &self.srcloc)?;
        self.globals.set(name, updated);
        self.push(if is_post { current } else { updated })
    }
}

fn add_delta(value: Value, delta: i64, srcloc: &SrcLoc) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(i) => Ok(Value::Int(i + delta)),
        Value::Flt(f) => Ok(Value::Flt(f + delta as f32)),
        Value::Dbl(d) => Ok(Value::Dbl(d + delta as f64)),
        other => Err(RuntimeError::new(
            srcloc.clone(),
            format!("cannot increment/decrement a {}", other.type_name()),
        )),
    }
}

impl Value {
    /// Extracts the `StringId` operand `GET_*`/`SET_*` instructions carry.
    /// Every such instruction is compiled with a `Value::Str` operand, so a
    /// mismatch here means the compiler emitted a malformed instruction.
    fn as_str_id(self) -> StringId {
        match self {
            Value::Str(id) => id,
            _ => panic!("instruction operand was not a string id"),
        }
    }

    fn as_int(self) -> i64 {
        match self {
            Value::Int(i) => i,
            _ => panic!("instruction operand was not an int"),
        }
    }
}
